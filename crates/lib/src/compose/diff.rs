//! Line-level text diff for manifest previews.
//!
//! Computes a longest-common-subsequence alignment between two renderings and
//! reports each line as kept, inserted or deleted. Manifests are a few hundred
//! lines at most, so the quadratic table is fine.

use std::fmt::Write as _;

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
  Equal,
  Insert,
  Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
  pub change: LineChange,
  pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDiff {
  pub lines: Vec<DiffLine>,
}

impl TextDiff {
  pub fn compute(old: &str, new: &str) -> Self {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();

    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
      for j in (0..b.len()).rev() {
        lcs[i][j] = if a[i] == b[j] {
          lcs[i + 1][j + 1] + 1
        } else {
          lcs[i + 1][j].max(lcs[i][j + 1])
        };
      }
    }

    let mut lines = Vec::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
      if a[i] == b[j] {
        lines.push(DiffLine::new(LineChange::Equal, a[i]));
        i += 1;
        j += 1;
      } else if lcs[i + 1][j] >= lcs[i][j + 1] {
        lines.push(DiffLine::new(LineChange::Delete, a[i]));
        i += 1;
      } else {
        lines.push(DiffLine::new(LineChange::Insert, b[j]));
        j += 1;
      }
    }
    lines.extend(a[i..].iter().map(|l| DiffLine::new(LineChange::Delete, l)));
    lines.extend(b[j..].iter().map(|l| DiffLine::new(LineChange::Insert, l)));

    Self { lines }
  }

  pub fn has_changes(&self) -> bool {
    self.lines.iter().any(|l| l.change != LineChange::Equal)
  }

  pub fn insertions(&self) -> usize {
    self.lines.iter().filter(|l| l.change == LineChange::Insert).count()
  }

  pub fn deletions(&self) -> usize {
    self.lines.iter().filter(|l| l.change == LineChange::Delete).count()
  }

  /// Render the full document with `+`/`-` markers, green/red when `color`.
  pub fn render(&self, color: bool) -> String {
    let mut out = String::new();
    for line in &self.lines {
      let _ = match (line.change, color) {
        (LineChange::Equal, _) => writeln!(out, "  {}", line.text),
        (LineChange::Insert, false) => writeln!(out, "+ {}", line.text),
        (LineChange::Delete, false) => writeln!(out, "- {}", line.text),
        (LineChange::Insert, true) => writeln!(out, "{}", format!("+ {}", line.text).green()),
        (LineChange::Delete, true) => writeln!(out, "{}", format!("- {}", line.text).red()),
      };
    }
    out
  }
}

impl DiffLine {
  fn new(change: LineChange, text: &str) -> Self {
    Self {
      change,
      text: text.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn changes(diff: &TextDiff) -> Vec<(LineChange, &str)> {
    diff.lines.iter().map(|l| (l.change, l.text.as_str())).collect()
  }

  #[test]
  fn identical_input_has_no_changes() {
    let diff = TextDiff::compute("a\nb\n", "a\nb\n");
    assert!(!diff.has_changes());
    assert_eq!(diff.lines.len(), 2);
  }

  #[test]
  fn replaced_line_is_delete_then_insert() {
    let diff = TextDiff::compute("a\nb\nc\n", "a\nx\nc\n");
    assert_eq!(
      changes(&diff),
      vec![
        (LineChange::Equal, "a"),
        (LineChange::Delete, "b"),
        (LineChange::Insert, "x"),
        (LineChange::Equal, "c"),
      ]
    );
    assert_eq!(diff.insertions(), 1);
    assert_eq!(diff.deletions(), 1);
  }

  #[test]
  fn from_empty_everything_is_inserted() {
    let diff = TextDiff::compute("", "a\nb\n");
    assert_eq!(diff.insertions(), 2);
    assert_eq!(diff.deletions(), 0);
  }

  #[test]
  fn plain_render_marks_lines() {
    let diff = TextDiff::compute("keep\nold\n", "keep\nnew\n");
    assert_eq!(diff.render(false), "  keep\n- old\n+ new\n");
  }
}
