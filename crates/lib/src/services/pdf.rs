use super::ServiceDescriptor;
use crate::consts::IMAGE_KWKHTMLTOPDF;

/// Document-render helper, reached by service name on the private network.
pub fn pdf_service(name: &str) -> ServiceDescriptor {
  let mut service = ServiceDescriptor::new(name, IMAGE_KWKHTMLTOPDF);
  service.restart = Some("always".to_string());
  service
}
