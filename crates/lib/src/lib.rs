//! odoo-ops-lib: operating a multi-tenant Odoo stack.
//!
//! The stack is described by a compose manifest and an env file in one
//! working directory. This crate owns both files and the operations on them:
//! - `ComposeFile` / `EnvFile`: the two managed documents
//! - `services`: typed descriptors for proxy, application, database and PDF
//!   services
//! - `runtime`: the container runtime contract and its `docker compose`
//!   implementation
//! - `database`: role, database, dump and restore operations
//! - command operations: `init`, `generate`, `domain`, `dev_env`, `mount`,
//!   `inspect` and `refresh`

pub mod compose;
pub mod config;
pub mod consts;
pub mod database;
pub mod dev_env;
pub mod domain;
pub mod env;
pub mod environment;
pub mod error;
pub mod generate;
pub mod guard;
pub mod init;
pub mod inspect;
pub mod mount;
pub mod refresh;
pub mod runtime;
pub mod services;
pub mod util;
pub mod workspace;

pub use error::{Error, Result};
