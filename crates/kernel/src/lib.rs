//! `vertobank-kernel` — module composition for the modular monolith.
//!
//! - [`Module`]: the four-phase installation contract every business module implements
//! - [`ModuleRegistry`]: resolves per-module connection strings and installs modules in order
//! - [`ServiceCollection`]: what modules register into (shared services + HTTP routes)
//! - [`AppConfig`]: connection strings and host settings
//! - [`problem`]: application errors to HTTP problem responses

pub mod config;
pub mod module;
pub mod problem;
pub mod registry;
pub mod services;

pub use config::{AppConfig, ConfigError};
pub use module::{InstallPhase, Module, ModuleInfo};
pub use problem::{Problem, ProblemDetails};
pub use registry::{ModuleRegistration, ModuleRegistry, StartupError, connection_string_key, module_name};
pub use services::{ServiceCollection, Services};
