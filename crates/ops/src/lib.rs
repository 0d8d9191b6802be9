//! Allow-listed package-manager operations.

pub mod controller;
pub mod executor;

pub use controller::{default_base_tools, Operations, OpsController, DEFAULT_PACKAGE_MANAGER};
pub use executor::{CommandLine, ExecutionResult, PrivilegedExecutor, DEFAULT_COMMAND_TIMEOUT};
