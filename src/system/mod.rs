//! System module
//!
//! Bounded external commands and the read-only inspectors built on them.
//! Inspectors never fail: missing data is reported as empty fields.

pub mod command;
pub mod inspector;
pub mod status;

pub use command::{CommandError, CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use inspector::{CurrentNetworkInfo, NetworkInspector};
pub use status::{ServiceStatus, StatusCollector, SystemInfo};
