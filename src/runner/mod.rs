// Runner module - executes external command lines

pub mod error;
pub mod shell;
pub mod types;

pub use error::{Result, RunnerError};
pub use shell::ShellRunner;
pub use types::{CommandOutput, CommandRunner};
