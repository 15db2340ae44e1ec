pub mod bypass;
pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod io;
pub mod paths;
pub mod process;
pub mod report;
pub mod runner;
pub mod types;

pub use error::{HookError, Result};
