pub(crate) mod args;
pub(crate) mod commands;
pub(crate) mod error;

pub(crate) use args::{Cli, LogFormat};
pub(crate) use commands::{Commands, EstimateArgs};
pub(crate) use error::AppError;
