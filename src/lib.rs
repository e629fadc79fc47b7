pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod mail;
pub mod staging;
pub mod transfer;
pub mod util;

pub use error::{ErrorKind, SyncError, SyncResult};
