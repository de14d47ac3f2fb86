//! Interactive terminal front end for the chat client.

pub mod formatter;
pub mod runner;

pub use runner::{CliOptions, run_client_session};
