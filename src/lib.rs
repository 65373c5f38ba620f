pub mod args;
pub mod cli;
pub mod db;
pub mod error;
pub mod import;
mod server;
mod terminal;

pub use error::{Error, Result};
