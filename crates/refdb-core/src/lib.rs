pub mod builder;
pub mod command;
pub mod config;
pub mod database;
pub mod error;
pub mod io;
pub mod ledger;
pub mod lock;
pub mod notify;
pub mod paths;
pub mod publish;
pub mod record;
pub mod workflow;

pub use error::{RefdbError, Result};
