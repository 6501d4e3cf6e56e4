// Library surface for the binary and integration tests.
pub mod app_dirs;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod lesson;
pub mod logging;
pub mod progress;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;
pub mod util;
pub mod vocabulary;

pub use error::{ParlanceError, Result};
