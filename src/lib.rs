#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod agent;
pub mod capture;
pub mod config;
pub mod dataset;
pub mod engage;
pub mod error;
pub mod history;
pub mod listener;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod reasoning;
pub mod speech;

pub use config::Config;
pub use error::{Result, SidekickError};
