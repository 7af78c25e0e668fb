//! # bindery
//!
//! Host side of Bindery - THE BINARY.
//!
//! Supplies the capabilities `bindery-core` leaves to its host:
//!
//! - `transport` → HTTP requests over `reqwest`
//! - `console` → renderer and notifier writing to a transcript
//! - `config` → `bindery.toml` settings and transport options
//! - `scenario` → headless end-to-end runs from a JSON script
//! - `cli` → the `clap` command surface

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod scenario;
pub mod transport;

pub use config::{AppConfig, TransportConfig};
pub use console::{ConsoleNotifier, ConsoleRenderer, Transcript};
pub use error::CliError;
pub use scenario::{RunReport, Scenario, ScenarioRunner, Step};
pub use transport::HttpTransport;
