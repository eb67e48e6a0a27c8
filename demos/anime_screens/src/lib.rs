//! Detail and search screens of an anime catalogue, driven by `storerx` stores.

mod clients;
mod config;
mod error;
pub mod memory;
pub mod models;
pub mod settings;

pub mod detail;
pub mod search;
pub mod stream;

pub use clients::*;
pub use config::*;
pub use error::*;
pub use settings::SettingsExt;
