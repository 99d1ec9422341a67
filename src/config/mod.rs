//! Project configuration (`.envx.toml`).

pub mod settings;

pub use settings::Settings;
