//! Shared CLI helpers.

pub mod logging;
pub mod settings;

pub use logging::initialize_logging;
pub use settings::load_config;
