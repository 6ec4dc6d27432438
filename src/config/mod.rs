/// Database configuration, connection management and schema creation
pub mod database;

/// Service settings loaded from config.toml with environment overrides
pub mod settings;
