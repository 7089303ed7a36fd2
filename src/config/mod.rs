//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → InjectorConfig (validated, immutable)
//!     → ResponseConfig copied into each response
//!     → InjectConfig / ObservabilityConfig read by the runner and logging
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{InjectConfig, InjectorConfig, ObservabilityConfig, ResponseConfig};
pub use validation::{validate_config, ValidationError};
