//! Configuration module for wikimirror
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wikimirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring into: {}", config.mirror.output_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, MirrorConfig, RemoteConfig, TextDirection, TransformConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
