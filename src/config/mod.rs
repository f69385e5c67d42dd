//! Configuration module for Parcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use parcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("parcrawl.toml")).unwrap();
//! println!("Fetch workers: {}", config.crawler.downloaders);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
