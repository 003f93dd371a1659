//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing values fall back to the defaults of
//! [`Config::default`].
//!
//! # Example
//!
//! ```no_run
//! use web_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Per-host limit: {}", config.crawler.per_host);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, UserAgentConfig};

pub use parser::{load_config, parse_config};
pub use validation::validate;
