//! Configuration type definitions
//!
//! These types represent the deployment configuration for Kiln: where the
//! host listens, how the filter is mounted, and which static sources it
//! registers at startup.

use serde::{Deserialize, Serialize};

/// Root configuration for Kiln
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KilnConfig {
    /// Listen address of the host container
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Global logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            filter: FilterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:4567".to_string()
}

/// Filter (front controller) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    /// Name of the application to instantiate at init
    #[serde(default)]
    pub application_class: Option<String>,

    /// URL pattern the filter is mapped to, e.g. `/app/*`
    #[serde(default)]
    pub filter_mapping_url_pattern: Option<String>,

    /// Static resources registered before the application initializes
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// Static resource locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    /// Folder inside the embedded bundle
    #[serde(default)]
    pub location: Option<String>,

    /// Folder on the local filesystem
    #[serde(default)]
    pub external_location: Option<String>,

    /// File served when a request resolves to a directory
    #[serde(default = "default_welcome_file")]
    pub welcome_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            location: None,
            external_location: None,
            welcome_file: default_welcome_file(),
        }
    }
}

fn default_welcome_file() -> String {
    "index.html".to_string()
}

/// Global logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
