//! Configuration management for the maintenance tools
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Legacy `SUPABASE_URL` / `SUPABASE_SERVICE_KEY` variables as fallbacks
//! 3. Configuration files (config/development.toml, config/production.toml)
//! 4. Environment variable overrides with QMS_ prefix

use config::{Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use qms_shared::{
    default_part_registry, default_registry, validate_page_size, validate_table_column,
    TableColumn, VehicleTypeCatalog, VehicleTypeNormalizer, DEFAULT_PAGE_SIZE, PARTS_CATEGORY,
    VEHICLE_TYPES_CATEGORY,
};

use crate::error::{AppError, AppResult};

const CONFIG_DIR: &str = "config";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Hosted database API configuration
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// Standardization run configuration
    #[serde(default)]
    pub standardization: StandardizationConfig,
}

#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://<ref>.supabase.co
    pub url: String,

    /// Service-role API key
    pub service_key: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StandardizationConfig {
    /// Category code of the vehicle-type catalog rows
    #[serde(default = "default_category_code")]
    pub category_code: String,

    /// Rows fetched per request when scanning dependent tables
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Dependent tables holding a denormalized vehicle-type label
    #[serde(default = "default_registry")]
    pub tables: Vec<TableColumn>,

    /// Additional alias -> canonical label mappings
    #[serde(default)]
    pub extra_aliases: BTreeMap<String, String>,

    /// Category code of the parts catalog rows
    #[serde(default = "default_parts_category_code")]
    pub parts_category_code: String,

    /// Columns holding free-text part codes
    #[serde(default = "default_part_registry")]
    pub part_tables: Vec<TableColumn>,
}

impl Default for StandardizationConfig {
    fn default() -> Self {
        Self {
            category_code: default_category_code(),
            page_size: DEFAULT_PAGE_SIZE,
            tables: default_registry(),
            extra_aliases: BTreeMap::new(),
            parts_category_code: default_parts_category_code(),
            part_tables: default_part_registry(),
        }
    }
}

fn default_category_code() -> String {
    VEHICLE_TYPES_CATEGORY.to_string()
}

fn default_parts_category_code() -> String {
    PARTS_CATEGORY.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Config {
    /// Load and validate configuration from files and environment variables
    pub fn load() -> AppResult<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Load without checking the database settings (offline commands)
    pub fn load_unvalidated() -> AppResult<Self> {
        Self::load_unvalidated_from(Path::new(CONFIG_DIR))
    }

    /// Load from `{config_dir}/{environment}.toml` plus the environment
    ///
    /// A missing file is fine; an unreadable or malformed one is an error.
    pub fn load_unvalidated_from(config_dir: &Path) -> AppResult<Self> {
        let environment = std::env::var("QMS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let mut builder = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("standardization.category_code", VEHICLE_TYPES_CATEGORY)?
            .set_default("standardization.page_size", DEFAULT_PAGE_SIZE as i64)?;

        // Legacy variable names act as fallbacks
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            builder = builder.set_default("supabase.url", url)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_KEY") {
            builder = builder.set_default("supabase.service_key", key)?;
        }

        let config = builder
            // Load environment-specific config file
            .add_source(
                File::with_name(&config_dir.join(&environment).to_string_lossy()).required(false),
            )
            // Override with environment variables (QMS_ prefix)
            .add_source(
                Environment::with_prefix("QMS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject configurations that cannot produce a safe run
    pub fn validate(&self) -> AppResult<()> {
        self.supabase.validate()?;
        self.standardization.validate()
    }
}

impl SupabaseConfig {
    pub fn validate(&self) -> AppResult<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AppError::Configuration(
                "supabase.url is not set (QMS_SUPABASE__URL or SUPABASE_URL)".into(),
            ));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AppError::Configuration(format!(
                "supabase.url must be an http(s) URL, got {}",
                url
            )));
        }
        if self.service_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "supabase.service_key is not set (QMS_SUPABASE__SERVICE_KEY or SUPABASE_SERVICE_KEY)"
                    .into(),
            ));
        }
        Ok(())
    }
}

impl StandardizationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.category_code.trim().is_empty() {
            return Err(AppError::Configuration(
                "standardization.category_code must not be empty".into(),
            ));
        }
        if self.parts_category_code.trim().is_empty() {
            return Err(AppError::Configuration(
                "standardization.parts_category_code must not be empty".into(),
            ));
        }
        validate_page_size(self.page_size)
            .map_err(|e| AppError::Configuration(format!("standardization.page_size: {}", e)))?;
        for target in &self.tables {
            validate_table_column(target).map_err(|e| {
                AppError::Configuration(format!("standardization.tables ({}): {}", target, e))
            })?;
        }
        for target in &self.part_tables {
            validate_table_column(target).map_err(|e| {
                AppError::Configuration(format!("standardization.part_tables ({}): {}", target, e))
            })?;
        }
        Ok(())
    }

    /// Built-in catalog extended with the configured aliases
    pub fn normalizer(&self) -> AppResult<VehicleTypeNormalizer> {
        let catalog = VehicleTypeCatalog::default().with_aliases(
            self.extra_aliases
                .iter()
                .map(|(alias, canonical)| (alias.clone(), canonical.clone())),
        );
        Ok(VehicleTypeNormalizer::from_catalog(catalog)?)
    }
}
