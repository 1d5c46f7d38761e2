use crate::error::{Error, Result};
use crate::models::{PackageType, unique_package_types};
use serde::Deserialize;
use std::fmt;

/// GitLab caps `per_page` at 100
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: RegistryEndpoint,
    pub destination: RegistryEndpoint,

    #[serde(default)]
    pub migration: MigrationConfig,
}

/// One package-registry project: base address, project and access token
#[derive(Deserialize, Clone, PartialEq)]
pub struct RegistryEndpoint {
    pub base_address: String,
    /// Numeric id or `group/project` path
    pub project_id: String,
    pub private_token: String,
}

// Tokens must never end up in logs
impl fmt::Debug for RegistryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEndpoint")
            .field("base_address", &self.base_address)
            .field("project_id", &self.project_id)
            .field("private_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MigrationConfig {
    #[serde(default = "default_package_types")]
    pub package_types: Vec<PackageType>,

    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    #[serde(default)]
    pub verify_checksums: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            package_types: default_package_types(),
            dry_run: default_dry_run(),
            per_page: default_per_page(),
            verify_checksums: false,
        }
    }
}

fn default_package_types() -> Vec<PackageType> {
    PackageType::ALL.to_vec()
}

fn default_dry_run() -> bool {
    true
}

fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

impl RegistryEndpoint {
    fn validate(&mut self, section: &str) -> Result<()> {
        let trimmed = self.base_address.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::config(format!("{section}.base_address is empty")));
        }
        let url = reqwest::Url::parse(trimmed).map_err(|e| {
            Error::config(format!("{section}.base_address '{trimmed}' is invalid: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "{section}.base_address must use http or https, got '{}'",
                url.scheme()
            )));
        }
        self.base_address = trimmed.to_string();

        if self.project_id.trim().is_empty() {
            return Err(Error::config(format!("{section}.project_id is empty")));
        }
        if self.private_token.trim().is_empty() {
            return Err(Error::config(format!("{section}.private_token is empty")));
        }
        Ok(())
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Add config file sources in order of precedence (lower to higher)
        if config_path.is_none() {
            #[cfg(not(debug_assertions))]
            {
                builder = builder.add_source(
                    config::File::with_name("/etc/gitlab-pkg-migrate/config").required(false),
                );
            }

            #[cfg(debug_assertions)]
            {
                builder = builder.add_source(config::File::with_name("config").required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment variables (highest precedence),
        // e.g. PKG_MIGRATE_SOURCE__PRIVATE_TOKEN
        builder = builder.add_source(
            config::Environment::with_prefix("PKG_MIGRATE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("migration.package_types")
                .try_parsing(true),
        );

        let config = builder.build().map_err(|e| Error::Config {
            msg: format!("Failed to load configuration: {}", e),
        })?;

        let config: Config = config.try_deserialize().map_err(|e| Error::Config {
            msg: format!("Failed to deserialize configuration: {}", e),
        })?;

        config.validated()
    }

    /// Normalize and check every value the pipeline relies on
    pub fn validated(mut self) -> Result<Self> {
        self.source.validate("source")?;
        self.destination.validate("destination")?;

        if self.migration.package_types.is_empty() {
            return Err(Error::config("migration.package_types is empty"));
        }
        self.migration.package_types =
            unique_package_types(self.migration.package_types.iter().copied());

        if self.migration.per_page == 0 || self.migration.per_page > MAX_PER_PAGE {
            return Err(Error::config(format!(
                "migration.per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                self.migration.per_page
            )));
        }

        Ok(self)
    }
}
