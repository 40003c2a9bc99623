//! TOML configuration for a publishing deployment.
//!
//! # Responsibility
//! - Declare the status vocabulary, the public sections and the page size.
//! - Validate cross-references (section statuses must be declared choices).
//!
//! # Invariants
//! - Every table is optional; an empty document yields the draft/published
//!   model with a single `news` section and 20 records per page.
//! - A loaded config has passed `validate()`.

use crate::model::status::{AllowedStatuses, StatusChoices};
use crate::publish::gate::Section;
use crate::service::publication_service::DEFAULT_PAGE_SIZE;
use log::info;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("unknown section `{0}`")]
    UnknownSection(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusesConfig {
    /// Ordered tokens; the first one is the draft-equivalent initial state.
    pub choices: StatusChoices,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: String,
}

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub statuses: StatusesConfig,
    pub pagination: PaginationConfig,
    pub sections: Vec<Section>,
    pub logging: Option<LoggingConfig>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            statuses: StatusesConfig::default(),
            pagination: PaginationConfig::default(),
            sections: vec![Section::new("news", AllowedStatuses::published())],
            logging: None,
        }
    }
}

impl PublishConfig {
    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(
            "event=config_load module=config status=ok path={} sections={}",
            path.display(),
            config.sections.len()
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.page_size == 0 {
            return Err(ConfigError::Invalid(
                "pagination.page_size must be greater than 0".to_string(),
            ));
        }
        if self.sections.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one section must be configured".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for section in &self.sections {
            if section.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "section name must not be blank".to_string(),
                ));
            }
            if !names.insert(section.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "section `{}` is configured more than once",
                    section.name
                )));
            }
            if let Some(status) = section
                .allowed
                .iter()
                .find(|status| !self.statuses.choices.contains(status))
            {
                return Err(ConfigError::Invalid(format!(
                    "section `{}` allows undeclared status `{status}`",
                    section.name
                )));
            }
        }
        Ok(())
    }

    pub fn choices(&self) -> &StatusChoices {
        &self.statuses.choices
    }

    /// Looks up a section by name; `None` selects the first configured one.
    pub fn section(&self, name: Option<&str>) -> Result<&Section, ConfigError> {
        match name {
            Some(name) => self
                .sections
                .iter()
                .find(|section| section.name == name)
                .ok_or_else(|| ConfigError::UnknownSection(name.to_string())),
            None => self
                .sections
                .first()
                .ok_or_else(|| ConfigError::Invalid("no sections configured".to_string())),
        }
    }
}
