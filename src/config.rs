//! Configuration loaded from `config.toml`

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::db::StepStatus;
use crate::error::{Error, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub reorder: ReorderConfig,
    pub logging: LoggingConfig,
    pub vocabulary: VocabularyConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReorderMode {
    /// All positions are written in one transaction.
    #[default]
    Atomic,
    /// One independent update per step, issued concurrently.
    BestEffort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig {
    pub mode: ReorderMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Suggested values offered for a step's responsible agency and sector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub agencies: Vec<String>,
    pub sectors: Vec<String>,
    pub other_label: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            agencies: ["City Hall", "State", "Federal Government", "Private Company"]
                .map(String::from)
                .to_vec(),
            sectors: ["Public Works", "Planning", "Finance", "Legal", "Environment"]
                .map(String::from)
                .to_vec(),
            other_label: "Other".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultStep {
    pub title: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub current: bool,
}

/// Values used when a new project is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub image_url: String,
    pub started_notes: String,
    pub steps: Vec<DefaultStep>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let step = |title: &str, status, current| DefaultStep {
            title: title.to_string(),
            status,
            current,
        };
        Self {
            image_url: "https://images.unsplash.com/photo-1486406146926-c627a92ad1ab?auto=format&fit=crop&q=80&w=1000"
                .to_string(),
            started_notes: "Project started".to_string(),
            steps: vec![
                step("Demand", StepStatus::Completed, false),
                step("Instruction", StepStatus::InProgress, true),
                step("Execution", StepStatus::Pending, false),
                step("Conclusion", StepStatus::Pending, false),
            ],
        }
    }
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("worksboard").join("worksboard.db")
    } else {
        PathBuf::from("worksboard.db")
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = env::var("WORKSBOARD_CONFIG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join("worksboard"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config = Self::parse(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.defaults.steps.iter().any(|s| s.title.trim().is_empty()) {
            return Err(Error::Config(
                "defaults.steps entries need a title".to_string(),
            ));
        }
        if self.defaults.steps.iter().filter(|s| s.current).count() > 1 {
            return Err(Error::Config(
                "defaults.steps may mark at most one step as current".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.reorder.mode, ReorderMode::Atomic);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.defaults.steps.len(), 4);
        assert_eq!(config.defaults.steps[1].status, StepStatus::InProgress);
        assert!(config.defaults.steps[1].current);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let config = Config::parse(
            r#"
            [reorder]
            mode = "best-effort"

            [vocabulary]
            agencies = ["Water Utility"]
            "#,
        )?;
        assert_eq!(config.reorder.mode, ReorderMode::BestEffort);
        assert_eq!(config.vocabulary.agencies, vec!["Water Utility".to_string()]);
        assert_eq!(config.vocabulary.other_label, "Other");
        assert_eq!(config.vocabulary.sectors.len(), 5);
        assert_eq!(config.defaults.steps.len(), 4);
        Ok(())
    }

    #[test]
    fn test_default_steps_from_file() -> Result<()> {
        let config = Config::parse(
            r#"
            [defaults]
            steps = [
                { title = "Survey", status = "completed" },
                { title = "Permit", status = "in-progress", current = true },
            ]
            "#,
        )?;
        assert_eq!(config.defaults.steps.len(), 2);
        assert_eq!(config.defaults.steps[0].status, StepStatus::Completed);
        assert!(!config.defaults.steps[0].current);
        assert_eq!(config.defaults.started_notes, "Project started");
        Ok(())
    }

    #[test]
    fn test_rejects_two_current_default_steps() {
        let result = Config::parse(
            r#"
            [defaults]
            steps = [
                { title = "A", current = true },
                { title = "B", current = true },
            ]
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_reorder_mode_is_rejected() {
        let result = Config::parse("[reorder]\nmode = \"eventually\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let config = Config::load(Some(&dir.path().join("absent.toml")))?;
        assert_eq!(config.reorder.mode, ReorderMode::Atomic);
        Ok(())
    }
}
