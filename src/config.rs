use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::DatasetKind;

const CONFIG_FILE: &str = "config.toml";

/// Locates and reads the viewer's config file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join(app_name);
        Ok(Self { config_dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Read the config file; a missing file means defaults.
    pub fn load(&self) -> Result<AppConfig> {
        let path = self.config_path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub datasets: DatasetPaths,
    pub view: ViewConfig,
}

/// Where each survey lives on disk; relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub labor_efficacy: PathBuf,
    pub academic_anxiety: PathBuf,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            labor_efficacy: PathBuf::from("dataset_limpio_para_app.csv"),
            academic_anxiety: PathBuf::from("dataset_ansiedad.csv"),
        }
    }
}

impl DatasetPaths {
    pub fn path_for(&self, kind: DatasetKind) -> &Path {
        match kind {
            DatasetKind::LaborEfficacy => &self.labor_efficacy,
            DatasetKind::AcademicAnxiety => &self.academic_anxiety,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Column used to group bars when a dataset is opened.
    pub default_group_column: String,
    pub histogram_bins: usize,
    /// Axes of the radar chart.
    pub profile_columns: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_group_column: "CARRERA".to_string(),
            histogram_bins: 10,
            profile_columns: vec!["Z_COE".into(), "Z_INFO".into(), "Z_TE".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().join("survey-lens"));
        let config = manager.load().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.view.default_group_column, "CARRERA");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        std::fs::write(manager.config_path(), "[view]\nhistogram_bins = 25\n").unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.view.histogram_bins, 25);
        assert_eq!(config.view.default_group_column, "CARRERA");
        assert_eq!(config.datasets, DatasetPaths::default());
    }

    #[test]
    fn dataset_paths_are_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        std::fs::write(
            manager.config_path(),
            "[datasets]\nacademic_anxiety = \"/data/ansiedad.csv\"\n",
        )
        .unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(
            loaded.datasets.path_for(DatasetKind::AcademicAnxiety),
            Path::new("/data/ansiedad.csv")
        );
        assert_eq!(
            loaded.datasets.path_for(DatasetKind::LaborEfficacy),
            Path::new("dataset_limpio_para_app.csv")
        );
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        std::fs::write(manager.config_path(), "view = [").unwrap();
        assert!(manager.load().is_err());
    }
}
