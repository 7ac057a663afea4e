use crate::error::{Error, Result};
use hindsight_engine::HintConfig;
use hindsight_index::{Bm25Config, CompositeConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pick the workspace data directory. A caller-supplied path or the
/// `HINDSIGHT_PATH` environment variable wins (both honor a `~/` prefix);
/// otherwise the platform data directory gets a `hindsight` subfolder,
/// with `~/.hindsight` as the last resort when no XDG location exists.
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    let requested = explicit_path
        .map(str::to_string)
        .or_else(|| std::env::var("HINDSIGHT_PATH").ok());
    if let Some(raw) = requested {
        return Ok(expand_home_prefix(&raw));
    }

    match (dirs::data_dir(), home_dir()) {
        (Some(data_dir), _) => Ok(data_dir.join("hindsight")),
        (None, Some(home)) => Ok(home.join(".hindsight")),
        (None, None) => Err(Error::Config(
            "no workspace location available; set HINDSIGHT_PATH or HOME".to_string(),
        )),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// `~/rest` becomes `$HOME/rest`; anything else passes through untouched
fn expand_home_prefix(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// BM25 settings as they appear in config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexSettings {
    pub k1: f64,
    pub b: f64,
    pub max_query_terms: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        let defaults = Bm25Config::default();
        Self {
            k1: defaults.k1,
            b: defaults.b,
            max_query_terms: defaults.max_query_terms,
        }
    }
}

impl From<&IndexSettings> for Bm25Config {
    fn from(settings: &IndexSettings) -> Self {
        Bm25Config {
            k1: settings.k1,
            b: settings.b,
            max_query_terms: settings.max_query_terms,
        }
    }
}

/// Reciprocal-rank-fusion settings as they appear in config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositeSettings {
    pub reciprocal_rank_fusion_k: f64,
    pub primary_weight: f64,
    pub secondary_weight: f64,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        let defaults = CompositeConfig::default();
        Self {
            reciprocal_rank_fusion_k: defaults.rrf_k,
            primary_weight: defaults.primary_weight,
            secondary_weight: defaults.secondary_weight,
        }
    }
}

impl From<&CompositeSettings> for CompositeConfig {
    fn from(settings: &CompositeSettings) -> Self {
        CompositeConfig {
            rrf_k: settings.reciprocal_rank_fusion_k,
            primary_weight: settings.primary_weight,
            secondary_weight: settings.secondary_weight,
        }
    }
}

/// Workspace configuration persisted as TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<String>,
    pub hints: HintConfig,
    pub index: IndexSettings,
    pub composite: CompositeSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.hints.validate().map_err(Error::Config)?;
        Bm25Config::from(&self.index).validate()?;
        CompositeConfig::from(&self.composite).validate()?;
        Ok(())
    }

    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        resolve_workspace_path(self.data_dir.as_deref())
    }
}
