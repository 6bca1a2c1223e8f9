//! Agent configuration, persisted as TOML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::resolver::{ConceptResolver, HttpResolver, NoResolver, ResolvedConcept, StaticResolver};
use crate::seeds::SeedRegistry;

/// Errors from configuration files.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read agent config: {path}")]
    #[diagnostic(
        code(lexagent::config::read),
        help("Ensure the config file exists, or create one with `lexagent init-config <path>`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse agent config: {path}")]
    #[diagnostic(
        code(lexagent::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write agent config: {path}")]
    #[diagnostic(
        code(lexagent::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resolver configuration: {message}")]
    #[diagnostic(
        code(lexagent::config::resolver),
        help("`kind = \"http\"` needs a `url`; `kind = \"static\"` reads its `entries` table.")
    )]
    Resolver { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    None,
    Static,
    Http,
}

/// The `[resolver]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub kind: ResolverKind,
    /// Base url for `http`; words are fetched from `<url>/<word>`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Word → meaning table for `static`.
    #[serde(default)]
    pub entries: BTreeMap<String, ResolvedConcept>,
}

fn default_timeout_ms() -> u64 {
    2_000
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kind: ResolverKind::None,
            url: None,
            timeout_ms: default_timeout_ms(),
            entries: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn build(&self) -> ConfigResult<Box<dyn ConceptResolver>> {
        Ok(match self.kind {
            ResolverKind::None => Box::new(NoResolver),
            ResolverKind::Static => Box::new(StaticResolver::new(self.entries.clone())),
            ResolverKind::Http => {
                let url = self.url.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                    ConfigError::Resolver {
                        message: "http resolver without a url".into(),
                    }
                })?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::Resolver {
                        message: format!("\"{url}\" must start with http:// or https://"),
                    });
                }
                Box::new(HttpResolver::new(url, Duration::from_millis(self.timeout_ms)))
            }
        })
    }
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Lexicon file. `None` keeps the lexicon in memory only.
    #[serde(default)]
    pub memory_path: Option<PathBuf>,
    /// Seed packs applied at startup; words already known are left alone.
    #[serde(default = "default_seed_packs")]
    pub seed_packs: Vec<String>,
    /// Extra seed packs in `<seeds_dir>/<id>/seed.toml`, listed next to the
    /// bundled ones and selectable through `seed_packs`.
    #[serde(default)]
    pub seeds_dir: Option<PathBuf>,
    /// Curriculum files taught at startup.
    #[serde(default)]
    pub curricula: Vec<PathBuf>,
    #[serde(default = "default_world_size")]
    pub world_width: u32,
    #[serde(default = "default_world_size")]
    pub world_height: u32,
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_name() -> String {
    "lexagent".into()
}
fn default_seed_packs() -> Vec<String> {
    vec!["core".into()]
}
fn default_world_size() -> u32 {
    10
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            memory_path: None,
            seed_packs: default_seed_packs(),
            seeds_dir: None,
            curricula: Vec::new(),
            world_width: default_world_size(),
            world_height: default_world_size(),
            log_filter: default_log_filter(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Default config persisting its lexicon at `path`.
    pub fn with_memory(path: impl Into<PathBuf>) -> Self {
        Self {
            memory_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// No seed packs, no persistence: an agent that knows nothing.
    pub fn blank() -> Self {
        Self {
            seed_packs: Vec::new(),
            ..Default::default()
        }
    }

    /// Bundled seed packs plus those found under `seeds_dir`.
    pub fn seed_registry(&self) -> SeedRegistry {
        match &self.seeds_dir {
            Some(dir) => SeedRegistry::discover(dir),
            None => SeedRegistry::bundled(),
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::WordType;

    #[test]
    fn empty_file_yields_defaults() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.seed_packs, vec!["core".to_string()]);
    }

    #[test]
    fn static_resolver_table() {
        let config: AgentConfig = toml::from_str(
            r#"
            name = "bench"
            [resolver]
            kind = "static"
            [resolver.entries.shiny]
            word_type = "property"
            expression = "obj.material == 'metal'"
            "#,
        )
        .unwrap();
        assert_eq!(config.resolver.kind, ResolverKind::Static);
        let resolver = config.resolver.build().unwrap();
        assert_eq!(resolver.resolve("shiny").unwrap().word_type, WordType::Property);
    }

    #[test]
    fn http_resolver_needs_url() {
        let config = ResolverConfig {
            kind: ResolverKind::Http,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(ConfigError::Resolver { .. })));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("agent.toml");
        let config = AgentConfig::with_memory(dir.path().join("lexicon.json"));
        config.save(&path).unwrap();
        assert_eq!(AgentConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = AgentConfig::load(Path::new("/nonexistent/agent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
