use std::path::PathBuf;

use serde::Deserialize;

use crate::error::IndexError;

/// Default postings-per-partial-index bound (spec.md §4.3 step 5).
pub const DEFAULT_BATCH_SIZE: usize = 1 << 18;
/// Default number of ranked/boolean results returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Explicit build-time configuration. Directory paths and tuning knobs
/// are parameters of `build`/`query`, not process environment state
/// (spec.md §9): a thin CLI or TOML-file collaborator populates this
/// struct, and everything downstream takes it by value or reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub webpages_dir: PathBuf,
    pub partial_index_dir: PathBuf,
    pub index_dir: PathBuf,
    pub batch_size: usize,
    pub top_k: usize,
}

/// Mirrors a `config.toml` with `[paths]` and `[tuning]` tables. Any
/// field may be omitted; omitted path fields must then be supplied by
/// the CLI, and omitted tuning fields fall back to the built-in
/// defaults above.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    paths: TomlPaths,
    #[serde(default)]
    tuning: TomlTuning,
}

#[derive(Debug, Default, Deserialize)]
struct TomlPaths {
    webpages_dir: Option<PathBuf>,
    partial_index_dir: Option<PathBuf>,
    index_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlTuning {
    batch_size: Option<usize>,
    top_k: Option<usize>,
}

/// CLI-supplied overrides; any field left `None` defers to the TOML
/// file (if present) and then to the built-in default.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub webpages_dir: Option<PathBuf>,
    pub partial_index_dir: Option<PathBuf>,
    pub index_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub top_k: Option<usize>,
}

impl Config {
    /// Loads an optional `config.toml` from `config_path` (if it
    /// exists) and layers `overrides` on top, CLI taking precedence
    /// over file, file over built-in default.
    pub fn load(
        config_path: Option<&std::path::Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, IndexError> {
        let toml_cfg = match config_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str::<TomlConfig>(&text).map_err(|e| {
                    IndexError::CorruptInput {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                })?
            }
            _ => TomlConfig::default(),
        };

        let webpages_dir = overrides
            .webpages_dir
            .or(toml_cfg.paths.webpages_dir)
            .ok_or_else(|| {
                IndexError::ResourcePrecondition(
                    "webpages_dir must be set via --webpages-dir or config.toml".to_string(),
                )
            })?;
        let partial_index_dir = overrides
            .partial_index_dir
            .or(toml_cfg.paths.partial_index_dir)
            .ok_or_else(|| {
                IndexError::ResourcePrecondition(
                    "partial_index_dir must be set via --partial-index-dir or config.toml"
                        .to_string(),
                )
            })?;
        let index_dir = overrides
            .index_dir
            .or(toml_cfg.paths.index_dir)
            .ok_or_else(|| {
                IndexError::ResourcePrecondition(
                    "index_dir must be set via --index-dir or config.toml".to_string(),
                )
            })?;

        let batch_size = overrides
            .batch_size
            .or(toml_cfg.tuning.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        let top_k = overrides
            .top_k
            .or(toml_cfg.tuning.top_k)
            .unwrap_or(DEFAULT_TOP_K);

        Ok(Self {
            webpages_dir,
            partial_index_dir,
            index_dir,
            batch_size,
            top_k,
        })
    }
}
