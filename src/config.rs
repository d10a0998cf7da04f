//! Analysis settings.
//!
//! Values come from three layers, highest priority first:
//! 1. Command-line flags
//! 2. A TOML file (`--config PATH`, else `<repo>/.gitwho.toml` when present)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::Cache;
use crate::changes::classifier::DEFAULT_MAX_FILE_SIZE;
use crate::error::{Error, Result};
use crate::filter::Filters;
use crate::git::Git;
use crate::pipeline::PipelineConfig;

pub const CONFIG_FILE_NAME: &str = ".gitwho.toml";

/// Two months, in seconds.
pub const DEFAULT_CACHE_TTL: u64 = 5_184_000;
pub const DEFAULT_MIN_DUP_LINES: usize = 4;
pub const DEFAULT_MAX_FILE_SIZE_OWNERSHIP: u64 = 30_000;
/// Per git invocation; 0 disables the timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Optional values, as read from a config file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub branch: Option<String>,
    pub files: Option<String>,
    pub files_not: Option<String>,
    pub authors: Option<String>,
    pub authors_not: Option<String>,
    pub min_dup_lines: Option<usize>,
    pub cache_file: Option<PathBuf>,
    pub cache_ttl: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_file_size_changes: Option<u64>,
    pub max_file_size_ownership: Option<u64>,
    pub ignore_trivial_lines: Option<bool>,
}

impl ConfigFile {
    /// Read `explicit`, or `.gitwho.toml` under `repo` when it exists.
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>, repo: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = repo.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::InvalidArgument(format!("cannot read config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::parse(&content)
            .map_err(|e| Error::InvalidArgument(format!("invalid config {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlay `other` onto `self`; values set in `other` win.
    pub fn merge(mut self, other: ConfigFile) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            branch,
            files,
            files_not,
            authors,
            authors_not,
            min_dup_lines,
            cache_file,
            cache_ttl,
            timeout_secs,
            max_file_size_changes,
            max_file_size_ownership,
            ignore_trivial_lines
        );
        self
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub branch: String,
    pub files: String,
    pub files_not: String,
    pub authors: String,
    pub authors_not: String,
    pub min_dup_lines: usize,
    pub cache_file: Option<PathBuf>,
    pub cache_ttl: u64,
    pub timeout_secs: u64,
    pub max_file_size_changes: u64,
    pub max_file_size_ownership: u64,
    /// Skip short and boilerplate lines when looking for duplicates.
    pub ignore_trivial_lines: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(ConfigFile::default())
    }
}

impl From<ConfigFile> for Settings {
    fn from(cfg: ConfigFile) -> Self {
        Self {
            branch: cfg.branch.unwrap_or_else(|| "main".to_string()),
            files: cfg.files.unwrap_or_else(|| ".*".to_string()),
            files_not: cfg.files_not.unwrap_or_default(),
            authors: cfg.authors.unwrap_or_else(|| ".*".to_string()),
            authors_not: cfg.authors_not.unwrap_or_default(),
            min_dup_lines: cfg.min_dup_lines.unwrap_or(DEFAULT_MIN_DUP_LINES),
            cache_file: cfg.cache_file.filter(|p| !p.as_os_str().is_empty()),
            cache_ttl: cfg.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            timeout_secs: cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            max_file_size_changes: cfg.max_file_size_changes.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            max_file_size_ownership: cfg
                .max_file_size_ownership
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_OWNERSHIP),
            ignore_trivial_lines: cfg.ignore_trivial_lines.unwrap_or(true),
        }
    }
}

/// Output style chosen with `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Totals and per-author details
    #[default]
    Full,
    /// Rankings and compact tables
    Short,
    /// Pretty JSON
    Json,
    /// HTML page with charts, written to a temporary file
    Graph,
}

/// Everything an analysis command needs: the repository, the settings,
/// the compiled filters and how to present results.
#[derive(Debug, Clone)]
pub struct Session {
    pub git: Git,
    pub settings: Settings,
    pub filters: Filters,
    pub format: Format,
    pub show_progress: bool,
}

impl Session {
    pub fn new(
        repo: &Path,
        settings: Settings,
        format: Format,
        show_progress: bool,
    ) -> Result<Self> {
        let filters = Filters::new(
            &settings.files,
            &settings.files_not,
            &settings.authors,
            &settings.authors_not,
        )?;
        let git = Git::discover(repo, settings.timeout_secs)?;
        git.ensure_revision(&settings.branch)?;
        Ok(Self {
            git,
            settings,
            filters,
            format,
            show_progress,
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::default()
    }

    /// Result cache, when `cache_file` is configured.
    pub fn cache(&self) -> Option<Cache> {
        self.settings
            .cache_file
            .as_ref()
            .map(|path| Cache::new(path, self.settings.cache_ttl))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
