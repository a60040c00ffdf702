//! Collection-wide settings shared by every index build.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{DatasetResult, ToyboxError};

const DEFAULT_CONFIG_NAME: &str = "toybox.toml";
const DEFAULT_CACHE_FILE: &str = "squares_same_nview.csv";

/// Toybox object categories, in label order.
pub const TOYBOX_CATEGORIES: [&str; 12] = [
    "airplane",
    "ball",
    "car",
    "cat",
    "cup",
    "duck",
    "giraffe",
    "helicopter",
    "horse",
    "mug",
    "spoon",
    "truck",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToyboxConfig {
    /// Ordered category names; a sample's label is its category's position here.
    pub categories: Vec<String>,
    /// Directory holding the index cache.
    pub cache_dir: PathBuf,
    /// File name of the index cache inside `cache_dir`.
    pub cache_file: String,
    /// Read an existing cache instead of rescanning the dataset root.
    pub read_cache: bool,
}

impl Default for ToyboxConfig {
    fn default() -> Self {
        Self {
            categories: TOYBOX_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            cache_dir: PathBuf::from("cache"),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
            read_cache: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToyboxConfigFile {
    categories: Option<Vec<String>>,
    cache: Option<CacheSection>,
}

#[derive(Debug, Deserialize, Default)]
struct CacheSection {
    dir: Option<String>,
    file: Option<String>,
    read: Option<bool>,
}

impl ToyboxConfig {
    /// Load from `$TOYBOX_CONFIG` (or `toybox.toml`), then apply env overrides.
    ///
    /// A missing file yields the defaults; an unreadable one is logged and ignored.
    pub fn load() -> Self {
        Self::load_with(process_env)
    }

    /// [`Self::load`] with variables resolved through `env` instead of the process.
    pub fn load_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = env("TOYBOX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME));
        let cfg = if path.exists() {
            match Self::from_path_with(&path, &env) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!(%err, "toybox config ignored; using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        let cfg = cfg.with_overrides_from(&env);
        for warning in cfg.validate() {
            tracing::warn!("toybox config: {warning}");
        }
        cfg
    }

    pub fn from_path(path: &Path) -> DatasetResult<Self> {
        Self::from_path_with(path, process_env)
    }

    fn from_path_with<F>(path: &Path, env: F) -> DatasetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = std::fs::read_to_string(path).map_err(|e| ToyboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: ToyboxConfigFile = toml::from_str(&raw).map_err(|e| ToyboxError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_file(file, env))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let file: ToyboxConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file, process_env))
    }

    fn from_file<F>(file: ToyboxConfigFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cache = file.cache.unwrap_or_default();
        ToyboxConfig {
            categories: file.categories.unwrap_or(defaults.categories),
            cache_dir: cache
                .dir
                .map(|v| resolve_path(&v, &env))
                .unwrap_or(defaults.cache_dir),
            cache_file: cache
                .file
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.cache_file),
            read_cache: cache.read.unwrap_or(defaults.read_cache),
        }
    }

    /// `TOYBOX_CACHE_DIR` and `TOYBOX_READ_CACHE` win over file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(process_env)
    }

    /// Same as [`Self::with_env_overrides`], reading variables through `env`.
    pub fn with_overrides_from<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = env("TOYBOX_CACHE_DIR").filter(|d| !d.trim().is_empty()) {
            self.cache_dir = resolve_path(&dir, &env);
        }
        if let Some(val) = env("TOYBOX_READ_CACHE") {
            match parse_flag(&val) {
                Some(flag) => self.read_cache = flag,
                None => tracing::warn!(value = %val, "TOYBOX_READ_CACHE is not a boolean; ignored"),
            }
        }
        self
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(&self.cache_file)
    }

    /// Label of `category`, i.e. its position in [`Self::categories`].
    pub fn label_of(&self, category: &str) -> DatasetResult<usize> {
        self.categories
            .iter()
            .position(|c| c == category)
            .ok_or_else(|| ToyboxError::UnknownCategory(category.to_string()))
    }

    /// Non-fatal problems with the configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.categories.is_empty() {
            warnings.push("categories is empty; every sample lookup will fail".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for c in &self.categories {
            if !seen.insert(c.as_str()) {
                warnings.push(format!("category {c:?} listed more than once"));
            }
        }
        if self.cache_file.trim().is_empty() {
            warnings.push("cache file name is empty".to_string());
        }
        warnings
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Resolve a leading `~` against `HOME` and `${VAR}` placeholders, both through `env`.
/// Unknown variables are left in place.
fn resolve_path<F>(raw: &str, env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let home = raw
        .strip_prefix('~')
        .and_then(|rest| env("HOME").map(|home| format!("{home}{rest}")));
    let raw = home.as_deref().unwrap_or(raw);

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = &after[..end];
        match env(key) {
            Some(val) => out.push_str(&val),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    PathBuf::from(out)
}
