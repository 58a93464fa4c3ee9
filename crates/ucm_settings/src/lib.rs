//! Settings and profile definitions for the `uc-merge` toolchain.
//!
//! A settings file holds one or more named [`Profile`]s. Each profile names a
//! vanilla source tree, an ordered list of mod layers, the output directory and
//! the preprocessor definitions used for the run. Settings can be written as
//! JSON or TOML; an optional defaults file is deep-merged underneath the user
//! file before deserialization (see [`merge_values`]).

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("settings do not describe a valid profile map: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("unsupported settings format: {0} (expected .json or .toml)")]
    UnsupportedFormat(Utf8PathBuf),

    #[error("unknown profile: {0}")]
    UnknownProfile(String),
}

/// Digest used by a [`HashCheck`].
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "MD5"),
            HashAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// Expected content hash of one vanilla class, used to detect upstream changes.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct HashCheck {
    /// Qualified class id, e.g. `DeusEx.DeusExPlayer`
    pub class: String,
    /// Hex digest of the decoded, preprocessed class text (UTF-8 bytes).
    /// Compared case-insensitively.
    pub expected: String,
    /// MD5 unless the check asks for `sha256`.
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

/// One merge configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Profile {
    /// The vanilla baseline. Optional so mod-only runs are possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<Utf8PathBuf>,

    /// Mod layers, applied in order (later layers win).
    #[serde(default)]
    pub mods_paths: Vec<Utf8PathBuf>,

    /// Root of the merged output tree.
    pub out_dir: Utf8PathBuf,

    /// Feature flags controlling `#ifdef` blocks, file gates and `injects` demotion.
    ///
    /// Values may be strings, booleans or numbers. `null` means "not defined".
    #[serde(default)]
    pub preproc_definitions: BTreeMap<String, serde_json::Value>,

    /// Path substrings; any mod-layer file whose path contains one is skipped.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Namespace renames applied to mod-layer units, e.g. `GMDXv9 -> DeusEx`.
    #[serde(default)]
    pub rewrite_packages: BTreeMap<String, String>,

    #[serde(default)]
    pub hash_checks: Vec<HashCheck>,

    /// Minimum number of recorded files expected from the vanilla layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_source_files: Option<usize>,

    /// Minimum number of recorded files expected from each mod layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_mod_files: Option<usize>,

    /// Lowercase extensions (without the dot) accepted as ancillary assets.
    /// When unset, every non-script file under a type directory is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancillary_extensions: Option<Vec<String>>,

    #[serde(default)]
    pub verbose: bool,
}

/// All profiles of a settings file, keyed by profile name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(transparent)]
pub struct Settings {
    pub profiles: BTreeMap<String, Profile>,
}

impl Settings {
    /// Resolve a profile selector.
    ///
    /// `all` selects every profile in name order; anything else is a
    /// comma-separated list of profile names, returned in the given order.
    pub fn select(&self, selector: &str) -> Result<Vec<(&str, &Profile)>> {
        if selector.trim() == "all" {
            return Ok(self
                .profiles
                .iter()
                .map(|(name, profile)| (name.as_str(), profile))
                .collect());
        }

        selector
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                self.profiles
                    .get_key_value(name)
                    .map(|(name, profile)| (name.as_str(), profile))
                    .ok_or_else(|| SettingsError::UnknownProfile(name.to_string()))
            })
            .collect()
    }
}

/// Deep-merge `priority` over `base`.
///
/// Objects are merged key by key, recursively. Any other value present in
/// `priority` replaces the value in `base` wholesale (arrays are not concatenated).
pub fn merge_values(base: &serde_json::Value, priority: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (base, priority) {
        (Value::Object(base), Value::Object(priority)) => {
            let mut merged = base.clone();
            for (key, value) in priority {
                let next = match base.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, priority) => priority.clone(),
    }
}

/// Read a JSON or TOML file into a generic value tree.
pub fn read_value(path: &Utf8Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path.as_std_path()).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("json") => serde_json::from_str(&contents).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("toml") => toml::from_str(&contents).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(SettingsError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load settings from `path`, deep-merged over `defaults` when given.
pub fn load_settings(path: &Utf8Path, defaults: Option<&Utf8Path>) -> Result<Settings> {
    let user = read_value(path)?;
    let merged = match defaults {
        Some(defaults) => merge_values(&read_value(defaults)?, &user),
        None => user,
    };

    serde_json::from_value(merged).map_err(SettingsError::Shape)
}
