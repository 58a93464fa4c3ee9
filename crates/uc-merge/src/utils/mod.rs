use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use ucm_merge::DefinitionSet;
use ucm_settings::{Profile, Settings};

pub mod logging;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// Load the settings file, deep-merged over `defaults` when given.
pub fn load_settings(config: &Utf8Path, defaults: Option<&Utf8Path>) -> Result<Settings> {
    for path in std::iter::once(config).chain(defaults) {
        if !path.is_file() {
            return Err(CliError::config_not_found(path.to_path_buf()).into());
        }
    }

    let settings = ucm_settings::load_settings(config, defaults).map_err(CliError::from)?;
    Ok(settings)
}

/// Resolve `--profile` to exactly one profile.
///
/// Without a selector the settings must contain a single profile.
pub fn select_one<'a>(
    settings: &'a Settings,
    selector: Option<&str>,
) -> Result<(&'a str, &'a Profile)> {
    if let Some(selector) = selector {
        let selected = settings.select(selector).map_err(CliError::from)?;
        if let [single] = selected.as_slice() {
            return Ok(*single);
        }
        return Err(ambiguous(selected.iter().map(|(name, _)| *name)).into());
    }

    let mut profiles = settings.profiles.iter();
    match (profiles.next(), profiles.next()) {
        (Some((name, profile)), None) => Ok((name.as_str(), profile)),
        _ => Err(ambiguous(settings.profiles.keys().map(String::as_str)).into()),
    }
}

fn ambiguous<'a>(names: impl Iterator<Item = &'a str>) -> CliError {
    let names: Vec<&str> = names.collect();
    CliError::AmbiguousProfile {
        count: names.len(),
        available: names.join(", "),
    }
}

/// Parse `-D NAME=VALUE` arguments. A bare `NAME` defines the flag with an empty value.
pub fn parse_definitions(definitions: &[String]) -> Result<DefinitionSet> {
    definitions
        .iter()
        .map(|definition| -> Result<(String, String)> {
            let (name, value) = definition
                .split_once('=')
                .unwrap_or((definition.as_str(), ""));
            let name = name.trim();
            if name.is_empty() {
                return Err(CliError::invalid_definition(definition.as_str()).into());
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

/// `path` relative to `base` when possible, for shorter output.
pub fn display_path(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(base)
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile() -> Profile {
        Profile {
            source_path: None,
            mods_paths: Vec::new(),
            out_dir: Utf8PathBuf::from("out"),
            preproc_definitions: BTreeMap::new(),
            blacklist: Vec::new(),
            rewrite_packages: BTreeMap::new(),
            hash_checks: Vec::new(),
            min_source_files: None,
            min_mod_files: None,
            ancillary_extensions: None,
            verbose: false,
        }
    }

    #[test]
    fn parse_definitions_valid() {
        let definitions =
            parse_definitions(&["vanilla=true".to_string(), "gmdx".to_string()]).unwrap();
        assert_eq!(definitions.get("vanilla"), Some("true"));
        assert_eq!(definitions.get("gmdx"), Some(""));
        assert!(parse_definitions(&["=1".to_string()]).is_err());
    }

    #[test]
    fn select_one_profile() {
        let mut settings = Settings::default();
        settings.profiles.insert("vanilla".to_string(), profile());
        assert_eq!(select_one(&settings, None).unwrap().0, "vanilla");

        settings.profiles.insert("gmdx".to_string(), profile());
        assert!(select_one(&settings, None).is_err());
        assert_eq!(select_one(&settings, Some("gmdx")).unwrap().0, "gmdx");
        assert!(select_one(&settings, Some("all")).is_err());
    }

    #[test]
    fn missing_config_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("nope.toml")).unwrap();
        assert!(load_settings(&missing, None).is_err());
    }
}
