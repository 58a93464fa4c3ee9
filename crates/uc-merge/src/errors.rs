use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;
use ucm_settings::SettingsError;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Settings file not found: {path}")]
    #[diagnostic(
        code(config::not_found),
        help("Pass the path of a .json or .toml settings file with --config")
    )]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Settings error")]
    #[diagnostic(
        code(config::parse_error),
        help("Check the settings file for syntax errors and unknown profile names")
    )]
    Settings {
        #[from]
        source: SettingsError,
    },

    #[error("Settings define {count} profiles, pick one with --profile")]
    #[diagnostic(code(config::ambiguous_profile), help("Available profiles: {available}"))]
    AmbiguousProfile { count: usize, available: String },

    #[error("Invalid definition: {definition}")]
    #[diagnostic(
        code(cli::invalid_definition),
        help("Definitions are written NAME or NAME=VALUE, e.g. -D vanilla=true")
    )]
    InvalidDefinition { definition: String },

    #[error("Merge failed")]
    #[diagnostic(
        code(merge::failed),
        help("Fix the reported source file; nothing was written")
    )]
    Merge {
        #[from]
        source: ucm_merge::Error,
    },

    #[error("Writing the merged tree failed")]
    #[diagnostic(
        code(merge::write_failed),
        help("Check file permissions and available disk space in out_dir")
    )]
    WriteFailed {
        out_dir: Utf8PathBuf,
        #[source]
        source: ucm_merge::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { path }
    }

    pub fn invalid_definition(definition: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            definition: definition.into(),
        }
    }

    pub fn write_failed(out_dir: Utf8PathBuf, source: ucm_merge::Error) -> Self {
        Self::WriteFailed { out_dir, source }
    }
}
