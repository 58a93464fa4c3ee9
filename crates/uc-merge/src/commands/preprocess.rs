use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use ucm_merge::decode::decode_text;
use ucm_merge::{preprocess, Preprocessed};

use crate::errors::CliError;
use crate::utils::parse_definitions;

#[derive(Debug)]
pub struct PreprocessArgs {
    pub file: Utf8PathBuf,
    pub definitions: Vec<String>,
}

/// Print one file as the merge would see it.
pub fn preprocess_file(args: PreprocessArgs) -> Result<()> {
    let definitions = parse_definitions(&args.definitions)?;

    let data = std::fs::read(&args.file).map_err(|source| {
        CliError::from(ucm_merge::Error::Io {
            path: args.file.clone(),
            source,
        })
    })?;
    let text = decode_text(&data);

    match preprocess(&text, &definitions) {
        Ok(Preprocessed::Text(text)) => print!("{text}"),
        Ok(Preprocessed::Skipped(reason)) => {
            eprintln!("{} {}", "skipped:".yellow().bold(), reason);
        }
        Err(source) => {
            return Err(CliError::from(ucm_merge::Error::Preprocess {
                path: args.file,
                source,
            })
            .into())
        }
    }

    Ok(())
}
