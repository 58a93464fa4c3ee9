//! Turning files on disk into merge units.

use crate::classify::{Classification, Location, PathClassifier};
use crate::decode::decode_text;
use crate::definitions::DefinitionSet;
use crate::error::{Error, Result};
use crate::header::parse_header;
use crate::preprocessor::{preprocess, Preprocessed, SkipReason};
use crate::unit::{AncillaryUnit, AssetPayload, Layer, SourceUnit};
use camino::Utf8Path;

/// Ancillary extensions decoded as text. Anything else is carried as bytes.
pub const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// Result of reading one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Script(SourceUnit),
    /// A file gate excluded the script.
    Skipped(SkipReason),
}

/// Read, preprocess and parse the script at `path`.
///
/// `injects` headers are demoted to `extends` unless the `injections` flag is
/// defined.
pub fn read_source_unit(
    layer: &Layer,
    path: &Utf8Path,
    definitions: &DefinitionSet,
) -> Result<ReadOutcome> {
    let Classification::Script(location) = PathClassifier::new().classify(path) else {
        return Err(Error::NotAScript(path.to_path_buf()));
    };

    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let text = decode_text(&data);

    let content = match preprocess(&text, definitions) {
        Ok(Preprocessed::Text(content)) => content,
        Ok(Preprocessed::Skipped(reason)) => return Ok(ReadOutcome::Skipped(reason)),
        Err(source) => {
            return Err(Error::Preprocess {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let header = parse_header(&content).map_err(|source| Error::Header {
        path: path.to_path_buf(),
        source,
    })?;

    let mut unit = SourceUnit::new(layer.clone(), location, content, header);
    if !definitions.injections_enabled() {
        unit.demote_injection();
    }
    Ok(ReadOutcome::Script(unit))
}

/// Read an ancillary asset already located by the classifier.
pub fn read_ancillary_unit(layer: &Layer, location: Location) -> Result<AncillaryUnit> {
    let data = std::fs::read(&location.path).map_err(|e| Error::io(&location.path, e))?;

    let payload = if is_text_asset(&location.filename) {
        AssetPayload::Text(decode_text(&data))
    } else {
        AssetPayload::Binary(data)
    };

    Ok(AncillaryUnit {
        layer: layer.clone(),
        location,
        payload,
    })
}

fn is_text_asset(filename: &str) -> bool {
    Utf8Path::new(filename).extension().is_some_and(|ext| {
        TEXT_EXTENSIONS
            .iter()
            .any(|text_ext| ext.eq_ignore_ascii_case(text_ext))
    })
}
