//! Writing a merged index to disk.

use crate::error::{Error, Result};
use crate::index::MergeIndex;
use crate::unit::{AssetPayload, MergeUnit};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Write every merged file to `out_dir/<namespace>/<TypeDir>/<filename>`.
///
/// Scripts and text assets are written as UTF-8, binary assets byte-for-byte.
/// Returns the written paths in merge-key order.
pub fn write_merged(index: &MergeIndex, out_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    tracing::info!("Writing {} files to {}", index.len(), out_dir);

    let mut written = Vec::with_capacity(index.len());
    for unit in index.files().values() {
        let location = unit.location();
        let path = output_path(out_dir, &location.namespace, &location.type_dir, &location.filename);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let bytes: &[u8] = match unit {
            MergeUnit::Script(script) => script.content.as_bytes(),
            MergeUnit::Asset(asset) => match &asset.payload {
                AssetPayload::Text(text) => text.as_bytes(),
                AssetPayload::Binary(data) => data,
            },
        };

        tracing::debug!("Writing {} from '{}'", path, unit.layer());
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        written.push(path);
    }

    Ok(written)
}

fn output_path(out_dir: &Utf8Path, namespace: &str, type_dir: &str, filename: &str) -> Utf8PathBuf {
    let mut path = out_dir.join(namespace).join(type_dir);
    // filenames below the type dir may carry either separator
    for part in filename.split(['/', '\\']).filter(|part| !part.is_empty()) {
        path.push(part);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Location;
    use crate::header::parse_header;
    use crate::unit::{AncillaryUnit, Layer, SourceUnit};
    use tempfile::TempDir;

    fn location(namespace: &str, type_dir: &str, filename: &str) -> Location {
        Location {
            path: Utf8PathBuf::from(format!("/src/{namespace}/{type_dir}/{filename}")),
            filename: filename.to_string(),
            namespace: namespace.to_string(),
            type_dir: type_dir.to_string(),
            parent: None,
        }
    }

    #[test]
    fn test_write_merged() {
        let temp = TempDir::new().unwrap();
        let out = Utf8PathBuf::from_path_buf(temp.path().join("out")).unwrap();

        let content = "class Foo extends Bar;\n// caf\u{e9}\n";
        let mut index = MergeIndex::new();
        index.record(SourceUnit::new(
            Layer::Vanilla,
            location("DeusEx", "Classes", "Foo.uc"),
            content.to_string(),
            parse_header(content).unwrap(),
        ));
        index.record_asset(AncillaryUnit {
            layer: Layer::Vanilla,
            location: location("DeusEx", "Textures", "Sub/Logo.pcx"),
            payload: AssetPayload::Binary(vec![0, 159, 255]),
        });

        let written = write_merged(&index, &out).unwrap();
        assert_eq!(written.len(), 2);

        let script = fs::read_to_string(out.join("DeusEx/Classes/Foo.uc")).unwrap();
        assert_eq!(script, content);
        let texture = fs::read(out.join("DeusEx/Textures/Sub/Logo.pcx")).unwrap();
        assert_eq!(texture, [0, 159, 255]);
    }

    #[test]
    fn test_output_path_splits_either_separator() {
        let out = Utf8Path::new("/out");
        assert_eq!(
            output_path(out, "NS", "Classes", r"Sub\Foo.uc"),
            Utf8PathBuf::from("/out/NS/Classes/Sub/Foo.uc")
        );
    }
}
