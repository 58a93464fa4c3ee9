//! Path conventions for layered source trees.
//!
//! Every layer arranges its files as `.../<namespace>/<TypeDir>/<file>`, where
//! `<TypeDir>` is one of [`TYPE_DIRS`]. Scripts are `.uc` files directly under
//! (or below) a `Classes` directory; everything else under a type directory is
//! an ancillary asset.

use camino::{Utf8Path, Utf8PathBuf};

/// Directory names that mark the start of a package's content.
pub const TYPE_DIRS: [&str; 4] = ["Classes", "Textures", "Sounds", "Text"];
pub const SCRIPT_TYPE_DIR: &str = "Classes";
pub const SCRIPT_EXTENSION: &str = "uc";

/// Where a file sits in the package layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: Utf8PathBuf,
    /// Path below the type directory, joined with the path's own separator.
    pub filename: String,
    pub namespace: String,
    pub type_dir: String,
    /// Folder above the namespace, if any.
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Script(Location),
    Ancillary(Location),
    NotRelevant,
}

impl Classification {
    pub fn location(&self) -> Option<&Location> {
        match self {
            Classification::Script(location) | Classification::Ancillary(location) => {
                Some(location)
            }
            Classification::NotRelevant => None,
        }
    }
}

/// Classifies candidate paths into scripts, ancillary assets or noise.
#[derive(Debug, Clone, Default)]
pub struct PathClassifier {
    /// Lowercase extensions accepted as ancillary assets; `None` accepts all.
    ancillary_extensions: Option<Vec<String>>,
}

impl PathClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ancillary_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ancillary_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        );
        self
    }

    pub fn classify(&self, path: &Utf8Path) -> Classification {
        let Some((location, found)) = locate(path) else {
            return Classification::NotRelevant;
        };

        if found
            && location.type_dir == SCRIPT_TYPE_DIR
            && has_extension(&location.filename, SCRIPT_EXTENSION)
        {
            return Classification::Script(location);
        }

        if self.accepts_ancillary(&location.filename) {
            Classification::Ancillary(location)
        } else {
            Classification::NotRelevant
        }
    }

    fn accepts_ancillary(&self, filename: &str) -> bool {
        let Some(allowed) = &self.ancillary_extensions else {
            return true;
        };
        let extension = Utf8Path::new(filename)
            .extension()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        allowed.iter().any(|ext| *ext == extension)
    }
}

fn has_extension(filename: &str, extension: &str) -> bool {
    Utf8Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Split `path` into its layout parts.
///
/// Returns the location and whether a type directory was actually found.
/// Without one, paths of at least three components fall back to fixed
/// positions: `<namespace>/<type>/<file>` from the end, parent four from the
/// end.
fn locate(path: &Utf8Path) -> Option<(Location, bool)> {
    let parts: Vec<&str> = path.components().map(|c| c.as_str()).collect();
    if parts.len() < 3 {
        return None;
    }

    let separator = if path.as_str().contains('\\') && !path.as_str().contains('/') {
        "\\"
    } else {
        "/"
    };

    let type_idx = parts.iter().rposition(|part| TYPE_DIRS.contains(part));

    let (type_idx, parent, found) = match type_idx {
        // a type dir needs a namespace above it and a file below it
        Some(idx) if idx >= 1 && idx + 1 < parts.len() => {
            let parent = idx.checked_sub(2).map(|i| parts[i].to_string());
            (idx, parent, true)
        }
        Some(_) => return None,
        None => {
            let idx = parts.len() - 2;
            let parent = (parts.len() > 3).then(|| parts[parts.len() - 4].to_string());
            (idx, parent, false)
        }
    };

    let location = Location {
        path: path.to_path_buf(),
        filename: parts[type_idx + 1..].join(separator),
        namespace: parts[type_idx - 1].to_string(),
        type_dir: parts[type_idx].to_string(),
        parent,
    };
    Some((location, found))
}
