//! Layered merge driver.
//!
//! The [`MergeBuilder`] walks the vanilla layer and then every mod layer in
//! order, feeding each file through the reader into a single [`MergeIndex`].
//!
//! # Build Algorithm
//!
//! 1. Walk the layer directory recursively and sort the regular files by path.
//! 2. In mod layers, drop any path containing a blacklist substring.
//! 3. Classify each path with the [`PathClassifier`]:
//!    - scripts are decoded, preprocessed and parsed ([`read_source_unit`]);
//!      files excluded by a `#compileif`/`#dontcompileif` gate are logged and
//!      reported in [`MergeOutcome::skipped`],
//!    - ancillary assets are decoded or carried as bytes ([`read_ancillary_unit`]),
//!    - anything else is ignored.
//! 4. Mod-layer units have their namespace renamed through `rewrite_packages`.
//! 5. Every unit is recorded in the index. Later layers replace earlier units
//!    with the same key (last-writer-wins).
//! 6. After the vanilla layer, the minimum file count and the configured hash
//!    checks are enforced. After each mod layer, the mod minimum is enforced.
//!
//! Any error aborts the whole build; no partial index is returned.

use crate::classify::{Classification, PathClassifier};
use crate::decode::content_hash;
use crate::definitions::DefinitionSet;
use crate::error::{Error, Result};
use crate::index::MergeIndex;
use crate::preprocessor::SkipReason;
use crate::reader::{read_ancillary_unit, read_source_unit, ReadOutcome};
use crate::unit::Layer;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use ucm_settings::{HashCheck, Profile};
use walkdir::WalkDir;

/// A script excluded by a file gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: Utf8PathBuf,
    pub layer: Layer,
    pub reason: SkipReason,
}

/// Per-layer counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub layer: Layer,
    pub root: Utf8PathBuf,
    /// Scripts recorded from this layer.
    pub scripts: usize,
    /// Ancillary assets recorded from this layer.
    pub assets: usize,
    /// Scripts excluded by a file gate.
    pub skipped: usize,
    /// Paths dropped by the blacklist.
    pub blacklisted: usize,
    /// Paths the classifier did not consider relevant.
    pub ignored: usize,
}

impl LayerReport {
    fn new(layer: Layer, root: &Utf8Path) -> Self {
        Self {
            layer,
            root: root.to_path_buf(),
            scripts: 0,
            assets: 0,
            skipped: 0,
            blacklisted: 0,
            ignored: 0,
        }
    }

    /// Files recorded from this layer.
    pub fn recorded(&self) -> usize {
        self.scripts + self.assets
    }
}

#[derive(Debug, Clone)]
pub struct MergeStats {
    pub layers: Vec<LayerReport>,
    /// Wall-clock time for the entire build.
    pub build_time: Duration,
}

/// Everything a finished build produced.
#[derive(Debug)]
pub struct MergeOutcome {
    pub index: MergeIndex,
    pub skipped: Vec<SkippedFile>,
    pub stats: MergeStats,
}

/// Configures and runs one layered merge.
///
/// ```no_run
/// use ucm_merge::{DefinitionSet, MergeBuilder};
///
/// # fn main() -> ucm_merge::Result<()> {
/// let definitions = DefinitionSet::new().with("gmdx", "true");
/// let outcome = MergeBuilder::new(definitions)
///     .with_vanilla("C:/DeusEx/Source")
///     .with_mod("C:/mods/GMDX")
///     .with_blacklist(["/GMDX/Classes/DeusExGameInfo.uc"])
///     .build()?;
/// println!("{} classes", outcome.index.script_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MergeBuilder {
    definitions: DefinitionSet,
    vanilla: Option<Utf8PathBuf>,
    mods: Vec<Utf8PathBuf>,
    blacklist: Vec<String>,
    rewrite_packages: BTreeMap<String, String>,
    hash_checks: Vec<HashCheck>,
    min_source_files: Option<usize>,
    min_mod_files: Option<usize>,
    classifier: PathClassifier,
}

impl MergeBuilder {
    pub fn new(definitions: DefinitionSet) -> Self {
        Self {
            definitions,
            vanilla: None,
            mods: Vec::new(),
            blacklist: Vec::new(),
            rewrite_packages: BTreeMap::new(),
            hash_checks: Vec::new(),
            min_source_files: None,
            min_mod_files: None,
            classifier: PathClassifier::new(),
        }
    }

    /// Configure a builder from a settings profile.
    pub fn from_profile(profile: &Profile) -> Self {
        let mut classifier = PathClassifier::new();
        if let Some(extensions) = &profile.ancillary_extensions {
            classifier = classifier.with_ancillary_extensions(extensions);
        }

        let mut builder = Self::new(DefinitionSet::from_json_map(&profile.preproc_definitions))
            .with_blacklist(profile.blacklist.iter().cloned())
            .with_rewrite_packages(profile.rewrite_packages.clone())
            .with_hash_checks(profile.hash_checks.clone())
            .with_min_files(profile.min_source_files, profile.min_mod_files)
            .with_classifier(classifier);

        if let Some(source) = &profile.source_path {
            builder = builder.with_vanilla(source);
        }
        for mod_path in &profile.mods_paths {
            builder = builder.with_mod(mod_path);
        }
        builder
    }

    pub fn with_vanilla(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.vanilla = Some(dir.into());
        self
    }

    /// Append a mod layer. Mods are processed in the order they are added.
    pub fn with_mod(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.mods.push(dir.into());
        self
    }

    /// Path substrings excluded from mod layers.
    pub fn with_blacklist<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Namespace renames applied to mod-layer units before recording.
    pub fn with_rewrite_packages(mut self, rewrites: BTreeMap<String, String>) -> Self {
        self.rewrite_packages = rewrites;
        self
    }

    pub fn with_hash_checks(mut self, checks: Vec<HashCheck>) -> Self {
        self.hash_checks = checks;
        self
    }

    pub fn with_min_files(mut self, source: Option<usize>, per_mod: Option<usize>) -> Self {
        self.min_source_files = source;
        self.min_mod_files = per_mod;
        self
    }

    pub fn with_classifier(mut self, classifier: PathClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }

    /// Run the merge. See module-level docs for the full algorithm.
    pub fn build(&self) -> Result<MergeOutcome> {
        let start_time = Instant::now();
        let mut index = MergeIndex::new();
        let mut skipped = Vec::new();
        let mut layers = Vec::new();

        tracing::info!("Building merge...");
        tracing::info!("Definitions: {}", self.definitions.len());

        if let Some(vanilla) = &self.vanilla {
            tracing::info!("processing source files from {}", vanilla);
            let report = self.merge_layer(Layer::Vanilla, vanilla, &mut index, &mut skipped)?;
            check_min_files(&report, self.min_source_files)?;
            self.run_hash_checks(&index)?;
            layers.push(report);
        }

        for (order, dir) in self.mods.iter().enumerate() {
            let layer = Layer::Mod {
                name: mod_name(dir),
                order,
            };
            tracing::info!("processing files from mod {}", dir);
            let report = self.merge_layer(layer, dir, &mut index, &mut skipped)?;
            check_min_files(&report, self.min_mod_files)?;
            layers.push(report);
        }

        tracing::info!(
            "Merged {} classes and {} assets, {} injection targets, {} files skipped",
            index.script_count(),
            index.asset_count(),
            index.injections().len(),
            skipped.len()
        );

        Ok(MergeOutcome {
            index,
            skipped,
            stats: MergeStats {
                layers,
                build_time: start_time.elapsed(),
            },
        })
    }

    fn merge_layer(
        &self,
        layer: Layer,
        root: &Utf8Path,
        index: &mut MergeIndex,
        skipped: &mut Vec<SkippedFile>,
    ) -> Result<LayerReport> {
        let mut report = LayerReport::new(layer.clone(), root);
        let mut last_folder: Option<Utf8PathBuf> = None;

        for path in list_files(root)? {
            if !layer.is_vanilla() && self.is_blacklisted(&path) {
                tracing::debug!("Blacklisted {}", path);
                report.blacklisted += 1;
                continue;
            }

            match self.classifier.classify(&path) {
                Classification::Script(_) => {
                    let folder = path.parent().map(Utf8Path::to_path_buf);
                    if folder != last_folder {
                        tracing::info!(
                            "Processing folder {} from {}",
                            folder.as_deref().unwrap_or(root),
                            layer
                        );
                        last_folder = folder;
                    }
                    tracing::debug!("Processing {} from {}", path, layer);

                    match read_source_unit(&layer, &path, &self.definitions)? {
                        ReadOutcome::Script(mut unit) => {
                            if !layer.is_vanilla() {
                                if let Some(namespace) = self.rewrite_packages.get(unit.namespace())
                                {
                                    unit.set_namespace(namespace.clone());
                                }
                            }
                            index.record(unit);
                            report.scripts += 1;
                        }
                        ReadOutcome::Skipped(reason) => {
                            tracing::warn!("Skipping {}: {}", path, reason);
                            report.skipped += 1;
                            skipped.push(SkippedFile {
                                path,
                                layer: layer.clone(),
                                reason,
                            });
                        }
                    }
                }
                Classification::Ancillary(location) => {
                    tracing::debug!("Processing {} from {}", path, layer);
                    let mut unit = read_ancillary_unit(&layer, location)?;
                    if !layer.is_vanilla() {
                        if let Some(namespace) = self.rewrite_packages.get(&unit.location.namespace)
                        {
                            unit.location.namespace = namespace.clone();
                        }
                    }
                    index.record_asset(unit);
                    report.assets += 1;
                }
                Classification::NotRelevant => {
                    tracing::debug!("Ignoring {}", path);
                    report.ignored += 1;
                }
            }
        }

        tracing::info!(
            "Layer '{}': {} scripts, {} assets, {} skipped, {} blacklisted",
            layer,
            report.scripts,
            report.assets,
            report.skipped,
            report.blacklisted
        );
        Ok(report)
    }

    fn is_blacklisted(&self, path: &Utf8Path) -> bool {
        let normalized = path.as_str().replace('\\', "/");
        self.blacklist
            .iter()
            .any(|entry| !entry.is_empty() && normalized.contains(entry.as_str()))
    }

    fn run_hash_checks(&self, index: &MergeIndex) -> Result<()> {
        for check in &self.hash_checks {
            let unit = index
                .script(&check.class)
                .ok_or_else(|| Error::MissingHashTarget(check.class.clone()))?;
            let actual = content_hash(&unit.content, check.algorithm);
            tracing::debug!("{} of {} is {}", check.algorithm, check.class, actual);

            if !actual.eq_ignore_ascii_case(&check.expected) {
                return Err(Error::HashMismatch {
                    class: check.class.clone(),
                    algorithm: check.algorithm,
                    expected: check.expected.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

fn check_min_files(report: &LayerReport, minimum: Option<usize>) -> Result<()> {
    match minimum {
        Some(minimum) if report.recorded() < minimum => Err(Error::TooFewFiles {
            layer: report.layer.to_string(),
            found: report.recorded(),
            minimum,
        }),
        _ => Ok(()),
    }
}

/// Display name of a mod layer: its directory name, or the path as given.
fn mod_name(dir: &Utf8Path) -> String {
    dir.file_name()
        .map(str::to_string)
        .unwrap_or_else(|| dir.to_string())
}

/// All regular files below `root`, sorted by path.
fn list_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root.as_std_path()) {
        let entry = entry.map_err(|e| Error::io(root, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(Error::InvalidPath)?;
        files.push(path);
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::MergeUnit;
    use tempfile::TempDir;
    use ucm_settings::HashAlgorithm;

    struct Tree {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    impl Tree {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
            Self { _temp: temp, root }
        }

        fn write(&self, rel: &str, content: &str) -> &Self {
            let path = self.root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
            self
        }
    }

    #[test]
    fn test_layers_in_order() {
        let tree = Tree::new();
        tree.write("Source/DeusEx/Classes/Foo.uc", "class Foo extends Bar;\n// vanilla\n")
            .write("Source/DeusEx/Classes/Bar.uc", "class Bar extends Object;\n")
            .write("GMDX/DeusEx/Classes/Foo.uc", "class Foo extends Bar;\n// gmdx\n")
            .write("GMDX/DeusEx/Text/Notes.txt", "hello\r\n");

        let outcome = MergeBuilder::new(DefinitionSet::new())
            .with_vanilla(tree.root.join("Source"))
            .with_mod(tree.root.join("GMDX"))
            .build()
            .unwrap();

        let foo = outcome.index.script("DeusEx.Foo").unwrap();
        assert!(foo.content.ends_with("// gmdx\n"));
        assert_eq!(foo.layer.name(), "GMDX");
        assert_eq!(outcome.index.script_count(), 2);
        assert_eq!(outcome.index.asset_count(), 1);

        let layers = &outcome.stats.layers;
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].scripts, 2);
        assert_eq!(layers[1].scripts, 1);
        assert_eq!(layers[1].assets, 1);
        assert_eq!(layers[0].layer.precedence(), 0);
        assert_eq!(layers[1].layer.precedence(), 1);
    }

    #[test]
    fn test_blacklist_only_applies_to_mods() {
        let tree = Tree::new();
        tree.write("Source/DeusEx/Classes/GameInfo.uc", "class GameInfo extends Info;\n")
            .write("GMDX/DeusEx/Classes/GameInfo.uc", "class GameInfo extends Info;\n// mod\n");

        let outcome = MergeBuilder::new(DefinitionSet::new())
            .with_vanilla(tree.root.join("Source"))
            .with_mod(tree.root.join("GMDX"))
            .with_blacklist(["/Classes/GameInfo.uc"])
            .build()
            .unwrap();

        let unit = outcome.index.script("DeusEx.GameInfo").unwrap();
        assert!(unit.layer.is_vanilla());
        assert_eq!(outcome.stats.layers[1].blacklisted, 1);
    }

    #[test]
    fn test_gated_files_reported() {
        let tree = Tree::new();
        tree.write(
            "Mod/DeusEx/Classes/HXOnly.uc",
            "#compileif hx\nclass HXOnly extends Actor;\n",
        );

        let outcome = MergeBuilder::new(DefinitionSet::new())
            .with_mod(tree.root.join("Mod"))
            .build()
            .unwrap();

        assert!(outcome.index.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason.condition, "hx");
        assert_eq!(outcome.stats.layers[0].skipped, 1);
    }

    #[test]
    fn test_rewrite_packages() {
        let tree = Tree::new();
        tree.write("Mod/GMDX/Classes/Foo.uc", "class Foo shims Bar;\n")
            .write("Mod/GMDX/Textures/Foo.pcx", "bytes");

        let rewrites = BTreeMap::from([("GMDX".to_string(), "DeusEx".to_string())]);
        let outcome = MergeBuilder::new(DefinitionSet::new())
            .with_mod(tree.root.join("Mod"))
            .with_rewrite_packages(rewrites)
            .build()
            .unwrap();

        assert!(outcome.index.script("DeusEx.Foo").is_some());
        assert_eq!(outcome.index.injections_for("DeusEx.Bar").len(), 1);
        assert!(matches!(
            outcome.index.get("DeusEx/Textures/Foo.pcx"),
            Some(MergeUnit::Asset(_))
        ));
    }

    #[test]
    fn test_hash_checks() {
        let tree = Tree::new();
        tree.write("Source/DeusEx/Classes/Foo.uc", "class Foo extends Bar;\n");
        let expected = content_hash("class Foo extends Bar;\n", HashAlgorithm::Md5);

        let builder = MergeBuilder::new(DefinitionSet::new()).with_vanilla(tree.root.join("Source"));
        let check = |expected: &str, algorithm| HashCheck {
            class: "DeusEx.Foo".to_string(),
            expected: expected.to_string(),
            algorithm,
        };

        builder
            .clone()
            .with_hash_checks(vec![check(&expected.to_uppercase(), HashAlgorithm::Md5)])
            .build()
            .unwrap();

        let sha256 = content_hash("class Foo extends Bar;\n", HashAlgorithm::Sha256);
        builder
            .clone()
            .with_hash_checks(vec![check(&sha256, HashAlgorithm::Sha256)])
            .build()
            .unwrap();

        // an MD5 check does not accept a SHA-256 digest
        let err = builder
            .clone()
            .with_hash_checks(vec![check(&sha256, HashAlgorithm::Md5)])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::HashMismatch { ref actual, .. } if *actual == expected));

        let err = builder
            .with_hash_checks(vec![HashCheck {
                class: "DeusEx.Missing".to_string(),
                expected,
                algorithm: HashAlgorithm::Md5,
            }])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingHashTarget(class) if class == "DeusEx.Missing"));
    }

    #[test]
    fn test_min_files() {
        let tree = Tree::new();
        tree.write("Source/DeusEx/Classes/Foo.uc", "class Foo extends Bar;\n")
            .write("Mod/DeusEx/Classes/Foo.uc", "class Foo extends Bar;\n");

        let err = MergeBuilder::new(DefinitionSet::new())
            .with_vanilla(tree.root.join("Source"))
            .with_min_files(Some(2), None)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TooFewFiles { found: 1, minimum: 2, .. }
        ));

        let err = MergeBuilder::new(DefinitionSet::new())
            .with_vanilla(tree.root.join("Source"))
            .with_mod(tree.root.join("Mod"))
            .with_min_files(Some(1), Some(5))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::TooFewFiles { ref layer, .. } if layer == "Mod"));
    }

    #[test]
    fn test_authoring_error_aborts() {
        let tree = Tree::new();
        tree.write("Mod/DeusEx/Classes/A.uc", "class A extends B;\n")
            .write("Mod/DeusEx/Classes/Broken.uc", "#ifdef x\n#else\n#else\n#endif\nclass Broken;\n");

        let err = MergeBuilder::new(DefinitionSet::new())
            .with_mod(tree.root.join("Mod"))
            .build()
            .unwrap_err();
        let Error::Preprocess { path, .. } = err else {
            panic!("expected a preprocess error, got {err:?}");
        };
        assert!(path.as_str().ends_with("Broken.uc"));
    }

    #[test]
    fn test_missing_layer_is_io_error() {
        let tree = Tree::new();
        let err = MergeBuilder::new(DefinitionSet::new())
            .with_vanilla(tree.root.join("Nope"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
