//! The run-wide merge index.
//!
//! A [`MergeIndex`] is built incrementally as layers are processed and holds
//! three views of the run:
//!
//! - **files**: merge key -> unit, last writer wins. Scripts are keyed by their
//!   qualified class id (`namespace.classname`), assets by
//!   `namespace/TypeDir/filename`.
//! - **injections**: `namespace.baseclass` -> every script that attaches to that
//!   class with a mod-layer operator, in processing order.
//! - **subclasses**: baseclass -> immediate subclass names, across every script
//!   ever recorded. Entries are never retracted, even when a later layer
//!   replaces the file that contributed them.

use crate::unit::{AncillaryUnit, MergeUnit, SourceUnit};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct MergeIndex {
    files: BTreeMap<String, MergeUnit>,
    injections: BTreeMap<String, Vec<Arc<SourceUnit>>>,
    subclasses: HashMap<String, Vec<String>>,
}

impl MergeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a script, replacing any earlier unit with the same qualified id.
    ///
    /// Returns the replaced unit, if any.
    pub fn record(&mut self, unit: SourceUnit) -> Option<MergeUnit> {
        let unit = Arc::new(unit);

        if let Some(target) = unit.injection_target() {
            tracing::debug!(
                "{} {} {}",
                unit.qualified_id(),
                unit.declared_operator().map(|op| op.as_str()).unwrap_or_default(),
                target
            );
            self.injections
                .entry(target)
                .or_default()
                .push(Arc::clone(&unit));
        }

        if let Some(base) = unit.baseclass() {
            self.subclasses
                .entry(base.to_string())
                .or_default()
                .push(unit.classname().to_string());
        }

        self.insert(MergeUnit::Script(unit))
    }

    /// Record an ancillary asset, replacing any earlier asset with the same key.
    pub fn record_asset(&mut self, unit: AncillaryUnit) -> Option<MergeUnit> {
        self.insert(MergeUnit::Asset(unit))
    }

    fn insert(&mut self, unit: MergeUnit) -> Option<MergeUnit> {
        let key = unit.key();
        let replaced = self.files.insert(key.clone(), unit);
        if let Some(previous) = &replaced {
            let current = self.files[&key].layer();
            tracing::debug!(
                "{} from '{}' (layer {}) replaces '{}' (layer {})",
                key,
                current,
                current.precedence(),
                previous.layer(),
                previous.layer().precedence()
            );
        }
        replaced
    }

    /// Every transitive subclass of `baseclass`, depth-first pre-order.
    ///
    /// Each name appears once. Cycles in the recorded edges are tolerated and
    /// `baseclass` itself is never part of the result.
    pub fn get_subclasses(&self, baseclass: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::from([baseclass]);
        let mut stack: Vec<&str> = self.children(baseclass).rev().collect();

        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            result.push(name.to_string());
            stack.extend(self.children(name).rev());
        }

        result
    }

    fn children<'a>(&'a self, name: &str) -> impl DoubleEndedIterator<Item = &'a str> {
        self.subclasses
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Immediate subclasses of `baseclass` in recording order, duplicates included.
    pub fn direct_subclasses(&self, baseclass: &str) -> &[String] {
        self.subclasses
            .get(baseclass)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&MergeUnit> {
        self.files.get(key)
    }

    pub fn script(&self, qualified_id: &str) -> Option<&SourceUnit> {
        self.files.get(qualified_id).and_then(MergeUnit::as_script)
    }

    pub fn files(&self) -> &BTreeMap<String, MergeUnit> {
        &self.files
    }

    /// Scripts injecting into `target` (`namespace.baseclass`), in processing order.
    pub fn injections_for(&self, target: &str) -> &[Arc<SourceUnit>] {
        self.injections
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn injections(&self) -> &BTreeMap<String, Vec<Arc<SourceUnit>>> {
        &self.injections
    }

    pub fn script_count(&self) -> usize {
        self.files
            .values()
            .filter(|unit| matches!(unit, MergeUnit::Script(_)))
            .count()
    }

    pub fn asset_count(&self) -> usize {
        self.files.len() - self.script_count()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Location;
    use crate::header::parse_header;
    use crate::unit::{AssetPayload, Layer};
    use camino::Utf8PathBuf;

    fn script(layer: Layer, namespace: &str, declaration: &str) -> SourceUnit {
        let header = parse_header(declaration).unwrap();
        let filename = format!("{}.uc", header.classname);
        SourceUnit::new(
            layer,
            Location {
                path: Utf8PathBuf::from(format!("/{namespace}/Classes/{filename}")),
                filename,
                namespace: namespace.to_string(),
                type_dir: "Classes".to_string(),
                parent: None,
            },
            declaration.to_string(),
            header,
        )
    }

    fn rando() -> Layer {
        Layer::Mod {
            name: "Rando".to_string(),
            order: 0,
        }
    }

    #[test]
    fn test_last_writer_wins() {
        let mut index = MergeIndex::new();
        assert!(index
            .record(script(Layer::Vanilla, "NS", "class Foo extends Bar;"))
            .is_none());

        let replaced = index.record(script(rando(), "NS", "class Foo extends Bar;"));
        assert_eq!(replaced.unwrap().layer(), &Layer::Vanilla);
        assert_eq!(index.script("NS.Foo").unwrap().layer, rando());
        assert_eq!(index.len(), 1);

        // subclass edges accumulate even for superseded files
        assert_eq!(index.direct_subclasses("Bar"), ["Foo", "Foo"]);
        assert_eq!(index.get_subclasses("Bar"), ["Foo"]);
    }

    #[test]
    fn test_injection_index() {
        let mut index = MergeIndex::new();
        index.record(script(Layer::Vanilla, "NS", "class Bar extends Object;"));
        index.record(script(rando(), "NS", "class Foo injects Bar;"));
        index.record(script(rando(), "NS", "class Baz merges Bar;"));
        index.record(script(rando(), "NS", "class Qux extends Bar;"));

        let names: Vec<&str> = index
            .injections_for("NS.Bar")
            .iter()
            .map(|unit| unit.classname())
            .collect();
        assert_eq!(names, ["Foo", "Baz"]);
        assert!(index.injections_for("NS.Object").is_empty());
        assert_eq!(index.injections().len(), 1);
    }

    #[test]
    fn test_demoted_unit_still_indexed_as_injection() {
        let mut unit = script(rando(), "NS", "class Foo injects Bar;");
        assert!(unit.demote_injection());

        let mut index = MergeIndex::new();
        index.record(unit);
        assert_eq!(index.injections_for("NS.Bar").len(), 1);
        assert!(index
            .script("NS.Foo")
            .unwrap()
            .content
            .ends_with("class Foo extends Bar;"));
    }

    #[test]
    fn test_subclass_traversal() {
        let mut index = MergeIndex::new();
        index.record(script(Layer::Vanilla, "NS", "class Foo extends Bar;"));
        index.record(script(Layer::Vanilla, "NS", "class Baz extends Foo;"));

        assert_eq!(index.get_subclasses("Bar"), ["Foo", "Baz"]);
        assert!(index.get_subclasses("Unknown").is_empty());
    }

    #[test]
    fn test_subclass_traversal_is_preorder() {
        let mut index = MergeIndex::new();
        for declaration in [
            "class A extends Root;",
            "class B extends Root;",
            "class A1 extends A;",
            "class B1 extends B;",
            "class A2 extends A;",
            "class A1x extends A1;",
        ] {
            index.record(script(Layer::Vanilla, "NS", declaration));
        }

        assert_eq!(
            index.get_subclasses("Root"),
            ["A", "A1", "A1x", "A2", "B", "B1"]
        );
    }

    #[test]
    fn test_subclass_cycle_terminates() {
        let mut index = MergeIndex::new();
        index.record(script(Layer::Vanilla, "NS", "class A extends B;"));
        index.record(script(rando(), "NS", "class B extends A;"));

        assert_eq!(index.get_subclasses("A"), ["B"]);
        assert_eq!(index.get_subclasses("B"), ["A"]);
    }

    #[test]
    fn test_root_class_has_no_edge() {
        let mut index = MergeIndex::new();
        index.record(script(Layer::Vanilla, "Core", "class Object;"));
        assert_eq!(index.script_count(), 1);
        assert!(index.direct_subclasses("Object").is_empty());
    }

    #[test]
    fn test_assets_share_the_file_map() {
        let mut index = MergeIndex::new();
        let asset = AncillaryUnit {
            layer: Layer::Vanilla,
            location: Location {
                path: Utf8PathBuf::from("/NS/Text/Credits.txt"),
                filename: "Credits.txt".to_string(),
                namespace: "NS".to_string(),
                type_dir: "Text".to_string(),
                parent: None,
            },
            payload: AssetPayload::Text("v1".to_string()),
        };
        index.record_asset(asset.clone());
        index.record_asset(AncillaryUnit {
            layer: rando(),
            payload: AssetPayload::Text("v2".to_string()),
            ..asset
        });

        assert_eq!(index.asset_count(), 1);
        assert_eq!(index.script_count(), 0);
        let Some(MergeUnit::Asset(unit)) = index.get("NS/Text/Credits.txt") else {
            panic!("expected an asset");
        };
        assert_eq!(unit.payload, AssetPayload::Text("v2".to_string()));
    }
}
