//! Units of a merge: parsed scripts and ancillary assets.

use crate::classify::Location;
use crate::header::{
    is_vanilla_operator, rewrite_declaration, rewrite_operator, ClassHeader, InheritanceOperator,
};
use std::fmt;
use std::sync::Arc;

/// One source tree taking part in a merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The unmodified baseline, always processed first.
    Vanilla,
    /// A mod layer. `order` is its 0-based position among the mods.
    Mod { name: String, order: usize },
}

impl Layer {
    pub fn is_vanilla(&self) -> bool {
        matches!(self, Layer::Vanilla)
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Vanilla => "source",
            Layer::Mod { name, .. } => name,
        }
    }

    /// Position in the merge: 0 for vanilla, then 1.. for each mod.
    /// A unit from a higher layer replaces one from a lower layer.
    pub fn precedence(&self) -> usize {
        match self {
            Layer::Vanilla => 0,
            Layer::Mod { order, .. } => order + 1,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed, preprocessed script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub layer: Layer,
    pub location: Location,
    /// Preprocessed text, including any header rewrite.
    pub content: String,
    pub header: ClassHeader,
    /// The operator the author wrote, when the header was demoted to `extends`.
    pub demoted_from: Option<InheritanceOperator>,
}

impl SourceUnit {
    pub fn new(layer: Layer, location: Location, content: String, header: ClassHeader) -> Self {
        Self {
            layer,
            location,
            content,
            header,
            demoted_from: None,
        }
    }

    pub fn classname(&self) -> &str {
        &self.header.classname
    }

    pub fn namespace(&self) -> &str {
        &self.location.namespace
    }

    pub fn baseclass(&self) -> Option<&str> {
        self.header.baseclass.as_deref()
    }

    /// `namespace.classname`
    pub fn qualified_id(&self) -> String {
        format!("{}.{}", self.location.namespace, self.header.classname)
    }

    /// The operator as written in the source, before any demotion.
    pub fn declared_operator(&self) -> Option<InheritanceOperator> {
        self.demoted_from.or(self.header.operator)
    }

    /// `namespace.baseclass` when the declared operator is a mod-layer operator.
    pub fn injection_target(&self) -> Option<String> {
        if is_vanilla_operator(self.declared_operator()) {
            return None;
        }
        self.baseclass()
            .map(|base| format!("{}.{}", self.location.namespace, base))
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.location.namespace = namespace.into();
    }

    /// `// === was <layer>/<parent>/<file> class <name> ===`
    pub fn provenance_comment(&self) -> String {
        let mut comment = format!("// === was {}/", self.layer);
        if let Some(parent) = &self.location.parent {
            comment.push_str(parent);
            comment.push('/');
        }
        comment.push_str(&format!(
            "{} class {} ===\n",
            self.location.filename, self.header.classname
        ));
        comment
    }

    /// Rewrite an `injects` header to `extends`, for compilers that do not
    /// know the operator.
    ///
    /// Every verbatim occurrence of the header in the content is replaced. A
    /// header that only matches loosely (a comment inside the declaration) is
    /// rewritten in place instead. Returns whether the header was demoted; the
    /// unit is left untouched when the content could not be rewritten.
    pub fn demote_injection(&mut self) -> bool {
        if self.header.operator != Some(InheritanceOperator::Injects) {
            return false;
        }

        let comment = self.provenance_comment();
        let Some(new_header) =
            rewrite_operator(&self.header, InheritanceOperator::Extends, &comment)
        else {
            tracing::warn!(
                "{}: could not rewrite header '{}'",
                self.location.path,
                self.header.text
            );
            return false;
        };

        let content = if self.content.contains(&self.header.text) {
            self.content.replace(&self.header.text, &new_header)
        } else if let Some(content) = rewrite_declaration(
            &self.content,
            &self.header,
            InheritanceOperator::Extends,
            &comment,
        ) {
            tracing::debug!(
                "{}: header '{}' matched loosely",
                self.location.path,
                self.header.text
            );
            content
        } else {
            tracing::warn!(
                "{}: header '{}' not found in content, leaving injects in place",
                self.location.path,
                self.header.text
            );
            return false;
        };

        self.content = content;
        self.header.text = new_header;
        self.header.operator = Some(InheritanceOperator::Extends);
        self.demoted_from = Some(InheritanceOperator::Injects);
        tracing::debug!(
            "Demoted {} injects {} to extends",
            self.qualified_id(),
            self.baseclass().unwrap_or_default()
        );
        true
    }
}

/// Content of a non-script asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPayload {
    Text(String),
    Binary(Vec<u8>),
}

/// A non-script file carried through the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncillaryUnit {
    pub layer: Layer,
    pub location: Location,
    pub payload: AssetPayload,
}

impl AncillaryUnit {
    pub fn is_binary(&self) -> bool {
        matches!(self.payload, AssetPayload::Binary(_))
    }

    /// `namespace/TypeDir/filename`
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}",
            self.location.namespace, self.location.type_dir, self.location.filename
        )
    }
}

/// An entry of the merged file map.
#[derive(Debug, Clone)]
pub enum MergeUnit {
    Script(Arc<SourceUnit>),
    Asset(AncillaryUnit),
}

impl MergeUnit {
    /// Key in the merged file map. Later layers replace entries with the same key.
    pub fn key(&self) -> String {
        match self {
            MergeUnit::Script(unit) => unit.qualified_id(),
            MergeUnit::Asset(unit) => unit.key(),
        }
    }

    pub fn layer(&self) -> &Layer {
        match self {
            MergeUnit::Script(unit) => &unit.layer,
            MergeUnit::Asset(unit) => &unit.layer,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            MergeUnit::Script(unit) => &unit.location,
            MergeUnit::Asset(unit) => &unit.location,
        }
    }

    pub fn as_script(&self) -> Option<&SourceUnit> {
        match self {
            MergeUnit::Script(unit) => Some(unit),
            MergeUnit::Asset(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_header;
    use camino::Utf8PathBuf;

    fn location(parent: Option<&str>, filename: &str) -> Location {
        Location {
            path: Utf8PathBuf::from(format!("/mods/GMDX/DeusEx/Classes/{filename}")),
            filename: filename.to_string(),
            namespace: "DeusEx".to_string(),
            type_dir: "Classes".to_string(),
            parent: parent.map(str::to_string),
        }
    }

    fn unit(content: &str) -> SourceUnit {
        let header = parse_header(content).unwrap();
        SourceUnit::new(
            Layer::Mod {
                name: "GMDX".to_string(),
                order: 0,
            },
            location(Some("GMDX"), "Foo.uc"),
            content.to_string(),
            header,
        )
    }

    #[test]
    fn test_layer_display() {
        assert_eq!(Layer::Vanilla.to_string(), "source");
        let layer = Layer::Mod {
            name: "Rando".to_string(),
            order: 2,
        };
        assert_eq!(layer.to_string(), "Rando");
        assert!(!layer.is_vanilla());
        assert_eq!(layer.precedence(), 3);
        assert_eq!(Layer::Vanilla.precedence(), 0);
    }

    #[test]
    fn test_qualified_id_and_target() {
        let mut unit = unit("class Foo merges Bar;\n");
        assert_eq!(unit.qualified_id(), "DeusEx.Foo");
        assert_eq!(unit.injection_target().as_deref(), Some("DeusEx.Bar"));

        unit.set_namespace("GMDX");
        assert_eq!(unit.qualified_id(), "GMDX.Foo");

        let plain = self::unit("class Foo extends Bar;\n");
        assert_eq!(plain.injection_target(), None);
    }

    #[test]
    fn test_demote_injection() {
        let mut unit = unit("// header\nclass Foo injects Bar;\n\nvar int x;\n");
        assert!(unit.demote_injection());

        assert_eq!(
            unit.content,
            "// header\n// === was GMDX/GMDX/Foo.uc class Foo ===\nclass Foo extends Bar;\n\nvar int x;\n"
        );
        assert_eq!(unit.header.operator, Some(InheritanceOperator::Extends));
        assert_eq!(unit.declared_operator(), Some(InheritanceOperator::Injects));
        // the injection relationship survives demotion
        assert_eq!(unit.injection_target().as_deref(), Some("DeusEx.Bar"));

        // only injects is demoted
        let mut other = self::unit("class Foo shims Bar;\n");
        assert!(!other.demote_injection());
        assert_eq!(other.content, "class Foo shims Bar;\n");
    }

    #[test]
    fn test_demote_loose_header() {
        // a comment inside the declaration keeps it from matching verbatim
        let mut unit = unit("class Foo /* x */ injects Bar;\n");
        assert!(unit.demote_injection());
        assert_eq!(
            unit.content,
            "// === was GMDX/GMDX/Foo.uc class Foo ===\nclass Foo /* x */ extends Bar;\n"
        );
        assert!(unit.header.text.ends_with("extends Bar;"));
        assert_eq!(unit.header.operator, Some(InheritanceOperator::Extends));
    }

    #[test]
    fn test_demote_with_modifiers() {
        let mut unit = unit("class Foo native injects Bar;\n");
        assert!(unit.demote_injection());
        assert_eq!(
            unit.content,
            "// === was GMDX/GMDX/Foo.uc class Foo ===\nclass Foo native extends Bar;\n"
        );
        assert_eq!(
            unit.header.text,
            "// === was GMDX/GMDX/Foo.uc class Foo ===\nclass Foo native extends Bar;"
        );
        assert!(!unit.content.contains("injects"));

        let mut unit = self::unit("class Foo\n  injects Bar\n  config(Mod);\n\nvar int x;\n");
        assert!(unit.demote_injection());
        assert_eq!(
            unit.content,
            "// === was GMDX/GMDX/Foo.uc class Foo ===\nclass Foo\n  extends Bar\n  config(Mod);\n\nvar int x;\n"
        );
        assert!(!unit.header.text.contains("injects"));
        assert_eq!(unit.injection_target().as_deref(), Some("DeusEx.Bar"));
    }

    #[test]
    fn test_demote_refused_when_content_differs() {
        let mut unit = unit("class Foo injects Bar;\n");
        unit.content = "class Other extends Thing;\n".to_string();

        assert!(!unit.demote_injection());
        assert_eq!(unit.content, "class Other extends Thing;\n");
        assert_eq!(unit.header.text, "class Foo injects Bar;");
        assert_eq!(unit.header.operator, Some(InheritanceOperator::Injects));
        assert_eq!(unit.demoted_from, None);
    }

    #[test]
    fn test_provenance_without_parent() {
        let header = parse_header("class Foo injects Bar;").unwrap();
        let unit = SourceUnit::new(
            Layer::Vanilla,
            location(None, "Foo.uc"),
            String::new(),
            header,
        );
        assert_eq!(
            unit.provenance_comment(),
            "// === was source/Foo.uc class Foo ===\n"
        );
    }

    #[test]
    fn test_merge_unit_keys() {
        let script = MergeUnit::Script(Arc::new(unit("class Foo extends Bar;")));
        assert_eq!(script.key(), "DeusEx.Foo");

        let mut loc = location(None, "Credits.txt");
        loc.type_dir = "Text".to_string();
        let asset = MergeUnit::Asset(AncillaryUnit {
            layer: Layer::Vanilla,
            location: loc,
            payload: AssetPayload::Text("hi".to_string()),
        });
        assert_eq!(asset.key(), "DeusEx/Text/Credits.txt");
        assert!(asset.as_script().is_none());
    }
}
