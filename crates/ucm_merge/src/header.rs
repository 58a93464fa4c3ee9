//! Class declaration header parsing and rewriting.
//!
//! Only the single `class ... ;` declaration of a script is understood. The
//! rest of the file is opaque text, and rewrites operate on the verbatim
//! header text so line and column positions elsewhere stay put.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//.*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static CLASS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bclass\s+.+?;").unwrap());
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)class\s+(?P<classname>[^\s;]+)(?:\s+(?:[\s\S]*?\s+)??(?P<operator>injects|extends|expands|overwrites|merges|shims)\s+(?P<baseclass>[^\s;]+))?",
    )
    .unwrap()
});
/// `class Name word Base;` where `word` is not a known operator or modifier.
static SUSPECT_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^class\s+[^\s;]+\s+(?P<word>[A-Za-z_]\w*)\s+[A-Za-z_][\w.]*\s*;$").unwrap()
});

/// Class modifiers that may legitimately follow the class name.
const MODIFIERS: &[&str] = &[
    "abstract",
    "native",
    "nativereplication",
    "transient",
    "noexport",
    "intrinsic",
    "safereplace",
    "perobjectconfig",
    "editinlinenew",
    "noteditinlinenew",
    "collapsecategories",
    "dontcollapsecategories",
    "placeable",
    "notplaceable",
    "hidedropdown",
    "exportstructs",
    "cacheexempt",
    "within",
    "config",
    "localized",
    "showcategories",
    "hidecategories",
    "nousercreate",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("could not find a class declaration (class ... ;)")]
    MissingClassDeclaration,

    #[error("could not read the class name from: {header}")]
    MissingClassName { header: String },

    #[error("unrecognized inheritance operator: {0}")]
    UnknownOperator(String),
}

/// How a class relates to its base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InheritanceOperator {
    Extends,
    Expands,
    Injects,
    Overwrites,
    Merges,
    Shims,
}

impl InheritanceOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extends => "extends",
            Self::Expands => "expands",
            Self::Injects => "injects",
            Self::Overwrites => "overwrites",
            Self::Merges => "merges",
            Self::Shims => "shims",
        }
    }

    /// `extends` and `expands` are ordinary single inheritance.
    pub fn is_vanilla(self) -> bool {
        matches!(self, Self::Extends | Self::Expands)
    }
}

impl fmt::Display for InheritanceOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InheritanceOperator {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "extends" => Self::Extends,
            "expands" => Self::Expands,
            "injects" => Self::Injects,
            "overwrites" => Self::Overwrites,
            "merges" => Self::Merges,
            "shims" => Self::Shims,
            _ => return Err(HeaderError::UnknownOperator(s.to_string())),
        })
    }
}

/// No operator (a root class) counts as vanilla.
pub fn is_vanilla_operator(operator: Option<InheritanceOperator>) -> bool {
    operator.map_or(true, InheritanceOperator::is_vanilla)
}

/// A parsed class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    /// The declaration text, from `class` through `;`.
    pub text: String,
    pub classname: String,
    pub operator: Option<InheritanceOperator>,
    pub baseclass: Option<String>,
}

impl fmt::Display for ClassHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Blank out `//` and `/* */` comments. Only used to locate the header.
pub fn strip_comments(text: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(text, " ");
    BLOCK_COMMENT.replace_all(&without_lines, " ").into_owned()
}

/// Find and parse the class declaration of `text`.
pub fn parse_header(text: &str) -> Result<ClassHeader, HeaderError> {
    let stripped = strip_comments(text);
    let header = CLASS_HEADER
        .find(&stripped)
        .ok_or(HeaderError::MissingClassDeclaration)?
        .as_str();

    let caps = DECLARATION
        .captures(header)
        .ok_or_else(|| HeaderError::MissingClassName {
            header: header.to_string(),
        })?;

    let operator = caps
        .name("operator")
        .map(|m| m.as_str().parse::<InheritanceOperator>())
        .transpose()?;

    if operator.is_none() {
        if let Some(suspect) = SUSPECT_OPERATOR.captures(header) {
            let word = &suspect["word"];
            if !MODIFIERS.iter().any(|m| m.eq_ignore_ascii_case(word)) {
                return Err(HeaderError::UnknownOperator(word.to_string()));
            }
        }
    }

    Ok(ClassHeader {
        text: header.to_string(),
        classname: caps["classname"].to_string(),
        operator,
        baseclass: caps.name("baseclass").map(|m| m.as_str().to_string()),
    })
}

/// Rewrite the operator of `header` to `operator`, prefixing the declaration
/// with `prefix`.
///
/// Modifiers between the class name and the operator are kept. Returns `None`
/// when the header has no operator or the declaration no longer matches.
pub fn rewrite_operator(
    header: &ClassHeader,
    operator: InheritanceOperator,
    prefix: &str,
) -> Option<String> {
    rewrite_declaration(&header.text, header, operator, prefix)
}

/// Like [`rewrite_operator`], but searches `text` for the first declaration
/// of `header`. Comments between the class name and the operator are allowed.
pub fn rewrite_declaration(
    text: &str,
    header: &ClassHeader,
    operator: InheritanceOperator,
    prefix: &str,
) -> Option<String> {
    let old_operator = header.operator?;
    let baseclass = header.baseclass.as_deref()?;

    let pattern = Regex::new(&format!(
        r"(?i)\bclass\s+{}\s+(?:[^;]*?\s+)??(?P<operator>{})\s+{}(?:[\s;]|$)",
        regex::escape(&header.classname),
        old_operator.as_str(),
        regex::escape(baseclass),
    ))
    .ok()?;
    let caps = pattern.captures(text)?;
    let declaration = caps.get(0)?;
    let old = caps.name("operator")?;

    let mut rewritten = String::with_capacity(text.len() + prefix.len());
    rewritten.push_str(&text[..declaration.start()]);
    rewritten.push_str(prefix);
    rewritten.push_str(&text[declaration.start()..old.start()]);
    rewritten.push_str(operator.as_str());
    rewritten.push_str(&text[old.end()..]);
    Some(rewritten)
}
