//! Line-preserving conditional preprocessor.
//!
//! Applied to one decoded script in three fixed passes:
//!
//! 1. **File gates** ([`gates`]) — `#compileif COND` / `#dontcompileif COND`
//!    anywhere in the text can exclude the whole file. Surviving gate tokens
//!    are commented out in place.
//! 2. **Inline substitution** ([`inline`]) — `#var(NAME)`, `#defined(COND)`,
//!    `#bool(COND)` and `#switch(COND: RESULT, ..., else: RESULT)`.
//! 3. **Block resolution** ([`blocks`]) — `#ifdef`/`#ifndef` ... `#endif`
//!    blocks keep the first true branch verbatim and comment out every other
//!    line of the block, directives included.
//!
//! No pass adds or removes a newline: the external compiler reports errors by
//! line number against the merged file, so those numbers must match the
//! author's source. Nested blocks are rejected.

pub mod blocks;
pub mod gates;
pub mod inline;

use crate::condition::ConditionError;
use crate::definitions::DefinitionSet;
use thiserror::Error;

pub use blocks::{resolve_blocks, Branch, DirectiveBlock, DirectiveKind};
pub use gates::{FileGate, SkipReason};

/// Prefix used to comment out a line.
pub const COMMENT_PREFIX: &str = "//";
/// Largest allowed directive block, counted in newlines between `#ifdef` and `#endif`.
pub const MAX_BLOCK_LINES: usize = 200;
pub const MAX_ELSE_IFS: usize = 20;

/// Authoring errors in directives. All of them abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("line {line}: {source}")]
    Condition {
        line: usize,
        #[source]
        source: ConditionError,
    },

    #[error("line {line}: unknown preprocessor directive {keyword}")]
    UnknownDirective { line: usize, keyword: String },

    #[error("line {line}: {keyword} outside of an #ifdef/#ifndef block")]
    StrayDirective { line: usize, keyword: String },

    #[error("line {line}: #ifdef/#ifndef block is never closed by #endif")]
    Unterminated { line: usize },

    #[error("line {line}: block has {count} #ifdef/#ifndef directives (nested blocks are not supported)")]
    OpeningCount { line: usize, count: usize },

    #[error("line {line}: block has {count} #elseif/#elseifn branches (max {max})", max = MAX_ELSE_IFS)]
    TooManyElseIfs { line: usize, count: usize },

    #[error("line {line}: block has {count} #else branches")]
    TooManyElses { line: usize, count: usize },

    #[error("line {line}: block is {lines} lines long (max {max})", max = MAX_BLOCK_LINES)]
    BlockTooLong { line: usize, lines: usize },

    #[error("line {line}: no #switch branch matched in #switch({expression})")]
    SwitchNoMatch { line: usize, expression: String },
}

/// Result of preprocessing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preprocessed {
    /// The processed text, with exactly as many newlines as the input.
    Text(String),
    /// A file gate excluded the file; it must not be written.
    Skipped(SkipReason),
}

impl Preprocessed {
    pub fn text(&self) -> Option<&str> {
        match self {
            Preprocessed::Text(text) => Some(text),
            Preprocessed::Skipped(_) => None,
        }
    }
}

/// Run all three passes over `text`.
pub fn preprocess(text: &str, definitions: &DefinitionSet) -> Result<Preprocessed, DirectiveError> {
    let gated = match gates::apply_file_gates(text, definitions)? {
        Preprocessed::Text(gated) => gated,
        skipped => return Ok(skipped),
    };
    let substituted = inline::substitute(&gated, definitions)?;
    let resolved = resolve_blocks(&substituted, definitions)?;

    debug_assert_eq!(count_newlines(text), count_newlines(&resolved));
    Ok(Preprocessed::Text(resolved))
}

pub fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Maps byte offsets of a single forward scan to 1-based line numbers,
/// counting each newline once.
pub(crate) struct LineTracker<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineTracker<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    /// Line of `offset`. Offsets are expected in increasing order; an
    /// earlier offset restarts the count from the top.
    pub(crate) fn line_at(&mut self, offset: usize) -> usize {
        if offset < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        self.line += count_newlines(&self.text[self.offset..offset]);
        self.offset = offset;
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn defs() -> DefinitionSet {
        DefinitionSet::new().with("F", "1").with("VER", "1.2")
    }

    #[test]
    fn test_line_tracker() {
        let text = "a\nb\n\nc";
        let mut lines = LineTracker::new(text);
        assert_eq!(lines.line_at(0), 1);
        assert_eq!(lines.line_at(2), 2);
        assert_eq!(lines.line_at(2), 2);
        assert_eq!(lines.line_at(5), 4);
        assert_eq!(lines.line_at(1), 1);
    }

    #[test]
    fn test_ifdef_else_selects_first_branch() {
        let input = "#ifdef F\nA\n#else\nB\n#endif\n";
        let output = preprocess(input, &defs()).unwrap();
        let text = output.text().unwrap();

        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(count_newlines(text), 5);
        assert_eq!(lines[1], "A");
        assert_eq!(text, "//#ifdef F\nA\n//#else\n//B\n//#endif\n");
    }

    #[test]
    fn test_ifdef_else_selects_else_branch() {
        let input = "#ifdef F\nA\n#else\nB\n#endif\n";
        let output = preprocess(input, &DefinitionSet::new()).unwrap();
        assert_eq!(
            output.text().unwrap(),
            "//#ifdef F\n//A\n//#else\nB\n//#endif\n"
        );
    }

    #[test]
    fn test_all_passes_together() {
        let input = "\
class Foo extends Bar;
#compileif F
var string Version; // #var(VER)
#ifndef F
var int Old;
#elseif VER
var int New; // #defined(F)
#endif
";
        let output = preprocess(input, &defs()).unwrap();
        assert_eq!(
            output.text().unwrap(),
            "\
class Foo extends Bar;
// #compileif F
var string Version; // 1.2
//#ifndef F
//var int Old;
//#elseif VER
var int New; // true
//#endif
"
        );
    }

    #[test]
    fn test_gate_short_circuits_other_errors() {
        let input = "#dontcompileif F\n#ifdef A && B || C\n#endif\n";
        let output = preprocess(input, &defs()).unwrap();
        assert!(matches!(output, Preprocessed::Skipped(_)));
    }

    proptest! {
        #[test]
        fn test_line_count_preserved(
            lines in proptest::collection::vec(
                prop_oneof![
                    Just("var int A;".to_string()),
                    Just("".to_string()),
                    Just("  // comment #var(VER)".to_string()),
                    Just("x = #bool(F || G);".to_string()),
                    Just("y = #switch(G: 1, F: 2, 3);".to_string()),
                    Just("#compileif F".to_string()),
                    "[a-z ;]{0,12}",
                ],
                0..12,
            ),
            branch in 0usize..3,
            flags in proptest::collection::vec(("[FGH]", "[01a]{0,1}"), 0..3),
            trailing_newline in any::<bool>(),
        ) {
            let mut text = lines.join("\n");
            // splice a well-formed block in the middle
            let block = match branch {
                0 => "#ifdef F\nA\n#endif",
                1 => "#ifndef G\nA\n#elseif H\nB\n#else\nC\n#endif",
                _ => "#ifdef G && H\n#elseifn F\nX\nY\n#endif",
            };
            text.push('\n');
            text.push_str(block);
            if trailing_newline {
                text.push('\n');
            }

            let definitions: DefinitionSet = flags.into_iter().collect();
            if let Preprocessed::Text(out) = preprocess(&text, &definitions).unwrap() {
                prop_assert_eq!(count_newlines(&out), count_newlines(&text));
            }
        }
    }
}
