//! File-level inclusion gates.

use super::{DirectiveError, LineTracker, Preprocessed, COMMENT_PREFIX};
use crate::condition;
use crate::definitions::DefinitionSet;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static GATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(dontcompileif|compileif) (.+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileGate {
    /// `#compileif COND`: keep the file only when `COND` holds.
    CompileIf,
    /// `#dontcompileif COND`: drop the file when `COND` holds.
    DontCompileIf,
}

impl fmt::Display for FileGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileGate::CompileIf => f.write_str("#compileif"),
            FileGate::DontCompileIf => f.write_str("#dontcompileif"),
        }
    }
}

/// Why a file was excluded from the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    pub gate: FileGate,
    pub condition: String,
    /// Whether `condition` evaluated true.
    pub evaluated: bool,
    pub line: usize,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} is {} (line {})",
            self.gate, self.condition, self.evaluated, self.line
        )
    }
}

/// Evaluate every gate in `text`.
///
/// The first failing gate skips the file. Otherwise each gate token is
/// commented out where it stands so the line count does not change.
///
/// Gates follow the same `&&`/`||` semantics as block conditions. Older
/// builds of this tool skipped a file as soon as any operand name was
/// defined; fixtures relying on that should be re-checked.
pub fn apply_file_gates(
    text: &str,
    definitions: &DefinitionSet,
) -> Result<Preprocessed, DirectiveError> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    let mut lines = LineTracker::new(text);

    for caps in GATE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let line = lines.line_at(whole.start());
        let gate = match &caps[1] {
            "compileif" => FileGate::CompileIf,
            _ => FileGate::DontCompileIf,
        };
        let cond = caps[2].trim();

        let evaluated = condition::evaluate(cond, definitions, false)
            .map_err(|source| DirectiveError::Condition { line, source })?;

        let skip = match gate {
            FileGate::CompileIf => !evaluated,
            FileGate::DontCompileIf => evaluated,
        };
        if skip {
            return Ok(Preprocessed::Skipped(SkipReason {
                gate,
                condition: cond.to_string(),
                evaluated,
                line,
            }));
        }

        out.push_str(&text[last..whole.start()]);
        out.push_str(COMMENT_PREFIX);
        out.push(' ');
        out.push_str(whole.as_str());
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(Preprocessed::Text(out))
}
