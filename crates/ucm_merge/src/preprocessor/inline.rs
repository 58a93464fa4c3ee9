//! Inline `#var`, `#defined`, `#bool` and `#switch` substitution.

use super::{DirectiveError, LineTracker};
use crate::condition;
use crate::definitions::DefinitionSet;
use regex::Regex;
use std::sync::LazyLock;

static INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(bool|defined|var|switch)\((.+?)\)").unwrap());

/// Text substituted for `#var(NAME)` when `NAME` is not defined.
pub const UNDEFINED_VAR: &str = "None";

/// Replace every inline macro in `text`.
///
/// Substituted values never contain a newline; any newline inside a flag
/// value is flattened to a space.
pub fn substitute(text: &str, definitions: &DefinitionSet) -> Result<String, DirectiveError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut lines = LineTracker::new(text);

    for caps in INLINE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let line = lines.line_at(whole.start());
        let argument = &caps[2];
        let condition_error = |source| DirectiveError::Condition { line, source };

        let replacement = match &caps[1] {
            "var" => definitions
                .get(argument.trim())
                .unwrap_or(UNDEFINED_VAR)
                .to_string(),
            "defined" => condition::evaluate(argument, definitions, false)
                .map_err(condition_error)?
                .to_string(),
            "bool" => condition::evaluate(argument, definitions, true)
                .map_err(condition_error)?
                .to_string(),
            _ => eval_switch(argument, definitions, line)?.to_string(),
        };

        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement.replace('\n', " "));
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// `#switch(COND1: R1, COND2: R2, else: R3)`.
///
/// Branches are tried left to right with strict evaluation. An argument with
/// no colon, or the condition `else`, always matches.
fn eval_switch<'a>(
    arguments: &'a str,
    definitions: &DefinitionSet,
    line: usize,
) -> Result<&'a str, DirectiveError> {
    for argument in arguments.split(',') {
        let (matched, result) = match argument.split_once(':') {
            Some((cond, result)) if cond.trim() == "else" => (true, result),
            Some((cond, result)) => (
                condition::evaluate(cond, definitions, true)
                    .map_err(|source| DirectiveError::Condition { line, source })?,
                result,
            ),
            None => (true, argument),
        };

        if matched {
            return Ok(result.trim());
        }
    }

    Err(DirectiveError::SwitchNoMatch {
        line,
        expression: arguments.to_string(),
    })
}
