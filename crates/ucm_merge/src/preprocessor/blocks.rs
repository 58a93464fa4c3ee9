//! `#ifdef` / `#ifndef` block resolution.
//!
//! Directives are recognized only at the start of a line (leading spaces and
//! tabs allowed). Outside a block, lines starting with other `#` keywords such
//! as `#exec` are ordinary script text. Inside a block every `#keyword` line
//! must be a block directive.

use super::{
    count_newlines, DirectiveError, COMMENT_PREFIX, MAX_BLOCK_LINES, MAX_ELSE_IFS,
};
use crate::condition::Condition;
use crate::definitions::DefinitionSet;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    IfDef,
    IfNDef,
    ElseIf,
    ElseIfN,
    Else,
    EndIf,
}

impl DirectiveKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "#ifdef" => Self::IfDef,
            "#ifndef" => Self::IfNDef,
            "#elseif" => Self::ElseIf,
            "#elseifn" => Self::ElseIfN,
            "#else" => Self::Else,
            "#endif" => Self::EndIf,
            _ => return None,
        })
    }

    pub fn is_opening(self) -> bool {
        matches!(self, Self::IfDef | Self::IfNDef)
    }

    pub fn is_negated(self) -> bool {
        matches!(self, Self::IfNDef | Self::ElseIfN)
    }
}

/// One alternative of a block: its directive line and the body lines after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub kind: DirectiveKind,
    pub condition: Option<String>,
    /// 0-based line index of the directive.
    pub directive_line: usize,
    /// 0-based line indices of the body.
    pub body: Range<usize>,
}

impl Branch {
    /// Whether this branch is taken, assuming no earlier branch was.
    pub fn is_taken(&self, definitions: &DefinitionSet) -> Result<bool, DirectiveError> {
        if self.kind == DirectiveKind::Else {
            return Ok(true);
        }

        let condition = Condition::parse(self.condition.as_deref().unwrap_or(""))
            .map_err(|source| DirectiveError::Condition {
                line: self.directive_line + 1,
                source,
            })?;
        Ok(condition.evaluate(definitions, false) != self.kind.is_negated())
    }
}

/// A validated `#ifdef`/`#ifndef` ... `#endif` span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveBlock {
    /// 0-based line index of the opening directive.
    pub start_line: usize,
    /// 0-based line index of the `#endif`.
    pub end_line: usize,
    pub branches: Vec<Branch>,
}

impl DirectiveBlock {
    /// Index into `branches` of the first taken branch, if any.
    ///
    /// Every condition is parsed, so malformed conditions in branches after
    /// the taken one are still reported.
    pub fn select(&self, definitions: &DefinitionSet) -> Result<Option<usize>, DirectiveError> {
        let mut selected = None;
        for (idx, branch) in self.branches.iter().enumerate() {
            let taken = branch.is_taken(definitions)?;
            if taken && selected.is_none() {
                selected = Some(idx);
            }
        }
        Ok(selected)
    }

    fn validate(&self) -> Result<(), DirectiveError> {
        let line = self.start_line + 1;

        let lines = self.end_line - self.start_line;
        if lines > MAX_BLOCK_LINES {
            return Err(DirectiveError::BlockTooLong { line, lines });
        }

        let count = |pred: fn(DirectiveKind) -> bool| {
            self.branches.iter().filter(|b| pred(b.kind)).count()
        };

        let openings = count(DirectiveKind::is_opening);
        if openings != 1 {
            return Err(DirectiveError::OpeningCount {
                line,
                count: openings,
            });
        }

        let else_ifs = count(|k| matches!(k, DirectiveKind::ElseIf | DirectiveKind::ElseIfN));
        if else_ifs > MAX_ELSE_IFS {
            return Err(DirectiveError::TooManyElseIfs {
                line,
                count: else_ifs,
            });
        }

        let elses = count(|k| k == DirectiveKind::Else);
        if elses > 1 {
            return Err(DirectiveError::TooManyElses { line, count: elses });
        }

        Ok(())
    }
}

/// A `#keyword` at the start of a line, with the rest of the line as its argument.
fn directive_of(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let rest = trimmed.strip_prefix('#')?;
    let word_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if word_len == 0 {
        return None;
    }

    let keyword = &trimmed[..word_len + 1];
    Some((keyword, rest[word_len..].trim()))
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

/// Locate and validate every block in `text`.
pub fn parse_blocks(text: &str) -> Result<Vec<DirectiveBlock>, DirectiveError> {
    let lines = split_lines(text);
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let Some((keyword, _)) = directive_of(strip_newline(lines[idx])) else {
            idx += 1;
            continue;
        };

        match DirectiveKind::from_keyword(keyword) {
            Some(kind) if kind.is_opening() => {
                let block = parse_block(&lines, idx)?;
                idx = block.end_line + 1;
                blocks.push(block);
            }
            Some(_) => {
                return Err(DirectiveError::StrayDirective {
                    line: idx + 1,
                    keyword: keyword.to_string(),
                });
            }
            None => idx += 1,
        }
    }

    Ok(blocks)
}

fn parse_block(lines: &[&str], start: usize) -> Result<DirectiveBlock, DirectiveError> {
    let mut branches: Vec<Branch> = Vec::new();

    for (idx, raw) in lines.iter().enumerate().skip(start) {
        let Some((keyword, argument)) = directive_of(strip_newline(raw)) else {
            continue;
        };
        let kind = DirectiveKind::from_keyword(keyword).ok_or_else(|| {
            DirectiveError::UnknownDirective {
                line: idx + 1,
                keyword: keyword.to_string(),
            }
        })?;

        if let Some(open) = branches.last_mut() {
            open.body = open.directive_line + 1..idx;
        }

        if kind == DirectiveKind::EndIf {
            let block = DirectiveBlock {
                start_line: start,
                end_line: idx,
                branches,
            };
            block.validate()?;
            return Ok(block);
        }

        let condition = match kind {
            DirectiveKind::Else => None,
            _ => Some(argument.to_string()),
        };
        branches.push(Branch {
            kind,
            condition,
            directive_line: idx,
            body: idx + 1..idx + 1,
        });
    }

    Err(DirectiveError::Unterminated { line: start + 1 })
}

fn push_commented(out: &mut String, line: &str) {
    out.push_str(COMMENT_PREFIX);
    out.push_str(line);
}

/// Resolve every block in `text`, keeping the newline count unchanged.
///
/// The selected branch's body is emitted verbatim. Every other line of the
/// block, including all directive lines, is prefixed with `//`. A block with
/// no taken branch is commented out entirely.
pub fn resolve_blocks(text: &str, definitions: &DefinitionSet) -> Result<String, DirectiveError> {
    let blocks = parse_blocks(text)?;
    if blocks.is_empty() {
        return Ok(text.to_string());
    }

    let lines = split_lines(text);
    let mut out = String::with_capacity(text.len() + blocks.len() * 16);
    let mut next = 0;

    for block in &blocks {
        for line in &lines[next..block.start_line] {
            out.push_str(line);
        }

        let selected = block.select(definitions)?.map(|idx| &block.branches[idx]);
        for (idx, line) in lines
            .iter()
            .enumerate()
            .take(block.end_line + 1)
            .skip(block.start_line)
        {
            match selected {
                Some(branch) if branch.body.contains(&idx) => out.push_str(line),
                _ => push_commented(&mut out, line),
            }
        }

        next = block.end_line + 1;
    }

    for line in &lines[next..] {
        out.push_str(line);
    }

    debug_assert_eq!(count_newlines(text), count_newlines(&out));
    Ok(out)
}
