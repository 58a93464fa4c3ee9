//! Flag expressions used by `#ifdef`, `#compileif`, `#defined`, `#bool` and `#switch`.
//!
//! A condition is a list of flag names joined uniformly by `&&` or by `||`.
//! Mixing both operators, or using parentheses, is rejected.

use crate::definitions::DefinitionSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("mixed && and || in preprocessor condition: {condition}")]
    MixedOperators { condition: String },

    #[error("parentheses are not supported in preprocessor conditions: {condition}")]
    Parenthesized { condition: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    All,
    Any,
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub combinator: Combinator,
    pub operands: Vec<String>,
}

impl Condition {
    pub fn parse(condition: &str) -> Result<Self, ConditionError> {
        if condition.contains(['(', ')']) {
            return Err(ConditionError::Parenthesized {
                condition: condition.to_string(),
            });
        }

        let has_and = condition.contains("&&");
        if has_and && condition.contains("||") {
            return Err(ConditionError::MixedOperators {
                condition: condition.to_string(),
            });
        }

        let (combinator, separator) = if has_and {
            (Combinator::All, "&&")
        } else {
            (Combinator::Any, "||")
        };

        Ok(Self {
            combinator,
            operands: condition
                .split(separator)
                .map(|operand| operand.trim().to_string())
                .collect(),
        })
    }

    /// Evaluate against `definitions`.
    ///
    /// With `strict` an operand must also be truthy, not merely defined.
    /// An empty `All` is true and an empty `Any` is false.
    pub fn evaluate(&self, definitions: &DefinitionSet, strict: bool) -> bool {
        let holds = |name: &String| {
            if strict {
                definitions.is_truthy(name)
            } else {
                definitions.is_defined(name)
            }
        };

        match self.combinator {
            Combinator::All => self.operands.iter().all(holds),
            Combinator::Any => self.operands.iter().any(holds),
        }
    }
}

/// Parse and evaluate `condition` in one step.
pub fn evaluate(
    condition: &str,
    definitions: &DefinitionSet,
    strict: bool,
) -> Result<bool, ConditionError> {
    let result = Condition::parse(condition)?.evaluate(definitions, strict);
    tracing::trace!("condition '{}' (strict={}) -> {}", condition, strict, result);
    Ok(result)
}
