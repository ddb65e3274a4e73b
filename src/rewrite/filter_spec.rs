//! Rewrite-filter spec tokenizing and validation.
//!
//! The filter spec arrives as one opaque string and is validated before any
//! repository work starts. Accepted directive shapes:
//!
//! - `--setup <cmd>`: one-time setup script.
//! - `--<phase>-filter <cmd>`: a filter for any phase name (`tree`, `index`,
//!   `msg`, `parent`, `commit`, `env`, ...).
//! - `--prune-empty`: no argument.
//!
//! `--tag-name-filter` is rejected in every form: tag naming belongs to the
//! core, which installs its own tag-name filter when driving the engine.
//!
//! Directive arguments are whole shell commands, so the tokenizer understands
//! single quotes, double quotes, and backslash escapes. Quoting is resolved
//! here; the resulting words are handed to the engine verbatim.

use std::fmt;

/// A validated, ordered list of rewrite-filter directives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    args: Vec<String>,
}

impl FilterSpec {
    /// Tokenizes and validates a raw filter-spec string.
    ///
    /// # Errors
    /// Fails on an empty spec, unbalanced quoting, `--tag-name-filter` in any
    /// form, a directive with a missing argument, or any unrecognized token.
    pub fn parse(raw: &str) -> Result<Self, FilterSpecError> {
        let words = split_words(raw)?;
        if words.is_empty() {
            return Err(FilterSpecError::Empty);
        }

        let mut iter = words.iter().peekable();
        while let Some(word) = iter.next() {
            if word == "--tag-name-filter" || word.starts_with("--tag-name-filter=") {
                return Err(FilterSpecError::TagNameFilter);
            }
            if word == "--prune-empty" {
                continue;
            }
            if word == "--setup" || is_phase_filter(word) {
                if iter.next().is_none() {
                    return Err(FilterSpecError::MissingArgument {
                        directive: word.clone(),
                    });
                }
                continue;
            }
            return Err(FilterSpecError::UnknownDirective {
                token: word.clone(),
            });
        }

        Ok(Self { args: words })
    }

    /// The validated tokens, in order, for the engine command line.
    #[must_use]
    pub fn engine_args(&self) -> &[String] {
        &self.args
    }
}

/// Returns true for `--<phase>-filter` with a non-empty phase name.
fn is_phase_filter(word: &str) -> bool {
    word.strip_prefix("--")
        .and_then(|rest| rest.strip_suffix("-filter"))
        .is_some_and(|phase| !phase.is_empty())
}

/// Splits a raw spec string into words with shell-like quoting rules.
///
/// Single quotes preserve everything literally; double quotes preserve
/// everything except `\"` and `\\` escapes; an unquoted backslash escapes
/// the next character.
fn split_words(raw: &str) -> Result<Vec<String>, FilterSpecError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(FilterSpecError::UnbalancedQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\')) => current.push(e),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(FilterSpecError::UnbalancedQuote),
                        },
                        Some(c) => current.push(c),
                        None => return Err(FilterSpecError::UnbalancedQuote),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(FilterSpecError::UnbalancedQuote),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// A rejected rewrite-filter spec.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterSpecError {
    /// The spec contained no directives.
    Empty,
    /// `--tag-name-filter` appeared (in any form).
    TagNameFilter,
    /// A directive that takes an argument appeared last.
    MissingArgument { directive: String },
    /// A token that matches no accepted directive shape.
    UnknownDirective { token: String },
    /// A quoted section was never closed.
    UnbalancedQuote,
}

impl fmt::Display for FilterSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "filter spec is empty"),
            Self::TagNameFilter => write!(
                f,
                "--tag-name-filter is not allowed: tag naming is managed internally"
            ),
            Self::MissingArgument { directive } => {
                write!(f, "directive {directive} is missing its argument")
            }
            Self::UnknownDirective { token } => {
                write!(f, "unrecognized filter directive: {token}")
            }
            Self::UnbalancedQuote => write!(f, "filter spec has unbalanced quoting"),
        }
    }
}

impl std::error::Error for FilterSpecError {}
