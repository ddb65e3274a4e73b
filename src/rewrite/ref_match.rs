//! Ref-name whitelist/blacklist matching.
//!
//! A pattern entry is either a literal name (byte-for-byte equality) or,
//! with the `rx:` prefix, a regular expression anchored at both ends.
//! Blacklist entries take strict precedence over whitelist entries, and an
//! empty whitelist accepts every name that is not blacklisted.
//!
//! Empty or whitespace-only entries are dropped during parsing and never
//! match anything.

use std::fmt;

use regex::Regex;

/// Prefix distinguishing regex entries from literal names.
const RX_PREFIX: &str = "rx:";

/// A single whitelist/blacklist entry.
#[derive(Clone, Debug)]
pub enum RefPattern {
    /// Exact name match.
    Literal(String),
    /// Anchored regular expression (compiled as `^(?:...)$`).
    Regex(Box<Regex>),
}

impl RefPattern {
    /// Parses one raw entry. Returns `Ok(None)` for empty or
    /// whitespace-only entries, which are ignored per configuration rules.
    ///
    /// # Errors
    /// Fails if an `rx:` entry does not compile.
    pub fn parse(entry: &str) -> Result<Option<Self>, PatternError> {
        if entry.trim().is_empty() {
            return Ok(None);
        }
        if let Some(expr) = entry.strip_prefix(RX_PREFIX) {
            let anchored = format!("^(?:{expr})$");
            let regex = Regex::new(&anchored).map_err(|source| PatternError {
                entry: entry.to_string(),
                source,
            })?;
            return Ok(Some(Self::Regex(Box::new(regex))));
        }
        Ok(Some(Self::Literal(entry.to_string())))
    }

    /// Returns true if this entry matches `name`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == name,
            Self::Regex(re) => re.is_match(name),
        }
    }
}

/// Whitelist + blacklist pair for one ref type (branches or tags).
#[derive(Clone, Debug, Default)]
pub struct RefMatcher {
    whitelist: Vec<RefPattern>,
    blacklist: Vec<RefPattern>,
}

impl RefMatcher {
    #[must_use]
    pub fn new(whitelist: Vec<RefPattern>, blacklist: Vec<RefPattern>) -> Self {
        Self {
            whitelist,
            blacklist,
        }
    }

    /// Parses raw entries into a matcher, dropping empty entries.
    ///
    /// # Errors
    /// Fails if any `rx:` entry does not compile.
    pub fn from_entries(whitelist: &[String], blacklist: &[String]) -> Result<Self, PatternError> {
        Ok(Self::new(
            parse_entries(whitelist)?,
            parse_entries(blacklist)?,
        ))
    }

    /// Returns true when both lists are empty, i.e. every name passes.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.whitelist.is_empty() && self.blacklist.is_empty()
    }

    /// Decides whether `name` is in scope.
    ///
    /// Blacklist first: any blacklist hit rejects the name regardless of the
    /// whitelist. An empty whitelist then accepts; otherwise some whitelist
    /// entry must match.
    #[must_use]
    pub fn passes(&self, name: &str) -> bool {
        if self.blacklist.iter().any(|p| p.matches(name)) {
            return false;
        }
        if self.whitelist.is_empty() {
            return true;
        }
        self.whitelist.iter().any(|p| p.matches(name))
    }
}

fn parse_entries(entries: &[String]) -> Result<Vec<RefPattern>, PatternError> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(pattern) = RefPattern::parse(entry)? {
            out.push(pattern);
        }
    }
    Ok(out)
}

/// A pattern entry whose regex failed to compile.
#[derive(Debug)]
pub struct PatternError {
    pub entry: String,
    pub source: regex::Error,
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ref pattern {:?}: {}", self.entry, self.source)
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
