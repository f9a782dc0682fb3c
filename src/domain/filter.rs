//! Allow/deny filtering of exposed tool names
//!
//! Entries are matched literally, or as a regular expression when wrapped in slashes
//! (`/^calculate_/`).

use regex::Regex;

#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Regex(Regex),
}

impl NamePattern {
    pub fn parse(raw: &str) -> Result<Option<Self>, regex::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if trimmed.len() >= 2 && trimmed.starts_with('/') && trimmed.ends_with('/') {
            let pattern = &trimmed[1..trimmed.len() - 1];
            return Regex::new(pattern).map(|regex| Some(Self::Regex(regex)));
        }

        Ok(Some(Self::Exact(trimmed.to_string())))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == name,
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionFilter {
    allowlist: Vec<NamePattern>,
    denylist: Vec<NamePattern>,
}

impl FunctionFilter {
    pub fn new(allowlist: Vec<NamePattern>, denylist: Vec<NamePattern>) -> Self {
        Self {
            allowlist,
            denylist,
        }
    }

    /// Parses comma separated pattern lists.
    pub fn from_lists(allowlist: &str, denylist: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(parse_list(allowlist)?, parse_list(denylist)?))
    }

    pub fn allows(&self, name: &str) -> bool {
        if !self.allowlist.is_empty() && !self.allowlist.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.denylist.iter().any(|p| p.matches(name))
    }
}

fn parse_list(raw: &str) -> Result<Vec<NamePattern>, regex::Error> {
    split_entries(raw)
        .into_iter()
        .map(NamePattern::parse)
        .filter_map(Result::transpose)
        .collect()
}

/// Splits on commas, except inside an entry that starts with `/` and has not yet been closed.
fn split_entries(raw: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut in_regex = false;

    for (index, ch) in raw.char_indices() {
        match ch {
            '/' if raw[start..index].trim().is_empty() => in_regex = true,
            '/' if in_regex => in_regex = false,
            ',' if !in_regex => {
                entries.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    entries.push(&raw[start..]);
    entries
}
