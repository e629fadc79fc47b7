use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};

/// Name-prefix and modification-date filter for downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Empty matches every name.
    pub name_prefixes: Vec<String>,
    /// Inclusive lower bound on the entry's modification time.
    pub not_before: Option<NaiveDateTime>,
}

impl SelectionCriteria {
    pub fn new(name_prefixes: Vec<String>, not_before: Option<NaiveDateTime>) -> Self {
        let mut name_prefixes = name_prefixes;
        // set semantics: order is irrelevant, duplicates only cost comparisons
        name_prefixes.sort();
        name_prefixes.dedup();
        Self { name_prefixes, not_before }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name_prefixes.is_empty() || self.name_prefixes.iter().any(|p| name.starts_with(p))
    }

    /// Whether evaluating an entry needs its modification time.
    pub fn needs_modified_at(&self) -> bool {
        self.not_before.is_some()
    }

    pub fn matches_date(&self, modified_at: NaiveDateTime) -> bool {
        self.not_before.is_none_or(|nb| modified_at >= nb)
    }
}

/// Parse a `from-date` value. Empty means no date filter; a bare date means
/// midnight. Accepts `T` or a space between date and time, seconds optional.
pub fn parse_not_before(raw: &str) -> Result<Option<NaiveDateTime>> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Some(dt));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(dt) = d.and_hms_opt(0, 0, 0)
    {
        return Ok(Some(dt));
    }
    Err(anyhow!("invalid date '{}': expected YYYY-MM-DD[THH:MM[:SS]]", raw))
}
