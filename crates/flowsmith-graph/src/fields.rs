//! Field parsers
//!
//! Specialized parsers for the loosely-formatted sheet columns: parameter
//! sets, chip lists, multi-target transitions, and trigger descriptors.
//! All of them are pure functions over a single cell value; the compiler
//! decides what to do with the results.
//!
//! Sheets are inconsistent about delimiters, so each parser accepts every
//! convention seen in the wild and resolves them in a fixed preference
//! order rather than rejecting the cell.

use std::collections::BTreeMap;

use crate::cell;

/// Remove one layer of wrapping quotes from a string, collapsing doubled
/// quote escapes (`""` -> `"`) first.
pub fn strip_wrapping_quotes(s: &str) -> String {
    let s = s.trim().replace("\"\"", "\"");
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s
    }
}

/// Parse a comma-separated `key=value` list into a key-value mapping.
///
/// A token without `=` becomes a key mapped to the empty string. Repeated
/// keys overwrite, so the last occurrence wins. Empty or absent input
/// yields an empty mapping, never an error.
pub fn parse_params(raw: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => {
                params.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                params.insert(pair.to_string(), String::new());
            }
        }
    }
    params
}

/// Parse suggested chips from a cell.
///
/// Chips are one per line when the sheet preserves line breaks, falling
/// back to semicolon separation, falling back to the whole cell as a
/// single chip. Each candidate is trimmed, unquoted, and dropped if it
/// reduces to an empty indicator. Duplicates are removed with
/// first-occurrence order kept.
pub fn parse_chips(raw: &str) -> Vec<String> {
    let candidates: Vec<&str> = if raw.contains('\n') {
        raw.split('\n').collect()
    } else if raw.contains(';') {
        raw.split(';').collect()
    } else {
        vec![raw]
    };

    let mut chips = Vec::new();
    for candidate in candidates {
        let unquoted = strip_wrapping_quotes(candidate);
        if let Some(chip) = cell::normalize(&unquoted) {
            if !chips.contains(&chip) {
                chips.push(chip);
            }
        }
    }
    chips
}

/// A chip-count/target-count mismatch resolved by the padding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityMismatch {
    /// Number of transition targets found in the cell
    pub targets: usize,
    /// Number of chips the targets had to cover
    pub chips: usize,
}

/// Per-chip transition targets resolved from a next-page cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    /// One entry per chip; `None` marks a terminating branch
    pub targets: Vec<Option<String>>,
    /// Present when the cell's target count disagreed with the chip count
    pub mismatch: Option<CardinalityMismatch>,
}

impl ResolvedTargets {
    fn terminal(count: usize) -> Self {
        Self {
            targets: vec![None; count],
            mismatch: None,
        }
    }
}

/// Resolve the next-page cell into per-chip transition targets.
///
/// An absent cell terminates every chip. Newline-separated values are
/// preferred, then slash-separated (unless the value starts with an HTTP
/// scheme and is really a URL), otherwise the whole cell is a single
/// target. A single target is broadcast to all chips; equal counts pair
/// positionally; any other mismatch pads the shorter list by repeating
/// its last element and truncates to the chip count, reporting the
/// mismatch as recoverable rather than failing the row.
pub fn parse_next_pages(cell: Option<&str>, chip_count: usize) -> ResolvedTargets {
    let count = chip_count.max(1);
    let Some(raw) = cell else {
        return ResolvedTargets::terminal(count);
    };
    let Some(value) = cell::normalize(raw) else {
        return ResolvedTargets::terminal(count);
    };

    let segments: Vec<&str> = if value.contains('\n') {
        value
            .split('\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    } else if value.contains('/') && !value.starts_with("http") {
        value
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        // Single target applied to every chip.
        return ResolvedTargets {
            targets: vec![Some(value); count],
            mismatch: None,
        };
    };

    let mut targets: Vec<Option<String>> =
        segments.iter().map(|s| cell::normalize(s)).collect();

    if targets.len() == 1 {
        let only = targets.remove(0);
        return ResolvedTargets {
            targets: vec![only; count],
            mismatch: None,
        };
    }
    if targets.len() == count {
        return ResolvedTargets {
            targets,
            mismatch: None,
        };
    }

    let mismatch = CardinalityMismatch {
        targets: targets.len(),
        chips: count,
    };
    while targets.len() < count {
        let pad = targets.last().cloned().unwrap_or(None);
        targets.push(pad);
    }
    targets.truncate(count);
    ResolvedTargets {
        targets,
        mismatch: Some(mismatch),
    }
}

/// Lead-in phrases scrubbed from user examples.
const EXAMPLE_LEAD_INS: &[&str] = &[
    "User says ",
    "User responds with ",
    "User denies ",
    "User accepts ",
];

/// Trigger kind used when the cell carries no explicit type.
pub const DEFAULT_TRIGGER_KIND: &str = "Intent";

/// A trigger descriptor split into its type and user example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Trigger type, e.g. `Intent` or `Event`
    pub kind: String,
    /// Example user utterance, unquoted and scrubbed of lead-in phrases
    pub example: String,
}

/// Parse a `Type: example` trigger descriptor.
///
/// Splits on the first colon; without one the whole cell is the example
/// and the kind defaults to [`DEFAULT_TRIGGER_KIND`].
pub fn parse_trigger(raw: &str) -> Trigger {
    match raw.split_once(':') {
        Some((kind, example)) => {
            let mut example = example.trim().to_string();
            for lead_in in EXAMPLE_LEAD_INS {
                example = example.replace(lead_in, "");
            }
            Trigger {
                kind: kind.trim().to_string(),
                example: strip_wrapping_quotes(&example),
            }
        }
        None => Trigger {
            kind: DEFAULT_TRIGGER_KIND.to_string(),
            example: strip_wrapping_quotes(raw),
        },
    }
}
