//! Parsing of category-enable requests.
//!
//! Agents send categories in whatever shape they like: a single name, an
//! enum-style value, a comma-joined string, a JSON array, or a string that
//! contains a JSON array. Everything is flattened into raw candidates here;
//! resolution against the catalog happens in [`super::CapabilityCatalog`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_\-]+").expect("separator regex is valid");
}

const ENUM_PREFIX: &str = "mcptoolscategory.";

/// Raw category request as received in tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CategoryRequest {
    Many(Vec<String>),
    One(String),
}

/// Outcome of resolving a [`CategoryRequest`] against the catalog.
///
/// `resolved` holds canonical category names in request order, without
/// duplicates. `unknown` holds the cleaned-up names that matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySelection {
    pub resolved: Vec<String>,
    pub unknown: Vec<String>,
}

impl CategorySelection {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.unknown.is_empty()
    }
}

impl CategoryRequest {
    /// Flattens the request into individual candidate names.
    pub fn candidates(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            CategoryRequest::Many(items) => items.iter().map(String::as_str).collect(),
            CategoryRequest::One(item) => vec![item.as_str()],
        };

        raw.into_iter()
            .flat_map(expand_candidate)
            .map(|c| clean_candidate(&c))
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn expand_candidate(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
            return items;
        }
        // Python-style lists such as "['sites', 'orgs']" are not valid JSON.
        let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
        return inner.split(',').map(str::to_string).collect();
    }
    trimmed.split(',').map(str::to_string).collect()
}

fn clean_candidate(raw: &str) -> String {
    let unquoted = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    match unquoted.get(..ENUM_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(ENUM_PREFIX) => {
            unquoted[ENUM_PREFIX.len()..].to_string()
        }
        _ => unquoted.to_string(),
    }
}

/// Lookup key used to compare category names: lowercase, separators removed.
pub fn normalize_key(name: &str) -> String {
    SEPARATORS.replace_all(&name.to_lowercase(), "").into_owned()
}
