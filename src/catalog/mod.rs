//! Capability catalog.
//!
//! Static mapping from category name to the operations it groups, plus the
//! set of essential operations every session can always call. Built once at
//! startup and shared read-only afterwards.

mod builtin;
mod selection;

pub use builtin::ESSENTIAL_TOOLS;
pub use selection::{normalize_key, CategoryRequest, CategorySelection};

use crate::error::GatewayError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryEntry {
    pub name: String,
    pub description: Option<String>,
    pub tools: Vec<String>,
}

/// On-disk shape of one category in a catalog file.
#[derive(Debug, Deserialize)]
struct CategoryFileEntry {
    #[serde(default)]
    description: Option<String>,
    tools: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CapabilityCatalog {
    categories: BTreeMap<String, CategoryEntry>,
    essential_tools: BTreeSet<String>,
    /// Normalized lookup key -> canonical category name.
    lookup: HashMap<String, String>,
    /// Tool name -> first category that lists it.
    tool_categories: HashMap<String, String>,
}

impl CapabilityCatalog {
    pub fn builtin() -> Self {
        Self::from_entries(builtin::BUILTIN_CATEGORIES.iter().map(|c| CategoryEntry {
            name: c.name.to_string(),
            description: Some(c.description.to_string()),
            tools: c.tools.iter().map(|t| t.to_string()).collect(),
        }))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CategoryEntry>) -> Self {
        let mut categories = BTreeMap::new();
        let mut lookup = HashMap::new();
        let mut tool_categories = HashMap::new();

        for entry in entries {
            lookup.insert(normalize_key(&entry.name), entry.name.clone());
            for tool in &entry.tools {
                tool_categories
                    .entry(tool.clone())
                    .or_insert_with(|| entry.name.clone());
            }
            categories.insert(entry.name.clone(), entry);
        }

        Self {
            categories,
            essential_tools: ESSENTIAL_TOOLS.iter().map(|t| t.to_string()).collect(),
            lookup,
            tool_categories,
        }
    }

    /// Loads a catalog from a JSON file shaped as
    /// `{"<category>": {"description": "...", "tools": ["..."]}}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
        let parsed: BTreeMap<String, CategoryFileEntry> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {:?}", path))?;
        if parsed.is_empty() {
            bail!("Catalog file {:?} does not define any category", path);
        }

        Ok(Self::from_entries(parsed.into_iter().map(|(name, entry)| {
            CategoryEntry {
                name,
                description: entry.description,
                tools: entry.tools,
            }
        })))
    }

    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.categories.values()
    }

    pub fn tools_for(&self, category: &str) -> Result<&[String], GatewayError> {
        self.categories
            .get(category)
            .map(|entry| entry.tools.as_slice())
            .ok_or_else(|| GatewayError::UnknownCategory(category.to_string()))
    }

    pub fn description(&self, category: &str) -> Option<&str> {
        self.categories
            .get(category)
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn essential_tools(&self) -> &BTreeSet<String> {
        &self.essential_tools
    }

    pub fn is_essential(&self, tool_name: &str) -> bool {
        self.essential_tools.contains(tool_name)
    }

    pub fn category_of(&self, tool_name: &str) -> Option<&str> {
        self.tool_categories.get(tool_name).map(String::as_str)
    }

    /// Every operation named by any category, essentials included.
    pub fn all_tools(&self) -> BTreeSet<&str> {
        self.categories
            .values()
            .flat_map(|entry| entry.tools.iter().map(String::as_str))
            .chain(self.essential_tools.iter().map(String::as_str))
            .collect()
    }

    /// Maps a free-form name to its canonical category, if any.
    pub fn resolve_category(&self, raw: &str) -> Option<&str> {
        self.lookup.get(&normalize_key(raw)).map(String::as_str)
    }

    pub fn parse_selection(&self, request: &CategoryRequest) -> CategorySelection {
        let mut selection = CategorySelection::default();
        for candidate in request.candidates() {
            match self.resolve_category(&candidate) {
                Some(category) => {
                    if !selection.resolved.iter().any(|c| c == category) {
                        selection.resolved.push(category.to_string());
                    }
                }
                None => selection.unknown.push(candidate),
            }
        }
        selection
    }
}
