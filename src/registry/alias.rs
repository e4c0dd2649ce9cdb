//! Alias resolution
//!
//! Maps caller-supplied provider/model names onto canonical registry keys.
//! Names are compared after [`normalize_key`]: surrounding whitespace is
//! trimmed, ASCII letters are lowercased, and `_` or inner spaces become `-`.
//! An alias always targets a canonical key directly, so resolution is a single
//! lookup with no chains to follow.

use std::collections::{BTreeMap, HashMap};

use crate::error::AliasError;

pub fn normalize_key(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Immutable lookup table from normalized names to canonical keys
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    lookup: HashMap<String, String>,
    aliases: BTreeMap<String, Vec<String>>,
}

impl AliasIndex {
    /// Build the index, rejecting ambiguous names and aliases whose target is
    /// not one of `canonical`.
    pub fn build<'a>(
        canonical: impl IntoIterator<Item = &'a str>,
        aliases: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, AliasError> {
        let mut lookup: HashMap<String, String> = HashMap::new();
        for key in canonical {
            let normalized = normalize_key(key);
            if normalized.is_empty() {
                return Err(AliasError::Empty(key.to_string()));
            }
            if let Some(existing) = lookup.insert(normalized, key.to_string())
                && existing != key
            {
                return Err(AliasError::Ambiguous {
                    alias: key.to_string(),
                    first: existing,
                    second: key.to_string(),
                });
            }
        }
        let canonical_only = lookup.clone();

        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (alias, target) in aliases {
            let Some(canonical) = canonical_only.get(&normalize_key(target)) else {
                return Err(AliasError::UnknownTarget {
                    alias: alias.to_string(),
                    target: target.to_string(),
                });
            };
            let normalized = normalize_key(alias);
            if normalized.is_empty() {
                return Err(AliasError::Empty(alias.to_string()));
            }
            match lookup.get(&normalized) {
                Some(existing) if existing == canonical => {}
                Some(existing) => {
                    return Err(AliasError::Ambiguous {
                        alias: alias.to_string(),
                        first: existing.clone(),
                        second: canonical.clone(),
                    });
                }
                None => {
                    lookup.insert(normalized, canonical.clone());
                    index
                        .entry(canonical.clone())
                        .or_default()
                        .push(alias.to_string());
                }
            }
        }
        for names in index.values_mut() {
            names.sort();
        }

        Ok(Self {
            lookup,
            aliases: index,
        })
    }

    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.lookup.get(&normalize_key(input)).map(String::as_str)
    }

    /// Aliases pointing at `canonical`, sorted
    pub fn aliases_of(&self, canonical: &str) -> &[String] {
        self.aliases
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
