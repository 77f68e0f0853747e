//! Search index for ranked name matching.
//!
//! This module provides an inverted n-gram index over normalized names so a
//! query only has to inspect candidates sharing its n-grams instead of
//! scanning every name. Matches are ranked exact, prefix, substring, then
//! all-tokens (every query word appears somewhere in the name).

use lineage_core::normalize::{normalize, tokens};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Minimum n-gram length for indexing.
const MIN_NGRAM_LEN: usize = 2;

/// Maximum n-gram length for indexing.
const MAX_NGRAM_LEN: usize = 4;

/// How a name matched a query, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    Substring,
    /// Every query token occurs in the name, in any order.
    AllTokens,
}

/// A single search match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit<K> {
    pub kind: MatchKind,
    pub key: K,
}

/// An inverted index from normalized names to keys.
///
/// Names are normalized on insert and queries are normalized on search, so
/// case and diacritics never affect matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndex<K: Eq + Hash> {
    /// Normalized name for each key.
    names: HashMap<K, String>,
    /// Maps normalized full names to keys for exact match lookup.
    exact_index: HashMap<String, Vec<K>>,
    /// Maps n-grams of normalized names to keys for substring search.
    ngram_index: HashMap<String, HashSet<K>>,
}

impl<K: Eq + Hash> Default for SearchIndex<K> {
    fn default() -> Self {
        Self {
            names: HashMap::new(),
            exact_index: HashMap::new(),
            ngram_index: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash + Ord> SearchIndex<K> {
    /// Creates a new empty search index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a name into the index. Blank names are not indexed.
    pub fn insert(&mut self, name: &str, key: K) {
        let normalized = normalize(name);
        if normalized.is_empty() {
            return;
        }

        for ngram in generate_ngrams(&normalized) {
            self.ngram_index.entry(ngram).or_default().insert(key.clone());
        }
        self.exact_index
            .entry(normalized.clone())
            .or_default()
            .push(key.clone());
        self.names.insert(key, normalized);
    }

    /// Searches for keys whose names match the query.
    ///
    /// Results are ordered by match kind, then normalized name, then key.
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit<K>> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut hits: HashMap<K, MatchKind> = HashMap::new();

        if let Some(keys) = self.exact_index.get(&query) {
            for key in keys {
                hits.insert(key.clone(), MatchKind::Exact);
            }
        }

        for key in self.candidates(&query) {
            if hits.contains_key(&key) {
                continue;
            }
            if let Some(kind) = self.names.get(&key).and_then(|name| classify(name, &query)) {
                hits.insert(key, kind);
            }
        }

        let query_tokens = tokens(&query);
        if query_tokens.len() > 1 {
            let mut candidates: Option<HashSet<K>> = None;
            for token in &query_tokens {
                let found = self.candidates(token);
                candidates = Some(match candidates {
                    None => found,
                    Some(mut c) => {
                        c.retain(|key| found.contains(key));
                        c
                    }
                });
            }

            for key in candidates.unwrap_or_default() {
                if hits.contains_key(&key) {
                    continue;
                }
                let all_present = self
                    .names
                    .get(&key)
                    .map(|name| query_tokens.iter().all(|t| name.contains(t)))
                    .unwrap_or(false);
                if all_present {
                    hits.insert(key, MatchKind::AllTokens);
                }
            }
        }

        let mut results: Vec<SearchHit<K>> = hits
            .into_iter()
            .map(|(key, kind)| SearchHit { kind, key })
            .collect();

        results.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| self.names.get(&a.key).cmp(&self.names.get(&b.key)))
                .then_with(|| a.key.cmp(&b.key))
        });

        results
    }

    /// Keys whose names may contain `fragment`.
    ///
    /// Fragments shorter than an n-gram cannot use the index and fall back
    /// to every key. Otherwise the n-gram sets are intersected, which can
    /// still yield false positives; callers verify each candidate.
    fn candidates(&self, fragment: &str) -> HashSet<K> {
        if fragment.chars().count() < MIN_NGRAM_LEN {
            return self.names.keys().cloned().collect();
        }

        let mut candidates: Option<HashSet<K>> = None;

        for ngram in generate_ngrams(fragment) {
            let Some(keys) = self.ngram_index.get(&ngram) else {
                // If any n-gram has no matches, the fragment has no results
                return HashSet::new();
            };
            match &mut candidates {
                None => candidates = Some(keys.clone()),
                Some(c) => c.retain(|key| keys.contains(key)),
            }
        }

        candidates.unwrap_or_default()
    }

    /// Returns the number of keys indexed.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn classify(name: &str, query: &str) -> Option<MatchKind> {
    if name == query {
        Some(MatchKind::Exact)
    } else if name.starts_with(query) {
        Some(MatchKind::Prefix)
    } else if name.contains(query) {
        Some(MatchKind::Substring)
    } else {
        None
    }
}

/// Generates n-grams for a normalized string.
fn generate_ngrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut ngrams = Vec::new();

    for n in MIN_NGRAM_LEN..=MAX_NGRAM_LEN {
        if chars.len() >= n {
            for i in 0..=(chars.len() - n) {
                ngrams.push(chars[i..i + n].iter().collect());
            }
        }
    }

    ngrams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(hits: &[SearchHit<u32>]) -> Vec<u32> {
        hits.iter().map(|h| h.key).collect()
    }

    #[test]
    fn test_ranks_exact_prefix_substring() {
        let mut index = SearchIndex::new();
        index.insert("Anna Smithson", 1);
        index.insert("Smith", 2);
        index.insert("Smithers, Waylon", 3);

        let hits = index.search("smith");
        assert_eq!(keys(&hits), vec![2, 3, 1]);
        assert_eq!(hits[0].kind, MatchKind::Exact);
        assert_eq!(hits[1].kind, MatchKind::Prefix);
        assert_eq!(hits[2].kind, MatchKind::Substring);
    }

    #[test]
    fn test_accents_do_not_matter() {
        let mut index = SearchIndex::new();
        index.insert("José Ortega", 1);
        index.insert("Jose Marti", 2);

        assert_eq!(index.search("jose"), index.search("José"));
        assert_eq!(keys(&index.search("JOSÉ")), vec![2, 1]);
    }

    #[test]
    fn test_tokens_in_any_order() {
        let mut index = SearchIndex::new();
        index.insert("Numbers, Ronald", 1);
        index.insert("Ronald Reagan", 2);

        let hits = index.search("Ronald Numbers");
        assert_eq!(keys(&hits), vec![1]);
        assert_eq!(hits[0].kind, MatchKind::AllTokens);
    }

    #[test]
    fn test_short_query_scans() {
        let mut index = SearchIndex::new();
        index.insert("ab", 0);
        index.insert("cab", 1);
        index.insert("xyz", 2);

        let hits = index.search("a");
        assert_eq!(keys(&hits), vec![0, 1]);
        assert_eq!(hits[0].kind, MatchKind::Prefix);
        assert_eq!(hits[1].kind, MatchKind::Substring);
    }

    #[test]
    fn test_ties_sorted_by_key() {
        let mut index = SearchIndex::new();
        index.insert("Lee", 9);
        index.insert("Lee", 4);

        assert_eq!(keys(&index.search("lee")), vec![4, 9]);
    }

    #[test]
    fn test_search_no_match() {
        let mut index = SearchIndex::new();
        index.insert("hello", 0);

        assert!(index.search("world").is_empty());
        assert!(index.search("   ").is_empty());
    }

    #[test]
    fn test_blank_names_not_indexed() {
        let mut index: SearchIndex<u32> = SearchIndex::new();
        index.insert("  ", 0);
        assert!(index.is_empty());
    }
}
