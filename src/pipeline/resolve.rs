//! Name resolution: free-text company name → CIK.
//!
//! Three tiers are tried in strict order and the first tier that produces any
//! candidate decides the answer; scores are never blended across tiers.
//!
//! 1. **Exact**: case-insensitive equality with a title.
//! 2. **Boundary**: the query appears as a whole-word span of a title, so
//!    `Meta` matches `Meta Platforms, Inc.` but not `Umetal Corp`.
//! 3. **Fuzzy**: [`Similarity`] score at or above the threshold; the best of
//!    the top [`FUZZY_TOP_K`] candidates wins.
//!
//! Ties in every tier go to the entry that comes first in index order.

use crate::pipeline::index::{Cik, CompanyIndex, IndexEntry};
use crate::pipeline::similarity::{MatchingBlocksRatio, Similarity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, error};

/// Default minimum fuzzy score.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Fuzzy candidates considered after thresholding.
pub const FUZZY_TOP_K: usize = 5;

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Boundary,
    Fuzzy,
}

/// A resolved entry with the tier and score that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch<'a> {
    pub entry: &'a IndexEntry,
    pub tier: MatchTier,
    /// `1.0` for exact and boundary matches.
    pub score: f64,
}

/// Resolves names against a [`CompanyIndex`] snapshot. Pure; holds no state
/// beyond its parameters.
#[derive(Debug, Clone)]
pub struct NameResolver<S = MatchingBlocksRatio> {
    similarity: S,
    threshold: f64,
    top_k: usize,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl NameResolver {
    pub fn new(threshold: f64) -> Self {
        Self::with_similarity(MatchingBlocksRatio, threshold)
    }
}

impl<S: Similarity> NameResolver<S> {
    pub fn with_similarity(similarity: S, threshold: f64) -> Self {
        Self {
            similarity,
            threshold,
            top_k: FUZZY_TOP_K,
        }
    }

    /// Resolve `name` to a CIK, or `None` when nothing matches.
    pub fn resolve(&self, index: &CompanyIndex, name: &str) -> Option<Cik> {
        self.find(index, name).map(|m| m.entry.cik.clone())
    }

    /// Like [`resolve`](Self::resolve) but returns the matched entry and tier.
    ///
    /// Never fails: an internal error is logged and reported as no match.
    pub fn find<'a>(&self, index: &'a CompanyIndex, name: &str) -> Option<NameMatch<'a>> {
        match self.try_find(index, name) {
            Ok(found) => found,
            Err(e) => {
                error!("Error resolving CIK for '{}': {}", name, e);
                None
            }
        }
    }

    fn try_find<'a>(
        &self,
        index: &'a CompanyIndex,
        name: &str,
    ) -> Result<Option<NameMatch<'a>>, regex::Error> {
        let query = name.trim().to_lowercase();
        if query.is_empty() || index.is_empty() {
            return Ok(None);
        }

        let titles: Vec<String> = index
            .entries()
            .iter()
            .map(|e| e.title.to_lowercase())
            .collect();

        if let Some(pos) = titles.iter().position(|t| *t == query) {
            return Ok(Some(NameMatch {
                entry: &index.entries()[pos],
                tier: MatchTier::Exact,
                score: 1.0,
            }));
        }

        let boundary = Regex::new(&format!(r"\b{}\b", regex::escape(&query)))?;
        if let Some(pos) = titles.iter().position(|t| boundary.is_match(t)) {
            return Ok(Some(NameMatch {
                entry: &index.entries()[pos],
                tier: MatchTier::Boundary,
                score: 1.0,
            }));
        }

        Ok(self.best_fuzzy(&titles, &query).map(|(pos, score)| {
            debug!(
                "Fuzzy match for '{}': '{}' ({:.3})",
                name,
                index.entries()[pos].title,
                score
            );
            NameMatch {
                entry: &index.entries()[pos],
                tier: MatchTier::Fuzzy,
                score,
            }
        }))
    }

    /// `(position, score)` of the best fuzzy candidate, if any clears the
    /// threshold.
    fn best_fuzzy(&self, titles: &[String], query: &str) -> Option<(usize, f64)> {
        let mut candidates: Vec<(usize, f64)> = titles
            .iter()
            .enumerate()
            .map(|(pos, t)| (pos, self.similarity.similarity(query, t)))
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        // Stable: equal scores keep index order.
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        candidates.truncate(self.top_k);
        candidates.into_iter().next()
    }
}

/// Resolve `name` with the default similarity measure.
pub fn resolve(index: &CompanyIndex, name: &str, threshold: f64) -> Option<Cik> {
    NameResolver::new(threshold).resolve(index, name)
}
