//! Hierarchy deduplication for zero-shot tags.
//!
//! Post-processes scored tags to remove redundant ancestor terms and
//! optionally annotate surviving tags with abbreviated hierarchy paths.

use std::collections::HashSet;

use crate::types::Tag;

use super::vocabulary::Vocabulary;

/// Terms too generic to be useful in abbreviated hierarchy paths.
const SKIP_TERMS: &[&str] = &[
    "entity",
    "physical entity",
    "object",
    "whole",
    "thing",
    "organism",
    "living thing",
    "abstraction",
    "matter",
    "substance",
    "body",
    "unit",
];

/// Post-processes scored tags to remove ancestor redundancy and add paths.
pub struct HierarchyDedup;

impl HierarchyDedup {
    /// Check if `ancestor_name` appears in `term_name`'s hypernym chain.
    ///
    /// Tag names are display names (spaces), but vocabulary lookup uses raw
    /// names (underscores). This helper normalizes between the two.
    fn is_ancestor(vocabulary: &Vocabulary, term_name: &str, ancestor_name: &str) -> bool {
        let raw_name = term_name.replace(' ', "_");
        let term = match vocabulary.get(&raw_name) {
            Some(t) => t,
            None => return false,
        };

        term.hypernyms.iter().any(|h| h == ancestor_name)
    }

    /// Remove tags that are ancestors of other tags in the list.
    ///
    /// For each pair of tags (A, B): if A is an ancestor of B (via WordNet
    /// hypernyms), suppress A. The more specific tag B survives regardless
    /// of confidence ordering.
    pub fn deduplicate(tags: &[Tag], vocabulary: &Vocabulary) -> Vec<Tag> {
        let mut suppressed: HashSet<usize> = HashSet::new();

        for i in 0..tags.len() {
            if suppressed.contains(&i) {
                continue;
            }

            for j in 0..tags.len() {
                if i == j || suppressed.contains(&j) {
                    continue;
                }

                // Check if tags[i] is an ancestor of tags[j]
                if Self::is_ancestor(vocabulary, &tags[j].name, &tags[i].name) {
                    suppressed.insert(i);
                    break;
                }
            }
        }

        tags.iter()
            .enumerate()
            .filter(|(i, _)| !suppressed.contains(i))
            .map(|(_, tag)| tag.clone())
            .collect()
    }

    /// Add abbreviated hierarchy paths to tags.
    ///
    /// Path format: "grandparent > parent > term"
    /// Shows at most `max_ancestors` levels, skipping very generic terms.
    pub fn add_paths(tags: &mut [Tag], vocabulary: &Vocabulary, max_ancestors: usize) {
        for tag in tags.iter_mut() {
            let raw_name = tag.name.replace(' ', "_");
            let term = match vocabulary.get(&raw_name) {
                Some(t) => t,
                None => continue,
            };

            if term.hypernyms.is_empty() {
                continue;
            }

            // Filter out overly generic ancestors
            let meaningful: Vec<&str> = term
                .hypernyms
                .iter()
                .map(|h| h.as_str())
                .filter(|h| !SKIP_TERMS.contains(h))
                .collect();

            if meaningful.is_empty() {
                continue;
            }

            // Hypernyms are stored most-specific-first.
            // Take the last N (most general of the meaningful ones),
            // then reverse so the path reads general → specific.
            let ancestors: Vec<&str> = if meaningful.len() > max_ancestors {
                meaningful[meaningful.len() - max_ancestors..].to_vec()
            } else {
                meaningful
            };

            let mut path_parts: Vec<&str> = ancestors.into_iter().rev().collect();
            path_parts.push(&tag.name);

            tag.path = Some(path_parts.join(" > "));
        }
    }
}
