//! Bounded relationship discovery.
//!
//! All-pairs comparison over the merged element table is quadratic, so the
//! build pre-filters candidates to pairs sharing at least one tag or verb,
//! caps candidate generation at a fixed multiple of the comparison budget,
//! and randomly samples down to the budget before scoring. Each scored pair
//! can yield up to three edges (semantic, verb-shared, co-tag), each
//! independently thresholded.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::scoring::{self, PairScorer, TokenSets};
use super::IndexConfig;
use crate::elements::{ElementKey, ElementRef};

/// Candidate generation stops at this multiple of the comparison budget.
pub const CANDIDATE_MULTIPLIER: usize = 16;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Weighted name/tag/description overlap.
    Semantic,
    /// Verb-set overlap.
    VerbShared,
    /// Tag-set overlap.
    CoTag,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::VerbShared => "verb-shared",
            Self::CoTag => "co-tag",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An undirected scored edge, stored with `a <= b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub a: ElementKey,
    pub b: ElementKey,
    pub score: f64,
    pub kind: EdgeKind,
}

/// Output of one relationship build.
pub struct RelationshipGraph {
    pub edges: Vec<RelationshipEdge>,
    pub verb_map: BTreeMap<String, Vec<ElementKey>>,
    /// Pairs actually scored, for logs and stats.
    pub scored_pairs: usize,
}

impl RelationshipGraph {
    /// Discover relationships over a merged element table. The table is
    /// received as a parameter; this never reaches back into the index.
    pub fn build(
        elements: &BTreeMap<ElementKey, Vec<ElementRef>>,
        config: &IndexConfig,
    ) -> RelationshipGraph {
        // 1. Assemble per-element token sets.
        let tokens = element_tokens(elements);

        // 2. Verb lookup table from the normalized verb sets.
        let verb_map = build_verb_map(&tokens);

        // 3. Candidate pairs from shared-tag/verb buckets, generation-capped
        //    so a pathological single bucket cannot go quadratic.
        let cap = config.max_comparisons.saturating_mul(CANDIDATE_MULTIPLIER);
        let mut pairs = candidate_pairs(&tokens, cap);

        // 4. Random sample down to the comparison budget.
        if pairs.len() > config.max_comparisons {
            pairs.shuffle(&mut rand::thread_rng());
            pairs.truncate(config.max_comparisons);
        }

        // 5. Score the sample, keeping edges over the threshold.
        let mut scorer = PairScorer::new(&tokens);
        let mut edges = Vec::new();
        for (a, b) in &pairs {
            let scores = scorer.score(a, b);
            push_edge(&mut edges, a, b, scores.semantic, EdgeKind::Semantic, config);
            push_edge(&mut edges, a, b, scores.verb, EdgeKind::VerbShared, config);
            push_edge(&mut edges, a, b, scores.tag, EdgeKind::CoTag, config);
        }

        // 6. Deterministic edge order.
        edges.sort_by(|x, y| {
            x.a.cmp(&y.a)
                .then_with(|| x.b.cmp(&y.b))
                .then_with(|| x.kind.cmp(&y.kind))
        });

        RelationshipGraph {
            edges,
            verb_map,
            scored_pairs: scorer.computed(),
        }
    }
}

/// Token sets per key: tags and verbs unioned across every tier's ref,
/// description taken from the preferred ref.
fn element_tokens(
    elements: &BTreeMap<ElementKey, Vec<ElementRef>>,
) -> BTreeMap<ElementKey, TokenSets> {
    let mut out = BTreeMap::new();
    for (key, refs) in elements {
        let mut sets = TokenSets {
            names: scoring::tokenize(&key.name),
            ..TokenSets::default()
        };
        for element in refs {
            for tag in &element.tags {
                let tag = scoring::normalize_tag(tag);
                if !tag.is_empty() {
                    sets.tags.insert(tag);
                }
            }
            for verb in &element.verbs {
                let verb = scoring::normalize_verb(verb);
                if !verb.is_empty() {
                    sets.verbs.insert(verb);
                }
            }
        }
        if let Some(preferred) = refs.first() {
            sets.words = scoring::tokenize(&preferred.description);
        }
        out.insert(key.clone(), sets);
    }
    out
}

fn build_verb_map(
    tokens: &BTreeMap<ElementKey, TokenSets>,
) -> BTreeMap<String, Vec<ElementKey>> {
    let mut map: BTreeMap<String, Vec<ElementKey>> = BTreeMap::new();
    for (key, sets) in tokens {
        for verb in &sets.verbs {
            map.entry(verb.clone()).or_default().push(key.clone());
        }
    }
    map
}

/// Unique unordered pairs drawn from tag and verb buckets. Bucket keys are
/// namespaced so a tag and a verb with the same text stay separate buckets.
fn candidate_pairs(
    tokens: &BTreeMap<ElementKey, TokenSets>,
    max_generated: usize,
) -> Vec<(ElementKey, ElementKey)> {
    let mut buckets: BTreeMap<(u8, &str), Vec<&ElementKey>> = BTreeMap::new();
    for (key, sets) in tokens {
        for tag in &sets.tags {
            buckets.entry((0, tag.as_str())).or_default().push(key);
        }
        for verb in &sets.verbs {
            buckets.entry((1, verb.as_str())).or_default().push(key);
        }
    }

    let mut seen: HashSet<(&ElementKey, &ElementKey)> = HashSet::new();
    let mut pairs = Vec::new();
    'outer: for members in buckets.values() {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if pairs.len() >= max_generated {
                    break 'outer;
                }
                let pair = if a <= b { (*a, *b) } else { (*b, *a) };
                if seen.insert(pair) {
                    pairs.push((pair.0.clone(), pair.1.clone()));
                }
            }
        }
    }
    pairs
}

fn push_edge(
    edges: &mut Vec<RelationshipEdge>,
    a: &ElementKey,
    b: &ElementKey,
    score: f64,
    kind: EdgeKind,
    config: &IndexConfig,
) {
    if score < config.min_edge_score {
        return;
    }
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    edges.push(RelationshipEdge {
        a: a.clone(),
        b: b.clone(),
        score: score.clamp(0.0, 1.0),
        kind,
    });
}
