//! Token extraction and pair scoring.
//!
//! The semantic similarity between two elements is a weighted Jaccard over
//! name tokens (0.40), tags (0.35), and description tokens (0.25). Verb and
//! tag overlap are scored separately so each can carry its own edge kind.
//! Tokens pass through a small suffix stemmer so that "summarize",
//! "summarizes", and "summarizing" land on the same stem.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::elements::ElementKey;

pub const NAME_WEIGHT: f64 = 0.40;
pub const TAG_WEIGHT: f64 = 0.35;
pub const DESCRIPTION_WEIGHT: f64 = 0.25;

/// Per-element token sets, assembled once per build.
#[derive(Debug, Clone, Default)]
pub struct TokenSets {
    /// Stemmed tokens from the element name.
    pub names: BTreeSet<String>,
    /// Lowercased tags, kept whole.
    pub tags: BTreeSet<String>,
    /// Stemmed tokens from the description.
    pub words: BTreeSet<String>,
    /// Normalized verbs.
    pub verbs: BTreeSet<String>,
}

/// Similarity components for one unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairScores {
    /// Weighted name/tag/description overlap.
    pub semantic: f64,
    /// Verb-set overlap.
    pub verb: f64,
    /// Tag-set overlap.
    pub tag: f64,
}

/// Lowercase, split on non-alphanumerics, drop tokens shorter than three
/// characters, stem the rest.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(stem)
        .collect()
}

/// Canonical form of a verb: trimmed, lowercased, stemmed.
pub fn normalize_verb(verb: &str) -> String {
    stem(&verb.trim().to_lowercase())
}

/// Canonical form of a tag: trimmed and lowercased, kept whole.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Naive suffix stemmer. Handles ies/ing/ed/s plus a final silent e, with
/// consonant undoubling after ing/ed (running -> run, planned -> plan).
pub fn stem(word: &str) -> String {
    let mut w = word.to_string();
    if w.len() > 4 && w.ends_with("ies") {
        w.truncate(w.len() - 3);
        w.push('y');
    } else if w.len() > 5 && w.ends_with("ing") {
        w.truncate(w.len() - 3);
        undouble(&mut w);
    } else if w.len() > 4 && w.ends_with("ed") {
        w.truncate(w.len() - 2);
        undouble(&mut w);
    } else if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
        w.truncate(w.len() - 1);
    }
    if w.len() > 3 && w.ends_with('e') {
        w.truncate(w.len() - 1);
    }
    w
}

fn undouble(w: &mut String) {
    let mut rev = w.chars().rev();
    let (Some(last), Some(prev)) = (rev.next(), rev.next()) else {
        return;
    };
    if last == prev && last.is_ascii_alphabetic() && !"aeioulsz".contains(last) {
        w.pop();
    }
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

pub fn semantic_score(a: &TokenSets, b: &TokenSets) -> f64 {
    NAME_WEIGHT * jaccard(&a.names, &b.names)
        + TAG_WEIGHT * jaccard(&a.tags, &b.tags)
        + DESCRIPTION_WEIGHT * jaccard(&a.words, &b.words)
}

/// Memoizes pair scores for the duration of one build so a pair reached
/// through several candidate buckets is scored once.
pub struct PairScorer<'a> {
    tokens: &'a BTreeMap<ElementKey, TokenSets>,
    cache: HashMap<(ElementKey, ElementKey), PairScores>,
    computed: usize,
}

impl<'a> PairScorer<'a> {
    pub fn new(tokens: &'a BTreeMap<ElementKey, TokenSets>) -> Self {
        Self {
            tokens,
            cache: HashMap::new(),
            computed: 0,
        }
    }

    pub fn score(&mut self, a: &ElementKey, b: &ElementKey) -> PairScores {
        let pair = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        if let Some(&scores) = self.cache.get(&pair) {
            return scores;
        }
        let scores = match (self.tokens.get(&pair.0), self.tokens.get(&pair.1)) {
            (Some(ta), Some(tb)) => PairScores {
                semantic: semantic_score(ta, tb),
                verb: jaccard(&ta.verbs, &tb.verbs),
                tag: jaccard(&ta.tags, &tb.tags),
            },
            _ => PairScores::default(),
        };
        self.computed += 1;
        self.cache.insert(pair, scores);
        scores
    }

    /// Number of pairs actually scored (cache misses).
    pub fn computed(&self) -> usize {
        self.computed
    }
}
