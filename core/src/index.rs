//! In-memory n-gram index.
//!
//! Items are cut into character shingles and registered in an inverted index
//! (`shingle -> postings`). Queries are cut the same way; any item sharing at least
//! one shingle with the query is a candidate, and candidates are visited in the
//! order they are discovered: query shingles left to right, each posting list in
//! insertion order.
//!
//! `Index` does no internal locking. Adds need `&mut self`, so concurrent adds must be
//! serialised by the owner (see [`SharedIndex`](crate::SharedIndex)); queries on an
//! index that is not being mutated may run from any number of threads.
//!
//! The corpus sits behind an `Arc` so a streaming search can walk it from its own
//! thread. An add made while a stream is still running copies the corpus first; the
//! stream keeps seeing the items that existed when it started.

use crate::config::{check_score, IndexConfig};
use crate::document::{Document, Item};
use crate::error::{Error, Result};
use crate::scorer::score;
use crate::shingle::ShingleSet;
use crate::stream::{SearchResult, SimilarStream};
use crate::tokenizer::{normalize, Tokenizer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub item_id: String,
    /// Occurrences of the shingle within the item. Informational, scoring ignores it.
    pub count: u32,
}

/// `shingle -> postings`. Each item appears at most once per posting list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Distinct shingles indexed.
    pub fn len(&self) -> usize { self.postings.len() }
    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    pub fn postings(&self, shingle: &str) -> &[Posting] {
        self.postings.get(shingle).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Posting])> + '_ {
        self.postings.iter().map(|(s, p)| (s.as_str(), p.as_slice()))
    }

    fn register(&mut self, item_id: &str, counts: Vec<(String, u32)>) {
        for (shingle, count) in counts {
            self.postings
                .entry(shingle)
                .or_default()
                .push(Posting { item_id: item_id.to_string(), count });
        }
    }
}

/// A stored item together with its shingle signature.
#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) item: Arc<T>,
    pub(crate) shingles: ShingleSet,
}

/// Items by id plus the inverted index over them. Always updated together.
#[derive(Debug)]
pub(crate) struct Corpus<T> {
    entries: HashMap<String, Arc<Entry<T>>>,
    inverted: InvertedIndex,
}

impl<T> Clone for Corpus<T> {
    fn clone(&self) -> Self {
        Self { entries: self.entries.clone(), inverted: self.inverted.clone() }
    }
}

impl<T> Corpus<T> {
    fn new() -> Self {
        Self { entries: HashMap::new(), inverted: InvertedIndex::new() }
    }

    /// Visit every item reachable from a query shingle, each once, in discovery order.
    /// Posting lists are walked only as far as `visit` keeps returning `Continue`.
    pub(crate) fn visit_candidates<'a, F>(&'a self, query: &Tokenizer, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(&'a Arc<Entry<T>>) -> ControlFlow<()>,
    {
        let mut seen_shingles: HashSet<&str> = HashSet::new();
        let mut seen_items: HashSet<&'a str> = HashSet::new();
        for shingle in query.iter_str() {
            if !seen_shingles.insert(shingle) {
                continue;
            }
            for posting in self.inverted.postings(shingle) {
                if !seen_items.insert(posting.item_id.as_str()) {
                    continue;
                }
                if let Some(entry) = self.entries.get(&posting.item_id) {
                    if visit(entry).is_break() {
                        return ControlFlow::Break(());
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }
}

#[derive(Debug)]
pub struct Index<T = Document> {
    config: IndexConfig,
    corpus: Arc<Corpus<T>>,
}

impl<T: Item> Index<T> {
    /// Index over `n`-character shingles with default settings.
    ///
    /// # Panics
    /// If `n == 0`.
    pub fn new(n: usize) -> Self {
        assert!(n >= 1, "window size must be at least 1");
        Self::build(IndexConfig::new(n))
    }

    pub fn with_config(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: IndexConfig) -> Self {
        Self { config, corpus: Arc::new(Corpus::new()) }
    }

    pub fn config(&self) -> &IndexConfig { &self.config }
    pub fn window_size(&self) -> usize { self.config.window_size }
    pub fn min_similarity_score(&self) -> f64 { self.config.min_similarity_score }

    pub fn set_min_similarity_score(&mut self, score: f64) -> Result<()> {
        check_score(score)?;
        self.config.min_similarity_score = score;
        Ok(())
    }

    pub fn len(&self) -> usize { self.corpus.entries.len() }
    pub fn is_empty(&self) -> bool { self.corpus.entries.is_empty() }

    pub fn contains(&self, id: &str) -> bool { self.corpus.entries.contains_key(id) }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.corpus.entries.get(id).map(|e| e.item.as_ref())
    }

    pub fn shingles_of(&self, id: &str) -> Option<&ShingleSet> {
        self.corpus.entries.get(id).map(|e| &e.shingles)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.corpus.entries.keys().map(String::as_str)
    }

    pub fn inverted(&self) -> &InvertedIndex { &self.corpus.inverted }

    /// Distinct shingles across the corpus.
    pub fn shingle_count(&self) -> usize { self.corpus.inverted.len() }

    pub fn postings(&self, shingle: &str) -> &[Posting] {
        self.corpus.inverted.postings(shingle)
    }

    /// Tokenizer configured the way this index cuts text.
    pub fn tokenizer(&self, text: &str) -> Tokenizer {
        if self.config.normalize {
            Tokenizer::new(self.config.window_size, normalize(text))
        } else {
            Tokenizer::new(self.config.window_size, text)
        }
    }

    /// Fails with [`Error::DuplicateId`] if the id is taken; the index is untouched in that case.
    pub fn add_item(&mut self, item: T) -> Result<()> {
        let id = item.id().to_string();
        debug_assert!(!id.is_empty(), "item ids must be non-empty");
        if self.corpus.entries.contains_key(&id) {
            debug!(id = %id, "rejected duplicate item");
            return Err(Error::DuplicateId(id));
        }

        let tokenizer = self.tokenizer(item.content());
        let counts = shingle_counts(&tokenizer);
        let shingles: ShingleSet = counts.iter().map(|(s, _)| s.as_str()).collect();
        debug!(id = %id, tokens = tokenizer.len(), shingles = shingles.len(), "indexed item");

        let corpus = Arc::make_mut(&mut self.corpus);
        corpus.inverted.register(&id, counts);
        corpus.entries.insert(id, Arc::new(Entry { item: Arc::new(item), shingles }));
        Ok(())
    }

    /// Items sharing at least one shingle with `query`, in discovery order.
    pub fn find_matching_items(&self, query: &str) -> Vec<&T> {
        let tokenizer = self.tokenizer(query);
        let found: Vec<&T> = self.candidates(&tokenizer).into_iter().map(|e| e.item.as_ref()).collect();
        trace!(matches = found.len(), "find_matching_items");
        found
    }

    pub fn find_matching_strings(&self, query: &str) -> Vec<&str> {
        self.find_matching_items(query).into_iter().map(Item::content).collect()
    }

    /// Candidates scoring at least `min_score`, in discovery order.
    pub fn find_similar_items(&self, query: &str, min_score: f64) -> Vec<&T> {
        let tokenizer = self.tokenizer(query);
        let query_set = tokenizer.shingles();
        self.candidates(&tokenizer)
            .into_iter()
            .filter(|e| score(&query_set, &e.shingles) >= min_score)
            .map(|e| e.item.as_ref())
            .collect()
    }

    /// Contents of similar items, filtered by the configured floor.
    pub fn find_similar_strings(&self, query: &str) -> Vec<&str> {
        self.find_similar_items(query, self.config.min_similarity_score)
            .into_iter()
            .map(Item::content)
            .collect()
    }

    /// Scored candidates, best first. Equal scores keep discovery order. `limit == 0` keeps all.
    pub fn rank_similar(&self, query: &str, min_score: f64, limit: usize) -> Vec<SearchResult<T>> {
        let tokenizer = self.tokenizer(query);
        let query_set = tokenizer.shingles();
        let mut scored: Vec<SearchResult<T>> = self
            .candidates(&tokenizer)
            .into_iter()
            .filter_map(|e| {
                let s = score(&query_set, &e.shingles);
                (s >= min_score).then(|| SearchResult { score: s, item: Arc::clone(&e.item) })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        if limit > 0 {
            scored.truncate(limit);
        }
        scored
    }

    fn candidates(&self, query: &Tokenizer) -> Vec<&Arc<Entry<T>>> {
        let mut found = Vec::new();
        let _ = self.corpus.visit_candidates(query, |entry| {
            found.push(entry);
            ControlFlow::Continue(())
        });
        found
    }
}

impl Index<Document> {
    /// Index `content` under its content-hash id.
    pub fn add_string(&mut self, content: impl Into<String>) -> Result<()> {
        self.add_item(Document::new(content))
    }
}

impl<T: Item + Send + Sync + 'static> Index<T> {
    /// Score candidates on a background thread and stream those reaching `min_score`.
    ///
    /// Results arrive in discovery order, not by score. `limit == 0` is unbounded; otherwise
    /// the producer stops walking postings after `limit` results. Dropping or cancelling the
    /// stream stops it too.
    pub fn iterate_similar(&self, query: &str, min_score: f64, limit: usize) -> SimilarStream<T> {
        let tokenizer = self.tokenizer(query);
        trace!(tokens = tokenizer.len(), min_score, limit, "iterate_similar");
        SimilarStream::spawn(Arc::clone(&self.corpus), tokenizer, min_score, limit, self.config.stream_buffer)
    }

    /// Highest scoring item at or above the configured floor. Ties go to the first seen.
    pub fn find_best_match(&self, query: &str) -> Option<Arc<T>> {
        let mut best: Option<SearchResult<T>> = None;
        for result in self.iterate_similar(query, self.config.min_similarity_score, 0) {
            if best.as_ref().is_none_or(|b| result.score > b.score) {
                best = Some(result);
            }
        }
        best.map(|r| r.item)
    }
}

/// Shingles in order of first appearance with their occurrence counts.
fn shingle_counts(tokenizer: &Tokenizer) -> Vec<(String, u32)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, u32)> = Vec::new();
    for s in tokenizer.iter_str() {
        match slots.get(s) {
            Some(&i) => counts[i].1 += 1,
            None => {
                slots.insert(s, counts.len());
                counts.push((s.to_string(), 1));
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(n: usize, texts: &[&str]) -> Index {
        let mut index = Index::new(n);
        for t in texts {
            index.add_string(*t).unwrap();
        }
        index
    }

    #[test]
    fn add_registers_each_shingle_once_with_counts() {
        let index = index_of(3, &["abcabc"]);
        let id = Document::new("abcabc").id().to_string();
        assert_eq!(index.shingle_count(), 3);
        assert_eq!(index.postings("abc"), &[Posting { item_id: id.clone(), count: 2 }]);
        assert_eq!(index.postings("bca"), &[Posting { item_id: id, count: 1 }]);
        assert!(index.postings("zzz").is_empty());
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut index = index_of(3, &["abc"]);
        let err = index.add_string("abc").unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.postings("abc").len(), 1);
    }

    #[test]
    fn short_item_is_stored_without_shingles() {
        let index = index_of(3, &["ab"]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.shingle_count(), 0);
        assert!(index.find_matching_items("ab").is_empty());
    }

    #[test]
    fn matching_keeps_discovery_order() {
        let index = index_of(3, &["xyzabc", "abcxyz", "nothing"]);
        // "xyz" is the first query shingle, so its posting list leads.
        let found = index.find_matching_strings("xyz abc");
        assert_eq!(found, vec!["xyzabc", "abcxyz"]);
    }

    #[test]
    fn rank_orders_by_score_then_discovery() {
        let index = index_of(3, &["abcabc", "aabc", "abc", "abc!"]);
        let ranked = index.rank_similar("abc", 0.0, 0);
        let order: Vec<&str> = ranked.iter().map(|r| r.item.content()).collect();
        assert_eq!(order, vec!["abc", "aabc", "abc!", "abcabc"]);
        assert_eq!(ranked[0].score, 1.0);

        let top = index.rank_similar("abc", 0.0, 1);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn floor_setter_validates() {
        let mut index: Index = Index::new(3);
        assert_eq!(index.min_similarity_score(), 0.0);
        index.set_min_similarity_score(0.4).unwrap();
        assert_eq!(index.min_similarity_score(), 0.4);
        assert!(index.set_min_similarity_score(-0.1).is_err());
        assert_eq!(index.min_similarity_score(), 0.4);
    }

    #[test]
    fn normalization_applies_to_items_and_queries() {
        let config = IndexConfig { normalize: true, ..IndexConfig::new(3) };
        let mut index: Index = Index::with_config(config).unwrap();
        index.add_string("ＨＥＬＬＯ").unwrap();
        assert_eq!(index.find_matching_strings("hello"), vec!["ＨＥＬＬＯ"]);
    }

    #[test]
    fn limited_stream_walks_postings_lazily() {
        let texts: Vec<String> = (0..10_000).map(|i| format!("abc {i}")).collect();
        let mut index: Index = Index::new(3);
        for t in &texts {
            index.add_string(t.as_str()).unwrap();
        }

        let mut stream = index.iterate_similar("abc", 0.0, 1);
        let first = stream.next().expect("one result");
        assert!(stream.next().is_none());

        // Only the emitted item is shared with the stream; no entry was cloned out.
        let entries = &index.corpus.entries;
        assert!(entries.values().all(|e| Arc::strong_count(e) == 1));
        let held = entries.values().filter(|e| Arc::strong_count(&e.item) > 1).count();
        assert_eq!(held, 1);
        assert_eq!(first.item.content(), "abc 0");
    }

    #[test]
    fn add_during_stream_leaves_stream_on_its_snapshot() {
        let mut index = index_of(3, &["abc1", "abc2", "abc3"]);
        let mut stream = index.iterate_similar("abc", 0.0, 0);
        assert!(stream.next().is_some());

        index.add_string("abc4").unwrap();
        assert_eq!(stream.count(), 2);
        assert_eq!(index.len(), 4);
        assert_eq!(index.find_matching_items("abc").len(), 4);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "non-empty")]
    fn empty_item_id_is_rejected_in_debug() {
        struct Blank;
        impl Item for Blank {
            fn id(&self) -> &str { "" }
            fn content(&self) -> &str { "abc" }
        }
        let mut index: Index<Blank> = Index::new(3);
        let _ = index.add_item(Blank);
    }

    #[test]
    #[should_panic]
    fn zero_window_panics() {
        let _index: Index = Index::new(0);
    }
}
