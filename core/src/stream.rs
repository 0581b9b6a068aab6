//! Streaming similarity search.
//!
//! A producer thread walks the query's posting lists, scores each candidate as it is
//! reached and hands qualifying results to the consumer over a bounded channel. Nothing
//! past the last emitted result is visited. The consumer stops the producer by calling
//! [`SimilarStream::cancel`] or by dropping the stream; both close the cancel channel
//! the producer watches before every emission.

use crate::index::Corpus;
use crate::scorer::score;
use crate::tokenizer::Tokenizer;
use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::trace;

#[derive(Debug)]
pub struct SearchResult<T> {
    pub score: f64,
    pub item: Arc<T>,
}

impl<T> Clone for SearchResult<T> {
    fn clone(&self) -> Self {
        Self { score: self.score, item: Arc::clone(&self.item) }
    }
}

/// Finite, non-restartable sequence of results from [`Index::iterate_similar`](crate::Index::iterate_similar).
pub struct SimilarStream<T> {
    results: Receiver<SearchResult<T>>,
    cancel: Option<Sender<()>>,
    producer: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> SimilarStream<T> {
    pub(crate) fn spawn(
        corpus: Arc<Corpus<T>>,
        query: Tokenizer,
        min_score: f64,
        limit: usize,
        buffer: usize,
    ) -> Self {
        let (tx, results) = bounded(buffer);
        let (cancel, cancelled) = bounded::<()>(0);
        let producer = thread::spawn(move || produce(&corpus, &query, min_score, limit, tx, cancelled));
        Self { results, cancel: Some(cancel), producer: Some(producer) }
    }
}

impl<T> SimilarStream<T> {
    /// Stop the producer. Results not yet received are discarded.
    pub fn cancel(&mut self) {
        self.cancel.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl<T> Iterator for SimilarStream<T> {
    type Item = SearchResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_cancelled() {
            return None;
        }
        self.results.recv().ok()
    }
}

impl<T> Drop for SimilarStream<T> {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
    }
}

fn produce<T>(
    corpus: &Corpus<T>,
    query: &Tokenizer,
    min_score: f64,
    limit: usize,
    tx: Sender<SearchResult<T>>,
    cancelled: Receiver<()>,
) {
    let query_set = query.shingles();
    let mut emitted = 0usize;
    let flow = corpus.visit_candidates(query, |entry| {
        if matches!(cancelled.try_recv(), Err(TryRecvError::Disconnected)) {
            trace!(emitted, "similar stream cancelled");
            return ControlFlow::Break(());
        }
        let s = score(&query_set, &entry.shingles);
        let qualifies = s >= min_score;
        if !qualifies {
            return ControlFlow::Continue(());
        }
        let result = SearchResult { score: s, item: Arc::clone(&entry.item) };
        select! {
            send(tx, result) -> sent => if sent.is_err() {
                trace!(emitted, "similar stream consumer gone");
                return ControlFlow::Break(());
            },
            recv(cancelled) -> _ => {
                trace!(emitted, "similar stream cancelled");
                return ControlFlow::Break(());
            }
        }
        emitted += 1;
        if limit > 0 && emitted >= limit {
            trace!(emitted, "similar stream limit reached");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });
    if flow.is_continue() {
        trace!(emitted, "similar stream exhausted");
    }
}

#[cfg(test)]
mod tests {
    use crate::{Index, Item};

    fn index_of(texts: &[&str]) -> Index {
        let mut index = Index::new(3);
        for t in texts {
            index.add_string(*t).unwrap();
        }
        index
    }

    #[test]
    fn yields_in_discovery_order() {
        let index = index_of(&["abcabc", "abc", "aabc"]);
        let got: Vec<String> = index
            .iterate_similar("abc", 0.0, 0)
            .map(|r| r.item.content().to_string())
            .collect();
        assert_eq!(got, vec!["abcabc", "abc", "aabc"]);
    }

    #[test]
    fn limit_caps_results() {
        let index = index_of(&["abc1", "abc2", "abc3", "abc4"]);
        let got: Vec<_> = index.iterate_similar("abc", 0.0, 2).collect();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn cancel_ends_stream() {
        let index = index_of(&["abc1", "abc2", "abc3", "abc4"]);
        let mut stream = index.iterate_similar("abc", 0.0, 0);
        assert!(stream.next().is_some());
        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().is_none());
    }

    #[test]
    fn drop_before_draining_does_not_hang() {
        let index = index_of(&["abc1", "abc2", "abc3"]);
        let mut stream = index.iterate_similar("abc", 0.0, 0);
        let first = stream.next().unwrap();
        assert_eq!(first.score, 0.5);
        drop(stream);
    }

    #[test]
    fn floor_filters_before_emission() {
        let index = index_of(&["abc", "abcabc", "aabc"]);
        let strict: Vec<f64> = index.iterate_similar("abc", 0.9, 0).map(|r| r.score).collect();
        assert_eq!(strict, vec![1.0]);
        assert_eq!(index.iterate_similar("abc", f64::NAN, 0).count(), 0);
    }
}
