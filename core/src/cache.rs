use crate::{literal::Evaluation, node::NodeId};
use std::{cell::RefCell, collections::HashMap};

/// 128-bit content digest used to key the cache and to detect progress
/// between iterations.
#[must_use]
pub fn fingerprint(text: &str) -> u128 {
    u128::from_be_bytes(md5::compute(text.as_bytes()).0)
}

/// One generation of memoised work for a single script. Context collections
/// are stored under both "node-id + content-hash" and "content-hash only"
/// keys; sandbox evaluations under the fragment's content hash.
#[derive(Default)]
pub struct Bucket {
    contexts: HashMap<String, Vec<NodeId>>,
    evals: HashMap<u128, Evaluation>,
}

impl Bucket {
    #[must_use]
    pub fn context(&self, key: &str) -> Option<&Vec<NodeId>> {
        self.contexts.get(key)
    }

    pub fn store_context(&mut self, key: String, nodes: Vec<NodeId>) {
        self.contexts.insert(key, nodes);
    }

    #[must_use]
    pub fn eval(&self, key: u128) -> Option<&Evaluation> {
        self.evals.get(&key)
    }

    pub fn store_eval(&mut self, key: u128, evaluation: Evaluation) {
        self.evals.insert(key, evaluation);
    }

    fn clear(&mut self) {
        self.contexts.clear();
        self.evals.clear();
    }
}

struct State {
    key: Option<u128>,
    keyed: Bucket,
    unkeyed: Bucket,
}

thread_local! {
    static CACHE: RefCell<State> = RefCell::new(State {
        key: None,
        keyed: Bucket::default(),
        unkeyed: Bucket::default(),
    });
}

/// Runs `f` against the bucket for `key`. The cache holds a single
/// generation: a key different from the previous call drops the prior
/// bucket first. `None` addresses a distinguished no-hash slot that other
/// keys never invalidate.
pub fn with_bucket<R>(key: Option<u128>, f: impl FnOnce(&mut Bucket) -> R) -> R {
    CACHE.with(|cache| {
        let mut state = cache.borrow_mut();
        match key {
            None => f(&mut state.unkeyed),
            Some(key) => {
                if state.key != Some(key) {
                    state.keyed.clear();
                    state.key = Some(key);
                }
                f(&mut state.keyed)
            }
        }
    })
}

/// Empties the current generation without forgetting its key.
pub fn flush() {
    CACHE.with(|cache| cache.borrow_mut().keyed.clear());
}

#[cfg(test)]
mod tests {
    use super::{fingerprint, flush, with_bucket};
    use crate::literal::{Evaluation, LitNode};

    #[test]
    fn fingerprints_are_stable_and_content_derived() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn same_key_returns_the_same_bucket() {
        let key = Some(fingerprint("same-key"));
        with_bucket(key, |bucket| bucket.store_context("k".to_owned(), vec![1, 2]));
        let hit = with_bucket(key, |bucket| bucket.context("k").cloned());
        assert_eq!(hit, Some(vec![1, 2]));
    }

    #[test]
    fn a_different_key_invalidates_the_previous_bucket() {
        let first = Some(fingerprint("first"));
        let second = Some(fingerprint("second"));
        with_bucket(first, |bucket| bucket.store_context("k".to_owned(), vec![1]));
        with_bucket(second, |_| {});
        let hit = with_bucket(first, |bucket| bucket.context("k").cloned());
        assert_eq!(hit, None);
    }

    #[test]
    fn the_no_hash_slot_survives_keyed_turnover() {
        with_bucket(None, |bucket| {
            bucket.store_eval(7, Evaluation::Value(LitNode::Null));
        });
        with_bucket(Some(fingerprint("x")), |_| {});
        with_bucket(Some(fingerprint("y")), |_| {});
        let hit = with_bucket(None, |bucket| bucket.eval(7).cloned());
        assert_eq!(hit, Some(Evaluation::Value(LitNode::Null)));
    }

    #[test]
    fn flush_empties_but_keeps_the_key() {
        let key = Some(fingerprint("flushed"));
        with_bucket(key, |bucket| bucket.store_context("k".to_owned(), vec![3]));
        flush();
        let hit = with_bucket(key, |bucket| bucket.context("k").cloned());
        assert_eq!(hit, None);
    }
}
