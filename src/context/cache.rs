//! Two-tier context cache.
//!
//! Contexts that have produced a 2xx response live in the `validated` list;
//! contexts gathered from the user but not yet confirmed live in `reserve`.
//! Both lists are ordered by insertion, which is also preference order, and
//! never hold the same context twice.
//!
//! Lists are copy-on-write: readers take an `Arc` snapshot and never block
//! writers for longer than a pointer swap. Expired entries are dropped by
//! an explicit [`ContextList::purge`], which every read path calls first.

use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use url::Url;

use super::AuthContext;
use crate::challenge::Challenge;

/// Concurrent, ordered, duplicate-free list of contexts.
#[derive(Debug, Default)]
pub struct ContextList {
    entries: RwLock<Arc<Vec<AuthContext>>>,
}

impl ContextList {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Arc<Vec<AuthContext>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the list with `update(current)` if it returns `Some`.
    fn modify<F>(&self, update: F) -> bool
    where
        F: FnOnce(&[AuthContext]) -> Option<Vec<AuthContext>>,
    {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match update(&guard) {
            Some(next) => {
                *guard = Arc::new(next);
                true
            }
            None => false,
        }
    }

    /// Removes expired contexts, returning how many were dropped.
    ///
    /// Idempotent: a second call removes nothing new unless another entry
    /// expired in between.
    pub fn purge(&self) -> usize {
        let mut removed = 0;
        self.modify(|entries| {
            let kept: Vec<AuthContext> = entries.iter().filter(|c| !c.is_expired()).cloned().collect();
            removed = entries.len() - kept.len();
            (removed > 0).then_some(kept)
        });
        if removed > 0 {
            debug!("Purged {removed} expired authentication context(s)");
        }
        removed
    }

    /// Purges, then returns a stable view of the current entries.
    pub fn snapshot(&self) -> Arc<Vec<AuthContext>> {
        self.purge();
        self.current()
    }

    /// Appends `context` unless already present. Returns true if added.
    pub fn add(&self, context: &AuthContext) -> bool {
        self.modify(|entries| {
            if entries.contains(context) {
                return None;
            }
            let mut next = entries.to_vec();
            next.push(context.clone());
            Some(next)
        })
    }

    /// Removes `context` if present. Returns true if removed.
    pub fn remove(&self, context: &AuthContext) -> bool {
        self.remove_where(|c| c == context) > 0
    }

    /// Removes every context matching `predicate`, returning how many.
    pub fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&AuthContext) -> bool,
    {
        let mut removed = 0;
        self.modify(|entries| {
            let kept: Vec<AuthContext> = entries.iter().filter(|c| !predicate(*c)).cloned().collect();
            removed = entries.len() - kept.len();
            (removed > 0).then_some(kept)
        });
        removed
    }

    pub fn contains(&self, context: &AuthContext) -> bool {
        self.current().contains(context)
    }

    pub fn clear(&self) {
        self.modify(|entries| (!entries.is_empty()).then(Vec::new));
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The `validated` and `reserve` context lists.
#[derive(Debug, Default)]
pub struct ContextCache {
    validated: ContextList,
    reserve: ContextList,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexts that have produced a successful response.
    pub fn validated(&self) -> &ContextList {
        &self.validated
    }

    /// Contexts gathered but not yet confirmed.
    pub fn reserve(&self) -> &ContextList {
        &self.reserve
    }

    /// Purges expired entries from both lists.
    pub fn purge(&self) -> usize {
        self.validated.purge() + self.reserve.purge()
    }

    fn find<P>(&self, predicate: P) -> Option<AuthContext>
    where
        P: Fn(&AuthContext) -> bool,
    {
        self.purge();
        let validated = self.validated.current();
        let reserve = self.reserve.current();
        validated.iter().chain(reserve.iter()).find(|c| predicate(*c)).cloned()
    }

    /// First context, validated before reserve, whose URL domain covers `url`.
    pub fn find_url_context(&self, url: &Url) -> Option<AuthContext> {
        self.find(|c| c.is_url_domain(url))
    }

    /// First context, validated before reserve, that answers any of
    /// `challenges` received from `url`.
    pub fn find_challenge_context(&self, challenges: &[Challenge], url: &Url) -> Option<AuthContext> {
        if challenges.is_empty() {
            return None;
        }
        self.find(|c| challenges.iter().any(|ch| c.is_challenge_domain(ch, url)))
    }

    /// Adds an unconfirmed context to `reserve`.
    pub fn add_reserve(&self, context: &AuthContext) -> bool {
        self.reserve.add(context)
    }

    /// Moves `context` from `reserve` to `validated`.
    ///
    /// An anonymous context recorded for the same scheme and protection
    /// space is dropped, since that space is now authenticated.
    pub fn promote(&self, context: &AuthContext) {
        self.reserve.remove(context);
        if context.has_credentials() {
            let superseded = |c: &AuthContext| {
                !c.has_credentials()
                    && c.scheme() == context.scheme()
                    && c.protection_space() == context.protection_space()
            };
            self.validated.remove_where(superseded);
            self.reserve.remove_where(superseded);
        }
        if self.validated.add(context) {
            debug!("Validated authentication context {context}");
        }
    }

    /// Removes `context` from both lists.
    pub fn evict(&self, context: &AuthContext) -> bool {
        let from_validated = self.validated.remove(context);
        let from_reserve = self.reserve.remove(context);
        from_validated || from_reserve
    }

    /// Removes from both lists every context answering one of `challenges`
    /// received from `url`. Returns how many were removed.
    pub fn evict_matching(&self, challenges: &[Challenge], url: &Url) -> usize {
        let matches = |c: &AuthContext| challenges.iter().any(|ch| c.is_challenge_domain(ch, url));
        self.validated.remove_where(matches) + self.reserve.remove_where(matches)
    }

    /// Records a deliberately anonymous context in `validated`, replacing
    /// any earlier anonymous context for the same scheme and protection
    /// space.
    pub fn put_anonymous(&self, context: &AuthContext) {
        let same_space = |c: &AuthContext| {
            !c.has_credentials()
                && c != context
                && c.scheme() == context.scheme()
                && c.protection_space() == context.protection_space()
        };
        self.validated.remove_where(same_space);
        self.reserve.remove_where(same_space);
        self.validated.add(context);
    }

    /// Drops every cached context.
    pub fn clear(&self) {
        self.validated.clear();
        self.reserve.clear();
    }
}
