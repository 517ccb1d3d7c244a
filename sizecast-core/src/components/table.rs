//! Transition tables: category sequence → ordered multiset of followers.
//!
//! Both the pattern signal (one table per depth) and the Markov signal (one
//! table of order 3) are built on `TransitionTable`. Tables are maintained
//! incrementally as the history grows and shrinks:
//!
//! - `observe_latest` after an append records the window ending just before
//!   the newest outcome, with the newest outcome as its follower.
//! - `forget_oldest` after an eviction removes the window that started at the
//!   evicted outcome. Eviction is FIFO, so that window is always the oldest
//!   occurrence of its key and sits at the front of the follower queue.
//!
//! For every key, the per-category counts sum to the number of occurrences of
//! the key (with a follower) in the current history. `rebuild` computes the
//! same table from scratch.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::domain::{Category, Outcome};
use crate::history::OutcomeHistory;

/// A category sequence packed into bits, oldest category most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey {
    bits: u32,
    len: u8,
}

impl SequenceKey {
    pub const MAX_LEN: usize = 16;

    /// Pack up to `MAX_LEN` categories. Extra categories are ignored.
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        let mut bits = 0u32;
        let mut len = 0u8;
        for c in categories.into_iter().take(Self::MAX_LEN) {
            bits = (bits << 1) | c.index() as u32;
            len += 1;
        }
        Self { bits, len }
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn categories(&self) -> Vec<Category> {
        (0..self.len)
            .rev()
            .map(|shift| {
                if (self.bits >> shift) & 1 == 1 {
                    Category::Big
                } else {
                    Category::Small
                }
            })
            .collect()
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.categories() {
            write!(f, "{}", c.as_char())?;
        }
        Ok(())
    }
}

/// Followers of one key, in the order they were observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowerCounts {
    followers: VecDeque<Category>,
    counts: [u32; 2],
}

impl FollowerCounts {
    fn push(&mut self, follower: Category) {
        self.followers.push_back(follower);
        self.counts[follower.index()] += 1;
    }

    fn pop_oldest(&mut self) -> Option<Category> {
        let follower = self.followers.pop_front()?;
        self.counts[follower.index()] -= 1;
        Some(follower)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn count(&self, category: Category) -> u32 {
        self.counts[category.index()]
    }

    /// Majority follower. On a tie the category that followed first wins.
    pub fn majority(&self) -> Option<(Category, u32)> {
        let first = *self.followers.front()?;
        let other = first.opposite();
        if self.count(other) > self.count(first) {
            Some((other, self.count(other)))
        } else {
            Some((first, self.count(first)))
        }
    }

    /// Majority follower, `None` on an exact tie.
    pub fn strict_majority(&self) -> Option<(Category, u32)> {
        let (small, big) = (self.count(Category::Small), self.count(Category::Big));
        match small.cmp(&big) {
            std::cmp::Ordering::Greater => Some((Category::Small, small)),
            std::cmp::Ordering::Less => Some((Category::Big, big)),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    depth: usize,
    entries: BTreeMap<SequenceKey, FollowerCounts>,
}

impl TransitionTable {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.clamp(1, SequenceKey::MAX_LEN),
            entries: BTreeMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn lookup(&self, key: &SequenceKey) -> Option<&FollowerCounts> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SequenceKey, &FollowerCounts)> + '_ {
        self.entries.iter()
    }

    /// Number of recorded (window, follower) occurrences.
    pub fn total_transitions(&self) -> u64 {
        self.entries.values().map(|f| u64::from(f.total())).sum()
    }

    /// Key formed by the last `depth` categories, if the history is long enough.
    pub fn query_key(&self, history: &OutcomeHistory) -> Option<SequenceKey> {
        if history.len() < self.depth {
            return None;
        }
        let start = history.len() - self.depth;
        Some(SequenceKey::from_categories(
            history.categories().skip(start),
        ))
    }

    /// Record the transition into the newest outcome.
    pub fn observe_latest(&mut self, history: &OutcomeHistory) {
        let len = history.len();
        if len <= self.depth {
            return;
        }
        let start = len - 1 - self.depth;
        let key = SequenceKey::from_categories(history.categories().skip(start).take(self.depth));
        if let Some(follower) = history.last() {
            self.entries.entry(key).or_default().push(follower.category);
        }
    }

    /// Forget the window that started at `evicted`, now gone from `history`.
    pub fn forget_oldest(&mut self, evicted: &Outcome, history: &OutcomeHistory) {
        // The evicted window is `evicted` followed by the first `depth - 1`
        // remaining outcomes; its follower is `history[depth - 1]`.
        let Some(follower) = history.get(self.depth - 1) else {
            return;
        };
        let key = SequenceKey::from_categories(
            std::iter::once(evicted.category)
                .chain(history.categories().take(self.depth - 1)),
        );
        if let Some(counts) = self.entries.get_mut(&key) {
            let popped = counts.pop_oldest();
            debug_assert_eq!(popped, Some(follower.category));
            if counts.total() == 0 {
                self.entries.remove(&key);
            }
        }
    }

    /// Recompute the table from the whole history.
    pub fn rebuild(&mut self, history: &OutcomeHistory) {
        self.entries.clear();
        let categories: Vec<Category> = history.categories().collect();
        for window in categories.windows(self.depth + 1) {
            let key = SequenceKey::from_categories(window[..self.depth].iter().copied());
            self.entries.entry(key).or_default().push(window[self.depth]);
        }
    }
}
