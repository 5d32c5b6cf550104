use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::FromIterator;

///
/// Count of actions per kind (`payment`, `endorsement`, `delegation`, ...).
///
/// Labels absent from the histogram read as zero. Iteration is always
/// in lexicographic label order so that output is reproducible.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionsCount {
    counts: BTreeMap<String, u64>,
}

impl ActionsCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// count of `label`, `0` if it was never seen
    #[inline]
    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    #[inline]
    pub fn increment(&mut self, label: &str) {
        self.add(label, 1);
    }

    pub fn add(&mut self, label: &str, count: u64) {
        if let Some(n) = self.counts.get_mut(label) {
            *n += count;
        } else {
            self.counts.insert(label.to_owned(), count);
        }
    }

    /// add every count of `other` into `self`
    pub fn merge(&mut self, other: &ActionsCount) {
        for (label, count) in other.iter() {
            self.add(label, count);
        }
    }

    /// `(label, count)` pairs sorted by label
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.iter().map(|(l, c)| (l.to_owned(), c)).collect()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.counts.iter(),
        }
    }

    /// sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// number of distinct labels
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, u64>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(l, c)| (l.as_str(), *c))
    }
}

impl<'a> IntoIterator for &'a ActionsCount {
    type Item = (&'a str, u64);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> FromIterator<&'a str> for ActionsCount {
    fn from_iter<T: IntoIterator<Item = &'a str>>(labels: T) -> Self {
        let mut actions = ActionsCount::new();
        for label in labels {
            actions.increment(label);
        }
        actions
    }
}
