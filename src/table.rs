//! Sorted lookup tables.
//!
//! A [`SortedTable`] is an array of `(token, payload)` pairs kept sorted by
//! the token bytes. It backs three separate lookups: color names during
//! parsing, state names during binding, and per-rule keyword tables during
//! execution.
//!
//! ## Gotchas
//!
//! - The sort order is always byte-lexicographic, even for tables that are
//!   queried case-insensitively. The case-insensitive binary search only
//!   agrees with that order when the stored tokens are single-case, so
//!   callers building such a table fold the keys before inserting.
//! - Insertions mark the table unsorted again; `sort()` is idempotent and
//!   cheap to call before a batch of lookups.

use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortedTable<T> {
    entries: Vec<(Box<[u8]>, T)>,
    sorted: bool,
}

impl<T> SortedTable<T> {
    pub fn new() -> Self {
        SortedTable { entries: Vec::new(), sorted: true }
    }

    pub fn push(&mut self, token: &[u8], payload: T) {
        self.entries.push((token.into(), payload));
        self.sorted = false;
    }

    /// Sorts the table by token bytes. Stable, so among duplicate tokens the
    /// first-inserted entry stays first.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.entries.sort_by(|a, b| a.0.cmp(&b.0));
            self.sorted = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binary search for an exact token match.
    pub fn find(&self, token: &[u8]) -> Option<&T> {
        self.search(token, <[u8]>::cmp)
    }

    /// Binary search comparing tokens case-insensitively (ASCII).
    pub fn find_ignore_case(&self, token: &[u8]) -> Option<&T> {
        self.search(token, cmp_ignore_ascii_case)
    }

    fn search(&self, token: &[u8], cmp: impl Fn(&[u8], &[u8]) -> Ordering) -> Option<&T> {
        debug_assert!(self.sorted);

        let mut lo = 0;
        let mut hi = self.entries.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match cmp(&self.entries[mid].0, token) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => {
                    // Duplicate tokens: the first entry in sort order wins.
                    let mut i = mid;
                    while i > 0 && cmp(&self.entries[i - 1].0, token) == Ordering::Equal {
                        i -= 1;
                    }
                    return Some(&self.entries[i].1);
                }
            }
        }

        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &T)> {
        self.entries.iter().map(|(k, v)| (&k[..], v))
    }

    /// Transforms every payload while keeping tokens and order intact.
    pub(crate) fn map<U>(self, mut f: impl FnMut(&[u8], T) -> U) -> SortedTable<U> {
        let entries = self
            .entries
            .into_iter()
            .map(|(k, v)| {
                let u = f(&k, v);
                (k, u)
            })
            .collect();
        SortedTable { entries, sorted: self.sorted }
    }
}

impl<T> Default for SortedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn cmp_ignore_ascii_case(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let x = x.to_ascii_lowercase();
        let y = y.to_ascii_lowercase();
        if x != y {
            return x.cmp(&y);
        }
    }
    a.len().cmp(&b.len())
}
