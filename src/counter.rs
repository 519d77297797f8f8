use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::ops::{Add, Index, Sub};

use indexmap::IndexMap;
use log::trace;

/// Occurrence count. Signed so explicit decrements may go below zero.
/// Arithmetic on counts saturates at the `i64` bounds.
pub type Count = i64;

static ZERO: Count = 0;

/// Multiset that maps each key to a signed count.
///
/// Keys that were never stored read as 0. Entries remember the order in which
/// their key was first inserted, which is also the tie-break order of
/// [`Counter::most_common`].
#[derive(Debug, Clone)]
pub struct Counter<T> {
    counts: IndexMap<T, Count>,
}

impl<T> Default for Counter<T> {
    fn default() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }
}

impl<T: Hash + Eq> Counter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every occurrence of every key in `keys`.
    pub fn from_keys<I: IntoIterator<Item = T>>(keys: I) -> Self {
        let mut counter = Self::new();
        counter.update(keys);
        counter
    }

    /// Takes the given counts as they are, zero and negative ones included.
    /// A repeated key keeps its last count.
    pub fn from_counts<I: IntoIterator<Item = (T, Count)>>(counts: I) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }

    /// Stored count for `key`, or 0 if it was never stored.
    pub fn get<Q>(&self, key: &Q) -> Count
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.contains_key(key)
    }

    /// Adds `delta` to the count of `key`, creating the entry at 0 first.
    /// The result stays stored even when it is zero or negative.
    pub fn increment(&mut self, key: T, delta: Count) {
        let count = self.counts.entry(key).or_insert(0);
        *count = count.saturating_add(delta);
    }

    pub fn insert(&mut self, key: T) {
        self.increment(key, 1);
    }

    /// Removes the entry for `key` and returns its count.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Count>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.counts.shift_remove(key)
    }

    pub fn update<I: IntoIterator<Item = T>>(&mut self, keys: I) {
        for key in keys {
            self.insert(key);
        }
    }

    /// Adds each count to the existing one instead of replacing it.
    pub fn update_counts<I: IntoIterator<Item = (T, Count)>>(&mut self, counts: I) {
        for (key, delta) in counts {
            self.increment(key, delta);
        }
    }

    /// In-place subtraction. Unlike `-`, results at or below zero are kept.
    pub fn subtract_counts<I: IntoIterator<Item = (T, Count)>>(&mut self, counts: I) {
        for (key, delta) in counts {
            self.increment(key, delta.saturating_neg());
        }
    }

    pub fn merge(&mut self, other: &Self)
    where
        T: Clone,
    {
        self.update_counts(other.iter().map(|(key, count)| (key.clone(), count)));
    }

    /// Entries sorted by count, highest first, limited to `n` when given.
    /// Equal counts stay in first-insertion order.
    pub fn most_common(&self, n: Option<usize>) -> Vec<(&T, Count)> {
        let mut ranked: Vec<(&T, Count)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(n) = n {
            ranked.truncate(n);
        }
        ranked
    }

    /// Every key repeated as many times as its count. Keys with a count of
    /// zero or less are skipped.
    pub fn elements(&self) -> impl Iterator<Item = &T> + '_ {
        self.counts.iter().flat_map(|(key, &count)| {
            let times = if count > 0 {
                usize::try_from(count).unwrap_or(usize::MAX)
            } else {
                0
            };
            std::iter::repeat(key).take(times)
        })
    }

    pub fn total(&self) -> Count {
        self.counts
            .values()
            .fold(0, |sum: Count, &count| sum.saturating_add(count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, Count)> + '_ {
        self.counts.iter().map(|(key, &count)| (key, count))
    }

    pub fn keys(&self) -> impl Iterator<Item = &T> + '_ {
        self.counts.keys()
    }
}

/// Stored zeros compare equal to missing keys.
impl<T: Hash + Eq> PartialEq for Counter<T> {
    fn eq(&self, other: &Self) -> bool {
        let covers = |a: &Self, b: &Self| a.iter().all(|(key, count)| b.get(key) == count);
        covers(self, other) && covers(other, self)
    }
}

impl<T: Hash + Eq> Eq for Counter<T> {}

impl<T: Hash + Eq> FromIterator<T> for Counter<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_keys(iter)
    }
}

impl<T: Hash + Eq> Extend<T> for Counter<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.update(iter);
    }
}

impl<T, Q> Index<&Q> for Counter<T>
where
    T: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    type Output = Count;

    fn index(&self, key: &Q) -> &Count {
        self.counts.get(key).unwrap_or(&ZERO)
    }
}

/// Sum over the union of keys. Nothing is dropped, not even zero sums.
impl<T: Hash + Eq + Clone> Add<&Counter<T>> for &Counter<T> {
    type Output = Counter<T>;

    fn add(self, rhs: &Counter<T>) -> Counter<T> {
        let mut sum = self.clone();
        sum.merge(rhs);
        sum
    }
}

impl<T: Hash + Eq + Clone> Add for Counter<T> {
    type Output = Counter<T>;

    fn add(self, rhs: Counter<T>) -> Counter<T> {
        &self + &rhs
    }
}

/// Difference that only keeps positive results.
impl<T: Hash + Eq + Clone> Sub<&Counter<T>> for &Counter<T> {
    type Output = Counter<T>;

    fn sub(self, rhs: &Counter<T>) -> Counter<T> {
        let mut difference = Counter::new();
        let keys = self
            .counts
            .keys()
            .chain(rhs.counts.keys().filter(|key| !self.counts.contains_key(*key)));
        for key in keys {
            let remaining = self.get(key).saturating_sub(rhs.get(key));
            if remaining > 0 {
                difference.counts.insert(key.clone(), remaining);
            } else {
                trace!("subtract: dropped entry left at {remaining}");
            }
        }
        difference
    }
}

impl<T: Hash + Eq + Clone> Sub for Counter<T> {
    type Output = Counter<T>;

    fn sub(self, rhs: Counter<T>) -> Counter<T> {
        &self - &rhs
    }
}

impl<T: Hash + Eq + fmt::Debug> fmt::Display for Counter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Counter()");
        }
        f.write_str("Counter({")?;
        for (i, (key, count)) in self.most_common(None).into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key:?}: {count}")?;
        }
        f.write_str("})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn counts_occurrences() {
        init();
        let counter: Counter<char> = "abracadabra".chars().collect();
        assert_eq!(counter[&'a'], 5);
        assert_eq!(counter[&'b'], 2);
        assert_eq!(counter[&'r'], 2);
        assert_eq!(counter[&'c'], 1);
        assert_eq!(counter[&'d'], 1);
        assert_eq!(counter.len(), 5);
        assert_eq!(counter.total(), 11);
    }

    #[test]
    fn missing_key_reads_zero() {
        let counter = Counter::from_keys(["x"]);
        assert_eq!(counter["nope"], 0);
        assert_eq!(counter.get("nope"), 0);
        assert!(!counter.contains_key("nope"));
    }

    #[test]
    fn from_counts_keeps_non_positive_entries() {
        let counter = Counter::from_counts([("a", 0), ("b", -3), ("c", 2)]);
        assert_eq!(counter.len(), 3);
        assert!(counter.contains_key("a"));
        assert_eq!(counter["b"], -3);
    }

    #[test]
    fn update_with_counts_adds() {
        let mut counter = Counter::from_counts([("a", 2)]);
        counter.update_counts([("a", 3), ("b", 1)]);
        assert_eq!(counter["a"], 5);
        assert_eq!(counter["b"], 1);

        counter.extend(["b", "b"]);
        assert_eq!(counter["b"], 3);
    }

    #[test]
    fn increment_below_zero_stays_visible() {
        let mut counter = Counter::from_counts([("a", 2)]);
        counter.increment("a", -10);
        assert_eq!(counter["a"], -8);
        assert!(counter.contains_key("a"));

        counter.subtract_counts([("b", 1)]);
        assert_eq!(counter["b"], -1);
    }

    #[test]
    fn increment_saturates() {
        let mut counter = Counter::from_counts([("a", Count::MAX)]);
        counter.insert("a");
        assert_eq!(counter["a"], Count::MAX);
    }

    #[test]
    fn most_common_breaks_ties_by_insertion() {
        let counter = Counter::from_keys(["c", "a", "b", "a", "b", "d"]);
        assert_eq!(
            counter.most_common(None),
            vec![(&"a", 2), (&"b", 2), (&"c", 1), (&"d", 1)]
        );
        assert_eq!(counter.most_common(Some(3)), vec![(&"a", 2), (&"b", 2), (&"c", 1)]);
        assert!(counter.most_common(Some(0)).is_empty());
        assert_eq!(counter.most_common(Some(99)).len(), 4);
    }

    #[test]
    fn add_keeps_zero_sums() {
        let a = Counter::from_counts([("x", 1), ("y", 2)]);
        let b = Counter::from_counts([("x", -1), ("z", 4)]);
        let sum = &a + &b;
        assert_eq!(sum, Counter::from_counts([("x", 0), ("y", 2), ("z", 4)]));
        assert!(sum.contains_key("x"));
        // operands are untouched
        assert_eq!(a["x"], 1);
        assert_eq!(b["z"], 4);
    }

    #[test]
    fn subtract_drops_non_positive() {
        let a = Counter::from_counts([("a", 1), ("b", 1)]);
        assert_eq!(
            &a - &Counter::from_counts([("a", 2), ("d", 1)]),
            Counter::from_counts([("b", 1)])
        );
        assert!((&a - &Counter::from_counts([("a", 1), ("b", 3)])).is_empty());
        assert_eq!(&a - &Counter::from_counts([("c", 1), ("d", 1)]), a);
    }

    #[test]
    fn subtract_negative_foreign_count() {
        let a = Counter::from_counts([("a", 3)]);
        let b = Counter::from_counts([("a", 1), ("n", -2)]);
        assert_eq!(a - b, Counter::from_counts([("a", 2), ("n", 2)]));
    }

    #[test]
    fn elements_skip_non_positive() {
        let mut counter = Counter::from_counts([("a", 2), ("b", 3)]);
        counter.increment("a", -10);
        let first: Vec<_> = counter.elements().copied().collect();
        assert_eq!(first, vec!["b", "b", "b"]);
        // can be walked again
        assert_eq!(counter.elements().count(), 3);
    }

    #[test]
    fn remove_deletes_entry() {
        let mut counter = Counter::from_keys(["a", "b", "a"]);
        assert_eq!(counter.remove("a"), Some(2));
        assert_eq!(counter.remove("a"), None);
        assert_eq!(counter.keys().collect::<Vec<_>>(), vec![&"b"]);
    }

    #[test]
    fn display_in_rank_order() {
        let counter = Counter::from_keys(["x", "y", "y"]);
        assert_eq!(counter.to_string(), r#"Counter({"y": 2, "x": 1})"#);
        assert_eq!(Counter::<u8>::new().to_string(), "Counter()");
    }

    #[test]
    fn equality_ignores_order() {
        let a = Counter::from_counts([("a", 1), ("b", 2)]);
        let b = Counter::from_counts([("b", 2), ("a", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_treats_zero_as_missing() {
        assert_eq!(Counter::from_counts([("a", 0)]), Counter::new());
        assert_eq!(
            Counter::from_counts([("a", 1), ("b", 0)]),
            Counter::from_counts([("a", 1), ("c", 0)])
        );
        assert_ne!(Counter::from_counts([("a", -1)]), Counter::new());
        assert_ne!(Counter::from_keys(["a"]), Counter::from_keys(["a", "a"]));
    }
}
