use std::cmp::Ordering;

/// Competition ranks over an already sorted sequence.
///
/// The first row gets rank 1. Each later row gets its 1-based position when its key differs
/// from the previous row's key, otherwise it shares the previous rank: keys `[9, 9, 7, 5, 5, 2]`
/// rank as `[1, 1, 3, 4, 4, 6]`.
pub fn assign_ranks<T, K, F>(sorted: &[T], key: F) -> Vec<u32>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut ranks = Vec::with_capacity(sorted.len());
    let mut prev: Option<(K, u32)> = None;
    for (idx, item) in sorted.iter().enumerate() {
        let k = key(item);
        let position = (idx + 1) as u32;
        let rank = match &prev {
            Some((pk, pr)) if *pk == k => *pr,
            _ => position,
        };
        ranks.push(rank);
        prev = Some((k, rank));
    }
    ranks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

type Pass<'a, T> = Box<dyn Fn(&T, &T) -> Ordering + 'a>;

/// Multi-key ranking built from stable single-key passes.
///
/// Keys are declared most significant first. `sort` runs the passes in reverse, least
/// significant first, so every pass keeps the order left by the previous ones among its ties.
/// Rows equal on every key keep their incoming order.
pub struct StackedStableSort<'a, T> {
    passes: Vec<Pass<'a, T>>,
}

impl<'a, T> Default for StackedStableSort<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> StackedStableSort<'a, T> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a key less significant than every key added before it.
    pub fn then_by<F>(mut self, cmp: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + 'a,
    {
        self.passes.push(Box::new(cmp));
        self
    }

    pub fn then_by_key<K, F>(self, key: F, direction: SortDirection) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + 'a,
    {
        self.then_by(move |a, b| direction.apply(key(a).cmp(&key(b))))
    }

    pub fn then_by_f64<F>(self, key: F, direction: SortDirection) -> Self
    where
        F: Fn(&T) -> f64 + 'a,
    {
        self.then_by(move |a, b| direction.apply(key(a).total_cmp(&key(b))))
    }

    pub fn sort(&self, items: &mut [T]) {
        for pass in self.passes.iter().rev() {
            items.sort_by(|a, b| pass(a, b));
        }
    }
}
