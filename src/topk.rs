//! Top-K selection for ranked statistics
//!
//! **Problem**: ranking a tally with a full sort is O(N log N) and, for
//! floating-point keys, gives no guarantee about how ties are ordered.
//!
//! **Solution**: heap-based Top-K selection, O(N log K), where ties are always
//! broken by insertion index. An entry that was encountered first wins a tie,
//! in both sort orders.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::Error;

/// Sort order for Top-K selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (smallest K values)
    Ascending,
    /// Descending order (largest K values)
    Descending,
}

/// Trait for Top-K selection on `(key, value)` tallies
pub trait TopKSelection: Sized {
    /// Keep the best `k` entries, best first.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `k` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use labtrack::topk::{SortOrder, TopKSelection};
    ///
    /// let tally = vec![("a", 2), ("b", 5), ("c", 5), ("d", 1)];
    /// let top = tally.top_k(2, SortOrder::Descending)?;
    /// assert_eq!(top, vec![("b", 5), ("c", 5)]);
    /// # Ok::<(), labtrack::Error>(())
    /// ```
    fn top_k(self, k: usize, order: SortOrder) -> crate::Result<Self>;
}

impl<K, V: PartialOrd + Copy> TopKSelection for Vec<(K, V)> {
    fn top_k(self, k: usize, order: SortOrder) -> crate::Result<Self> {
        select_top_k(self, k, order)
    }
}

/// Select the best `k` entries of `entries`, best first.
///
/// Time complexity: O(N log K); space: O(K) for the heap.
///
/// # Errors
/// Returns `Error::InvalidInput` if `k` is zero.
pub fn select_top_k<K, V: PartialOrd + Copy>(
    entries: Vec<(K, V)>,
    k: usize,
    order: SortOrder,
) -> crate::Result<Vec<(K, V)>> {
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }

    let indices = match order {
        SortOrder::Descending => select_indices(&entries, k, |value, index| MinHeapItem { value, index }),
        SortOrder::Ascending => select_indices(&entries, k, |value, index| MaxHeapItem { value, index }),
    };

    let mut slots: Vec<Option<(K, V)>> = entries.into_iter().map(Some).collect();
    Ok(indices
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

/// Bounded heap scan. The heap top is always the worst retained entry.
fn select_indices<K, V, H>(entries: &[(K, V)], k: usize, item: impl Fn(V, usize) -> H) -> Vec<usize>
where
    V: Copy,
    H: Ord + Indexed,
{
    let mut heap: BinaryHeap<H> = BinaryHeap::with_capacity(k.min(entries.len()));

    for (index, (_, value)) in entries.iter().enumerate() {
        let candidate = item(*value, index);
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            // Later entries never displace an equal one: first encountered wins.
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|item| item.index())
        .collect()
}

trait Indexed {
    fn index(&self) -> usize;
}

// Heap item for descending order: "greater" means worse (smaller value, then later index)
#[derive(Debug)]
struct MinHeapItem<V> {
    value: V,
    index: usize,
}

impl<V: PartialOrd> PartialEq for MinHeapItem<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: PartialOrd> Eq for MinHeapItem<V> {}

impl<V: PartialOrd> Ord for MinHeapItem<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .partial_cmp(&self.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl<V: PartialOrd> PartialOrd for MinHeapItem<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Indexed for MinHeapItem<V> {
    fn index(&self) -> usize {
        self.index
    }
}

// Heap item for ascending order: "greater" means worse (larger value, then later index)
#[derive(Debug)]
struct MaxHeapItem<V> {
    value: V,
    index: usize,
}

impl<V: PartialOrd> PartialEq for MaxHeapItem<V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V: PartialOrd> Eq for MaxHeapItem<V> {}

impl<V: PartialOrd> Ord for MaxHeapItem<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .partial_cmp(&other.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl<V: PartialOrd> PartialOrd for MaxHeapItem<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Indexed for MaxHeapItem<V> {
    fn index(&self) -> usize {
        self.index
    }
}
