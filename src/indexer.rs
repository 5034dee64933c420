//! Value deduplication with stable integer identities.
//!
//! An [`Indexer`] hands out the position of the first structurally equal value
//! it has seen. Equality goes through an explicit [`CanonicalKey`] so that
//! float payloads hash by value without any string formatting.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::math::Vec3;

/// Produces the hashable key under which structurally equal values collide.
pub trait CanonicalKey {
    type Key: Eq + Hash + Clone + Debug;

    fn canonical_key(&self) -> Self::Key;
}

macro_rules! identity_key {
    ($($t:ty),*) => {
        $(
            impl CanonicalKey for $t {
                type Key = $t;

                fn canonical_key(&self) -> $t {
                    *self
                }
            }
        )*
    };
}

identity_key!(u16, u32, u64, usize, i32, [u32; 2], [u32; 3], (u32, u32));

/// Bit pattern of a float with `-0.0` folded onto `0.0`.
fn float_bits(v: f32) -> u32 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl CanonicalKey for Vec3 {
    type Key = [u32; 3];

    fn canonical_key(&self) -> [u32; 3] {
        [float_bits(self.x), float_bits(self.y), float_bits(self.z)]
    }
}

impl<const N: usize> CanonicalKey for [f32; N] {
    type Key = [u32; N];

    fn canonical_key(&self) -> [u32; N] {
        (*self).map(float_bits)
    }
}

/// An undirected mesh edge stored as `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge(u32, u32);

impl Edge {
    pub fn undirected(a: u32, b: u32) -> Self {
        Edge(a.min(b), a.max(b))
    }

    /// Smaller vertex index.
    pub fn low(self) -> u32 {
        self.0
    }

    pub fn high(self) -> u32 {
        self.1
    }

    pub fn to_array(self) -> [u32; 2] {
        [self.0, self.1]
    }
}

impl CanonicalKey for Edge {
    type Key = Edge;

    fn canonical_key(&self) -> Edge {
        *self
    }
}

/// Ordered set of unique values with O(1) amortized lookup.
#[derive(Debug, Clone)]
pub struct Indexer<T: CanonicalKey> {
    unique: Vec<T>,
    map: HashMap<T::Key, usize>,
}

impl<T: CanonicalKey> Default for Indexer<T> {
    fn default() -> Self {
        Self {
            unique: Vec::new(),
            map: HashMap::new(),
        }
    }
}

impl<T: CanonicalKey> Indexer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `value`, appending it if no equal value was added
    /// before.
    pub fn add(&mut self, value: T) -> usize {
        let next = self.unique.len();
        let index = *self.map.entry(value.canonical_key()).or_insert(next);
        if index == next {
            self.unique.push(value);
        }
        index
    }

    /// First-inserted representative of every distinct key, in insertion order.
    pub fn unique(&self) -> &[T] {
        &self.unique
    }

    pub fn into_unique(self) -> Vec<T> {
        self.unique
    }

    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_share_an_index() {
        let mut indexer = Indexer::new();
        assert_eq!(indexer.add([1u32, 2, 3]), 0);
        assert_eq!(indexer.add([4u32, 5, 6]), 1);
        assert_eq!(indexer.add([1u32, 2, 3]), 0);
        assert_eq!(indexer.len(), 2);
    }

    #[test]
    fn key_is_order_sensitive() {
        let mut indexer = Indexer::new();
        let a = indexer.add((1u32, 2u32));
        let b = indexer.add((2u32, 1u32));
        assert_ne!(a, b);
    }

    #[test]
    fn undirected_edges_collapse() {
        let mut indexer = Indexer::new();
        let a = indexer.add(Edge::undirected(2, 5));
        let b = indexer.add(Edge::undirected(5, 2));
        assert_eq!(a, b);
        assert_eq!(indexer.unique(), &[Edge::undirected(2, 5)]);
        assert_eq!((indexer.unique()[0].low(), indexer.unique()[0].high()), (2, 5));
    }

    #[test]
    fn float_keys_fold_signed_zero() {
        let mut indexer = Indexer::new();
        let a = indexer.add(Vec3::new(0.0, 1.0, 2.0));
        let b = indexer.add(Vec3::new(-0.0, 1.0, 2.0));
        let c = indexer.add(Vec3::new(0.0, 1.0, 2.5));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(indexer.len(), 2);
    }

    #[test]
    fn first_inserted_value_is_kept() {
        let mut indexer = Indexer::new();
        indexer.add([0.0f32, 0.0]);
        indexer.add([-0.0f32, 0.0]);
        let unique = indexer.into_unique();
        assert_eq!(unique.len(), 1);
        assert!(unique[0][0].is_sign_positive());
    }
}
