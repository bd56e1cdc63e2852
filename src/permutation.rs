//! # Permutations
//!
//! This module provides the [`Permutation`] value type used as the vertex
//! label of a bubble-sort network: an ordered sequence of the distinct labels
//! `1..=n`.
//!
//! ## Key Features:
//!
//! - **Construction**:
//!   - Identity permutation: `Permutation::identity(n)`.
//!   - From a label vector: `Permutation::from_labels(vec![...])`.
//! - **Generators**:
//!   - Adjacent transposition: `p.swap(t)` exchanges the 0-indexed positions
//!     `t - 1` and `t`, for `t` in `1..n`.
//! - **Structure**:
//!   - Descents: `p.descents()` (positions `t` with `p[t-1] > p[t]`).
//!   - Inversion count: `p.inversions()`.
//! - **Enumeration**:
//!   - All `n!` permutations in lexicographic order: `Permutation::lexicographic(n)`.
//!
//! A permutation renders as the plain concatenation of its labels, so the
//! identity of size 3 displays as `123`.

use std::{fmt, iter::FusedIterator, ops::Index};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An ordered sequence of the labels `1..=n`.
///
/// # Examples
///
/// ```
/// use bubble_ist::permutation::Permutation;
///
/// let p = Permutation::identity(3);
/// assert_eq!(p.to_string(), "123");
///
/// let q = p.swap(1).unwrap();
/// assert_eq!(q.to_string(), "213");
/// assert_eq!(q.swap(1).unwrap(), p);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permutation {
    labels: Vec<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("Labels {labels:?} are not a permutation of 1..={len}")]
    NotAPermutation { labels: Vec<usize>, len: usize },
}

impl Permutation {
    /// Creates the identity permutation `1 2 .. n`.
    pub fn identity(n: usize) -> Self {
        Permutation {
            labels: (1..=n).collect(),
        }
    }

    /// Creates a permutation from its labels, which must be exactly `1..=n` in some order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bubble_ist::permutation::Permutation;
    /// assert!(Permutation::from_labels(vec![3, 1, 2]).is_ok());
    /// assert!(Permutation::from_labels(vec![0, 1, 2]).is_err());
    /// assert!(Permutation::from_labels(vec![1, 1, 2]).is_err());
    /// ```
    pub fn from_labels(labels: Vec<usize>) -> Result<Self, PermutationError> {
        let len = labels.len();
        let mut seen = vec![false; len];
        for &label in &labels {
            if label == 0 || label > len || std::mem::replace(&mut seen[label - 1], true) {
                return Err(PermutationError::NotAPermutation { labels, len });
            }
        }
        Ok(Permutation { labels })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.labels.iter().enumerate().all(|(i, &l)| l == i + 1)
    }

    /// Applies the generator `t`: exchanges positions `t - 1` and `t`.
    ///
    /// Returns `None` when `t` is not in `1..n`.
    pub fn swap(&self, t: usize) -> Option<Self> {
        if t == 0 || t >= self.labels.len() {
            return None;
        }
        let mut labels = self.labels.clone();
        labels.swap(t - 1, t);
        Some(Permutation { labels })
    }

    /// Whether positions `t - 1` and `t` are out of order.
    pub fn is_descent(&self, t: usize) -> bool {
        t >= 1 && t < self.labels.len() && self.labels[t - 1] > self.labels[t]
    }

    /// Iterates over the generator indices `t` at which the permutation has a descent.
    pub fn descents(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .tuple_windows()
            .positions(|(a, b)| a > b)
            .map(|p| p + 1)
    }

    /// Number of out-of-order label pairs. Zero exactly for the identity.
    pub fn inversions(&self) -> usize {
        self.labels
            .iter()
            .tuple_combinations()
            .filter(|(a, b)| a > b)
            .count()
    }

    /// Enumerates all `n!` permutations of `1..=n` in lexicographic order,
    /// starting at the identity.
    ///
    /// # Examples
    ///
    /// ```
    /// # use bubble_ist::permutation::Permutation;
    /// let all: Vec<String> = Permutation::lexicographic(3).map(|p| p.to_string()).collect();
    /// assert_eq!(all, ["123", "132", "213", "231", "312", "321"]);
    /// ```
    pub fn lexicographic(n: usize) -> Lexicographic {
        Lexicographic {
            next: Some(Permutation::identity(n)),
        }
    }

    /// Rearranges into the lexicographic successor. Returns `false` (leaving the
    /// labels untouched) when this is already the last permutation.
    fn advance(&mut self) -> bool {
        let labels = &mut self.labels;
        let Some(pivot) = (1..labels.len()).rev().find(|&i| labels[i - 1] < labels[i]) else {
            return false;
        };
        let pivot = pivot - 1;
        let successor = (pivot + 1..labels.len())
            .rev()
            .find(|&j| labels[j] > labels[pivot])
            .unwrap_or(pivot + 1);
        labels.swap(pivot, successor);
        labels[pivot + 1..].reverse();
        true
    }
}

/// `n!`, or `None` on overflow.
pub fn factorial(n: usize) -> Option<usize> {
    (1..=n).try_fold(1usize, |acc, k| acc.checked_mul(k))
}

impl Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.labels[index]
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

/// Iterator returned by [`Permutation::lexicographic`].
#[derive(Debug, Clone)]
pub struct Lexicographic {
    next: Option<Permutation>,
}

impl Iterator for Lexicographic {
    type Item = Permutation;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut successor = current.clone();
        if successor.advance() {
            self.next = Some(successor);
        }
        Some(current)
    }
}

impl FusedIterator for Lexicographic {}
