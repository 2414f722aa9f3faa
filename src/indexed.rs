// Copyright (C) 2022-2023 Richard Lincoln

// Indexed vector
//
// A vector of length `capacity` stored as a full dense array plus the list of
// positions that currently hold a nonzero. In unpacked mode `elements[i]` is
// the value at position `i` and every position not in `indices` is zero. In
// packed mode `elements[k]` is the value belonging to `indices[k]` and the
// positions `count..capacity` are zero.
//
// Values with magnitude below TINY_ELEMENT are treated as structural zeros:
// whenever a merge produces one, the slot is zeroed and the index dropped.

use crate::FactorError;
use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Sub, SubAssign};

/// Magnitude below which a value is not stored at all.
pub const TINY_ELEMENT: f64 = 1.0e-50;

#[derive(Debug, Clone, Default)]
pub struct IndexedVector {
    indices: Vec<usize>,
    elements: Vec<f64>,
    packed: bool,
}

impl IndexedVector {
    /// Creates an empty unpacked vector of length `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            elements: vec![0.0; capacity],
            packed: false,
        }
    }

    /// Builds a vector from `(indices, values)` pairs. Values below
    /// [`TINY_ELEMENT`] are skipped. The capacity is raised to cover the
    /// largest index.
    pub fn from_sparse(
        capacity: usize,
        indices: &[usize],
        values: &[f64],
    ) -> Result<Self, FactorError> {
        if indices.len() != values.len() {
            return Err(FactorError::DimensionMismatch {
                what: "values",
                expected: indices.len(),
                found: values.len(),
            });
        }
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(FactorError::DuplicateIndex(w[0]));
        }
        let capacity = sorted.last().map_or(capacity, |&i| capacity.max(i + 1));

        let mut v = Self::new(capacity);
        for (&i, &x) in indices.iter().zip(values) {
            if x.abs() >= TINY_ELEMENT {
                v.elements[i] = x;
                v.indices.push(i);
            }
        }
        Ok(v)
    }

    /// Builds a vector holding the nonzeros of a dense array.
    pub fn from_dense(values: &[f64]) -> Self {
        let mut v = Self::new(values.len());
        for (i, &x) in values.iter().enumerate() {
            if x.abs() >= TINY_ELEMENT {
                v.elements[i] = x;
                v.indices.push(i);
            }
        }
        v
    }

    /// Length of the dense backing array.
    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// Number of stored nonzeros.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The dense backing array. In packed mode only the first `len()` slots
    /// are meaningful.
    pub fn dense(&self) -> &[f64] {
        &self.elements
    }

    /// Direct write access to the dense array. The index list is not
    /// maintained; call [`scan`](Self::scan) afterwards.
    pub fn dense_mut(&mut self) -> &mut [f64] {
        &mut self.elements
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<usize>, &mut [f64]) {
        (&mut self.indices, &mut self.elements)
    }

    /// Value at position `i` of an unpacked vector, zero beyond capacity.
    pub fn get(&self, i: usize) -> f64 {
        debug_assert!(!self.packed);
        self.elements.get(i).copied().unwrap_or(0.0)
    }

    /// `(index, value)` pairs in index list order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().enumerate().map(move |(k, &i)| {
            if self.packed {
                (i, self.elements[k])
            } else {
                (i, self.elements[i])
            }
        })
    }

    /// Restores the empty unpacked state.
    pub fn clear(&mut self) {
        let count = self.indices.len();
        if self.packed {
            self.elements[..count].fill(0.0);
        } else if 3 * count < self.elements.len() {
            for &i in &self.indices {
                self.elements[i] = 0.0;
            }
        } else {
            self.elements.fill(0.0);
        }
        self.indices.clear();
        self.packed = false;
    }

    /// Changes the capacity to `n`. Growing zero-extends; shrinking drops the
    /// entries at positions `n` and beyond.
    pub fn reserve(&mut self, n: usize) {
        let capacity = self.elements.len();
        if n > capacity {
            self.elements.resize(n, 0.0);
            self.indices.reserve(n - self.indices.len());
        } else if n < capacity {
            if self.packed {
                let mut k = 0;
                for pos in 0..self.indices.len() {
                    let (i, x) = (self.indices[pos], self.elements[pos]);
                    self.elements[pos] = 0.0;
                    if i < n {
                        self.indices[k] = i;
                        self.elements[k] = x;
                        k += 1;
                    }
                }
                self.indices.truncate(k);
            } else {
                let elements = &mut self.elements;
                self.indices.retain(|&i| {
                    if i < n {
                        true
                    } else {
                        elements[i] = 0.0;
                        false
                    }
                });
            }
            self.elements.truncate(n);
        }
    }

    /// Stores a new entry. Fails if position `index` already holds a value.
    pub fn insert(&mut self, index: usize, value: f64) -> Result<(), FactorError> {
        if self.packed {
            return Err(FactorError::Packed);
        }
        if index >= self.elements.len() {
            self.reserve(index + 1);
        }
        if self.elements[index] != 0.0 {
            return Err(FactorError::DuplicateIndex(index));
        }
        if value.abs() >= TINY_ELEMENT {
            self.elements[index] = value;
            self.indices.push(index);
        }
        Ok(())
    }

    /// Adds `delta` to position `index`, creating the entry if needed. An
    /// entry that cancels below [`TINY_ELEMENT`] is removed.
    pub fn add_entry(&mut self, index: usize, delta: f64) -> Result<(), FactorError> {
        if self.packed {
            return Err(FactorError::Packed);
        }
        if index >= self.elements.len() {
            self.reserve(index + 1);
        }
        let old = self.elements[index];
        if old != 0.0 {
            let value = old + delta;
            if value.abs() >= TINY_ELEMENT {
                self.elements[index] = value;
            } else {
                self.elements[index] = 0.0;
                if let Some(pos) = self.indices.iter().position(|&i| i == index) {
                    self.indices.swap_remove(pos);
                }
            }
        } else if delta.abs() >= TINY_ELEMENT {
            self.elements[index] = delta;
            self.indices.push(index);
        }
        Ok(())
    }

    /// Rebuilds the index list from the dense values in `start..end`, zeroing
    /// values below `tolerance`. Positions outside the range must be zero.
    /// Returns the number of nonzeros.
    pub fn scan(&mut self, start: usize, end: usize, tolerance: f64) -> usize {
        debug_assert!(!self.packed);
        let end = end.min(self.elements.len());
        self.indices.clear();
        for i in start..end {
            let value = self.elements[i];
            if value != 0.0 {
                if value.abs() >= tolerance {
                    self.indices.push(i);
                } else {
                    self.elements[i] = 0.0;
                }
            }
        }
        self.indices.len()
    }

    /// Drops listed entries below `tolerance`. Returns the number kept.
    pub fn clean(&mut self, tolerance: f64) -> usize {
        debug_assert!(!self.packed);
        let elements = &mut self.elements;
        self.indices.retain(|&i| {
            if elements[i].abs() >= tolerance {
                true
            } else {
                elements[i] = 0.0;
                false
            }
        });
        self.indices.len()
    }

    /// Drops entries below `tolerance` and switches to packed mode.
    pub fn clean_and_pack(&mut self, tolerance: f64) -> usize {
        debug_assert!(!self.packed);
        let mut values = Vec::with_capacity(self.indices.len());
        let mut k = 0;
        for pos in 0..self.indices.len() {
            let i = self.indices[pos];
            let value = std::mem::take(&mut self.elements[i]);
            if value.abs() >= tolerance {
                self.indices[k] = i;
                values.push(value);
                k += 1;
            }
        }
        self.indices.truncate(k);
        self.elements[..k].copy_from_slice(&values);
        self.packed = true;
        k
    }

    /// [`scan`](Self::scan) followed by a switch to packed mode.
    pub fn scan_and_pack(&mut self, start: usize, end: usize, tolerance: f64) -> usize {
        self.scan(start, end, tolerance);
        self.clean_and_pack(tolerance)
    }

    /// Switches a packed vector back to unpacked mode.
    pub fn expand(&mut self) {
        if !self.packed {
            return;
        }
        let count = self.indices.len();
        let values = self.elements[..count].to_vec();
        self.elements[..count].fill(0.0);
        for (&i, &x) in self.indices.iter().zip(&values) {
            self.elements[i] = x;
        }
        self.packed = false;
    }

    /// Inserts every entry of `other`. Positions present in both are an error
    /// and leave `self` partially extended.
    pub fn append(&mut self, other: &IndexedVector) -> Result<(), FactorError> {
        for (i, x) in other.iter() {
            self.insert(i, x)?;
        }
        Ok(())
    }

    pub fn min_index(&self) -> Option<usize> {
        self.indices.iter().copied().min()
    }

    pub fn max_index(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }

    /// Sorts the index list (and the packed values with it).
    pub fn sort_indices(&mut self) {
        if self.packed {
            let count = self.indices.len();
            let mut pairs: Vec<(usize, f64)> = self.iter().collect();
            pairs.sort_unstable_by_key(|&(i, _)| i);
            for (k, (i, x)) in pairs.into_iter().enumerate() {
                self.indices[k] = i;
                self.elements[k] = x;
            }
            debug_assert_eq!(count, self.indices.len());
        } else {
            self.indices.sort_unstable();
        }
    }

    /// Multiplies every entry by `factor`, removing entries that underflow.
    pub fn scale(&mut self, factor: f64) {
        self.map_values(|x| x * factor);
    }

    /// Drops the entries at positions `n` and beyond. Unlike
    /// [`reserve`](Self::reserve) this never grows the vector.
    pub fn truncate(&mut self, n: usize) {
        if n < self.capacity() {
            self.reserve(n);
        }
    }

    /// Orders the index list by increasing value.
    pub fn sort_by_element_increasing(&mut self) {
        self.sort_by_element(|a, b| a.total_cmp(&b));
    }

    /// Orders the index list by decreasing value.
    pub fn sort_by_element_decreasing(&mut self) {
        self.sort_by_element(|a, b| b.total_cmp(&a));
    }

    fn sort_by_element(&mut self, cmp: impl Fn(f64, f64) -> Ordering) {
        let mut pairs: Vec<(usize, f64)> = self.iter().collect();
        pairs.sort_by(|a, b| cmp(a.1, b.1));
        for (k, (i, x)) in pairs.into_iter().enumerate() {
            self.indices[k] = i;
            if self.packed {
                self.elements[k] = x;
            }
        }
    }

    // Applies `f` to every stored value in either mode. Results below
    // TINY_ELEMENT are removed.
    fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        if self.packed {
            let mut k = 0;
            for pos in 0..self.indices.len() {
                let value = f(std::mem::take(&mut self.elements[pos]));
                if value.abs() >= TINY_ELEMENT {
                    self.indices[k] = self.indices[pos];
                    self.elements[k] = value;
                    k += 1;
                }
            }
            self.indices.truncate(k);
        } else {
            for &i in &self.indices {
                self.elements[i] = f(self.elements[i]);
            }
            self.clean(TINY_ELEMENT);
        }
    }

    /// True when no index is listed and the dense array is all zero.
    pub fn is_clear(&self) -> bool {
        self.indices.is_empty() && self.elements.iter().all(|&x| x == 0.0)
    }

    pub fn checked_add(&self, other: &IndexedVector) -> Result<IndexedVector, FactorError> {
        self.merge(other, |a, b| a + b)
    }

    pub fn checked_sub(&self, other: &IndexedVector) -> Result<IndexedVector, FactorError> {
        self.merge(other, |a, b| a - b)
    }

    pub fn checked_mul(&self, other: &IndexedVector) -> Result<IndexedVector, FactorError> {
        self.restrict(other, |i, a, b| Ok(a * b).map(|x| (i, x)))
    }

    /// Element-wise division. A nonzero on the left over a zero on the right
    /// is an error.
    pub fn checked_div(&self, other: &IndexedVector) -> Result<IndexedVector, FactorError> {
        self.restrict(other, |i, a, b| {
            if b == 0.0 {
                Err(FactorError::ZeroDivisor(i))
            } else {
                Ok((i, a / b))
            }
        })
    }

    // Union of both patterns; entries that cancel are removed.
    fn merge(
        &self,
        other: &IndexedVector,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<IndexedVector, FactorError> {
        if self.packed || other.packed {
            return Err(FactorError::Packed);
        }
        let mut result = self.clone();
        result.reserve(self.capacity().max(other.capacity()));
        let mut need_clean = false;
        for &i in &other.indices {
            let old = result.elements[i];
            let value = op(old, other.elements[i]);
            if old != 0.0 {
                result.elements[i] = value;
                need_clean |= value.abs() < TINY_ELEMENT;
            } else if value.abs() >= TINY_ELEMENT {
                result.elements[i] = value;
                result.indices.push(i);
            }
        }
        if need_clean {
            result.clean(TINY_ELEMENT);
        }
        Ok(result)
    }

    // Pattern of `self` only; `op` sees zero where `other` has no entry.
    fn restrict(
        &self,
        other: &IndexedVector,
        op: impl Fn(usize, f64, f64) -> Result<(usize, f64), FactorError>,
    ) -> Result<IndexedVector, FactorError> {
        if self.packed || other.packed {
            return Err(FactorError::Packed);
        }
        let mut result = IndexedVector::new(self.capacity().max(other.capacity()));
        for &i in &self.indices {
            let (i, value) = op(i, self.elements[i], other.get(i))?;
            if value.abs() >= TINY_ELEMENT {
                result.elements[i] = value;
                result.indices.push(i);
            }
        }
        Ok(result)
    }
}

impl Index<usize> for IndexedVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.elements[i]
    }
}

impl PartialEq for IndexedVector {
    /// Same nonzero positions holding the same values.
    fn eq(&self, other: &IndexedVector) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut a: Vec<(usize, f64)> = self.iter().collect();
        let mut b: Vec<(usize, f64)> = other.iter().collect();
        a.sort_unstable_by_key(|&(i, _)| i);
        b.sort_unstable_by_key(|&(i, _)| i);
        a == b
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl<'a> $trait<&'a IndexedVector> for &'a IndexedVector {
            type Output = IndexedVector;

            /// # Panics
            ///
            /// On packed operands and, for division, on a zero divisor.
            fn $method(self, rhs: &'a IndexedVector) -> IndexedVector {
                match self.$checked(rhs) {
                    Ok(v) => v,
                    Err(e) => panic!("{}", e),
                }
            }
        }
    };
}

impl_binop!(Add, add, checked_add);
impl_binop!(Sub, sub, checked_sub);
impl_binop!(Mul, mul, checked_mul);
impl_binop!(Div, div, checked_div);

// Scalar updates touch the stored entries only.

impl AddAssign<f64> for IndexedVector {
    fn add_assign(&mut self, value: f64) {
        self.map_values(|x| x + value);
    }
}

impl SubAssign<f64> for IndexedVector {
    fn sub_assign(&mut self, value: f64) {
        self.map_values(|x| x - value);
    }
}

impl MulAssign<f64> for IndexedVector {
    fn mul_assign(&mut self, value: f64) {
        self.scale(value);
    }
}

impl DivAssign<f64> for IndexedVector {
    /// # Panics
    ///
    /// If `value` is zero.
    fn div_assign(&mut self, value: f64) {
        assert!(value != 0.0, "indexed vector divided by zero");
        self.map_values(|x| x / value);
    }
}
