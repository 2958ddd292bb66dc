use std::ops::Index;

const MIN_CAPACITY: usize = 8;

/// Single-owner bin storage. Growth doubles the capacity so data-dependent
/// bin counts (preferential attachment) do not reallocate on every sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinBuffer<T> {
    values: Vec<T>,
}

impl<T: Copy + Default> BinBuffer<T> {
    pub fn with_len(len: usize) -> Self {
        Self {
            values: vec![T::default(); len],
        }
    }

    /// Zero-fills to exactly `len` entries, keeping the allocation.
    pub fn reset(&mut self, len: usize) {
        self.values.clear();
        self.values.resize(len, T::default());
    }

    /// Grows to at least `len` entries; existing values are kept.
    pub fn ensure_len(&mut self, len: usize) -> bool {
        if len <= self.values.len() {
            return false;
        }
        if len > self.values.capacity() {
            let target = len.max(self.values.capacity() * 2).max(MIN_CAPACITY);
            self.values.reserve_exact(target - self.values.len());
        }
        self.values.resize(len, T::default());
        true
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        self.values.get(idx).copied()
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.values.get_mut(idx)
    }

    pub fn set(&mut self, idx: usize, value: T) -> bool {
        match self.values.get_mut(idx) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: T) {
        self.values.fill(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.clone()
    }
}

impl BinBuffer<u64> {
    pub fn increment(&mut self, idx: usize) -> bool {
        match self.values.get_mut(idx) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

impl BinBuffer<f64> {
    pub fn add(&mut self, idx: usize, amount: f64) -> bool {
        match self.values.get_mut(idx) {
            Some(stack) => {
                *stack += amount;
                true
            }
            None => false,
        }
    }
}

impl<T> Index<usize> for BinBuffer<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.values[idx]
    }
}
