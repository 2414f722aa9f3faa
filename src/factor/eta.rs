// Copyright (C) 2022-2023 Richard Lincoln

// Eta file R. Eta k records the row eliminated by the k-th replacement: the
// new internal row rows+k takes the value of the replaced row minus the
// product of the eta with the current vector.

#[derive(Debug, Clone)]
pub(crate) struct EtaFile {
    start: Vec<usize>,
    index: Vec<usize>,
    value: Vec<f64>,
    capacity: usize,
}

impl EtaFile {
    pub(crate) fn new(capacity: usize, max_etas: usize) -> Self {
        let mut start = Vec::with_capacity(max_etas + 1);
        start.push(0);
        Self {
            start,
            index: Vec::with_capacity(capacity),
            value: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of etas.
    pub(crate) fn len(&self) -> usize {
        self.start.len() - 1
    }

    pub(crate) fn nnz(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn room(&self) -> usize {
        self.capacity - self.index.len()
    }

    pub(crate) fn eta(&self, k: usize) -> (&[usize], &[f64]) {
        let range = self.start[k]..self.start[k + 1];
        (&self.index[range.clone()], &self.value[range])
    }

    /// Appends an eta. The caller checks `room()` first.
    pub(crate) fn push(&mut self, entries: impl Iterator<Item = (usize, f64)>) {
        for (i, x) in entries {
            self.index.push(i);
            self.value.push(x);
        }
        debug_assert!(self.index.len() <= self.capacity);
        self.start.push(self.index.len());
    }
}
