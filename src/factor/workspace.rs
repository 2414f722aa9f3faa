// Copyright (C) 2022-2023 Richard Lincoln

use crate::factor::def::CHECK_SHIFT;

/// Scratch arrays of the sparse and sparsish triangular solves.
///
/// Every mark and every bitmap word is zero on entry to and on exit from a
/// solve. A factorization owns one workspace for its mutating solves; the
/// read-only solves take one from the caller so that several threads can
/// solve against the same factorization, each with its own workspace.
#[derive(Debug, Clone, Default)]
pub struct SolveWorkspace {
    pub(crate) input: Vec<usize>,
    pub(crate) stack: Vec<usize>,
    pub(crate) next: Vec<usize>,
    pub(crate) list: Vec<usize>,
    pub(crate) mark: Vec<u8>,
    pub(crate) bits: Vec<u8>,
}

impl SolveWorkspace {
    /// Workspace for factorizations with up to `n` internal rows.
    pub fn new(n: usize) -> Self {
        let mut ws = Self::default();
        ws.reserve(n);
        ws
    }

    pub(crate) fn reserve(&mut self, n: usize) {
        if self.mark.len() < n {
            self.input.reserve(n - self.input.len());
            self.stack.resize(n, 0);
            self.next.resize(n, 0);
            self.list.resize(n, 0);
            self.mark.resize(n, 0);
            self.bits.resize((n >> CHECK_SHIFT) + 1, 0);
        }
    }

    /// True if no row is marked.
    pub fn is_clear(&self) -> bool {
        self.mark.iter().all(|&m| m == 0) && self.bits.iter().all(|&b| b == 0)
    }
}
