// Copyright (C) 2022-2023 Richard Lincoln

// Transposed solves with the updated factors.
//
// BTRAN solves B^T y = c by running the FTRAN stages backwards: U^T by rows
// ascending, the row etas of R newest first, then L^T by rows descending. The
// row copies of U and L provide the transposed access.

use crate::factor::def::{Tier, BITS_PER_CHECK, CHECK_SHIFT};
use crate::factor::dfs;
use crate::factor::stats::StageCounts;
use crate::factor::workspace::SolveWorkspace;
use crate::{Factorization, IndexedVector};
use std::time::Instant;

impl Factorization {
    /// Solves `B^T y = c` for a right-hand side indexed by internal column.
    ///
    /// On return `region` holds the solution in internal row numbering; use
    /// [`permute_back`](Self::permute_back) to map to original rows. Returns
    /// the number of nonzeros.
    pub fn btran(&mut self, region: &mut IndexedVector) -> usize {
        let timer = self.settings.collect_statistics.then(Instant::now);
        let mut ws = std::mem::take(&mut self.workspace);
        self.prepare(region, &mut ws);
        let est = self.estimates;

        let mut counts = StageCounts {
            input: region.len(),
            ..Default::default()
        };
        self.scale_by_pivots(region);
        self.btran_u(region, &mut ws, est.btran_after_u);
        counts.first = region.len();
        self.btran_r(region, &mut ws);
        counts.middle = region.len();
        self.btran_l(region, &mut ws, est.btran_after_l);
        counts.last = region.len();

        debug_assert!(ws.is_clear());
        self.workspace = ws;
        self.estimates.record_btran(&counts);
        if let Some(t) = timer {
            self.stats.record_btran(&counts, t.elapsed().as_secs_f64());
        }
        counts.last
    }

    /// Read-only [`btran`](Self::btran) using a caller owned workspace.
    pub fn btran_with(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace) -> usize {
        self.prepare(region, ws);
        let est = self.estimates;
        self.scale_by_pivots(region);
        self.btran_u(region, ws, est.btran_after_u);
        self.btran_r(region, ws);
        self.btran_l(region, ws, est.btran_after_l);
        region.len()
    }

    /// Solves `B^T y = c` for `c` indexed by basis position.
    ///
    /// `rhs` is replaced by the solution indexed by original row. `work` must
    /// be empty and is left empty.
    ///
    /// # Panics
    ///
    /// If `rhs` has an entry at a position `>= rows`.
    pub fn btran_permuted(&mut self, work: &mut IndexedVector, rhs: &mut IndexedVector) -> usize {
        debug_assert!(work.is_empty());
        if let Some(pos) = rhs.max_index() {
            assert!(pos < self.rows, "position {} out of range for {} rows", pos, self.rows);
        }
        if work.capacity() < self.max_rows_extra {
            work.reserve(self.max_rows_extra);
        }
        {
            let (index, dense) = work.parts_mut();
            for (pos, x) in rhs.iter() {
                let c = self.pivot_column[pos];
                dense[c] = x;
                index.push(c);
            }
        }
        rhs.clear();
        if rhs.capacity() < self.rows {
            rhs.reserve(self.rows);
        }
        self.btran(work);

        let (index, dense) = rhs.parts_mut();
        for (i, x) in work.iter() {
            if let Some(r) = self.permute_back[i] {
                dense[r] = x;
                index.push(r);
            }
        }
        work.clear();
        rhs.len()
    }

    /// Solves `B^T y = c` in place on a dense slice: `c` by basis position on
    /// entry, `y` by original row on return. `work` must be empty and is left
    /// empty.
    pub fn btran_dense(&mut self, work: &mut IndexedVector, values: &mut [f64]) -> usize {
        debug_assert!(work.is_empty());
        assert_eq!(values.len(), self.rows, "dense vector length");
        if work.capacity() < self.max_rows_extra {
            work.reserve(self.max_rows_extra);
        }
        {
            let (index, dense) = work.parts_mut();
            for (pos, x) in values.iter_mut().enumerate() {
                if *x != 0.0 {
                    let c = self.pivot_column[pos];
                    dense[c] = std::mem::take(x);
                    index.push(c);
                }
            }
        }
        let count = self.btran(work);
        for (i, x) in work.iter() {
            if let Some(r) = self.permute_back[i] {
                values[r] = x;
            }
        }
        work.clear();
        count
    }

    fn scale_by_pivots(&self, region: &mut IndexedVector) {
        let (index, dense) = region.parts_mut();
        for &i in index.iter() {
            dense[i] *= self.pivot_region[i];
        }
        index.retain(|&i| dense[i] != 0.0);
    }

    // U^T by rows. Row i feeds the columns right of it.
    pub(crate) fn btran_u(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace, average: f64) {
        if region.is_empty() {
            return;
        }
        let tier = self.tier("btran U", region.len(), average, self.rows_extra);
        let tol = self.settings.zero_tolerance;
        let size = self.rows_extra;
        let (index, dense) = region.parts_mut();

        let pivot = |i: usize, dense: &mut [f64]| -> bool {
            let pv = dense[i];
            if pv.abs() > tol {
                let (columns, slots) = self.u.rows.entries(i);
                for (&c, &slot) in columns.iter().zip(slots) {
                    dense[c] -= self.u.value(slot) * pv;
                }
                true
            } else {
                dense[i] = 0.0;
                false
            }
        };

        match tier {
            Tier::Densish => {
                let smallest = index.iter().copied().min().unwrap_or(size);
                index.clear();
                for i in smallest..size {
                    if dense[i] != 0.0 && pivot(i, dense) {
                        index.push(i);
                    }
                }
            }
            Tier::Sparsish => {
                let bits = &mut ws.bits;
                let mut smallest = size;
                for &i in index.iter() {
                    bits[i >> CHECK_SHIFT] |= 1 << (i & (BITS_PER_CHECK - 1));
                    smallest = smallest.min(i);
                }
                index.clear();
                if smallest < size {
                    for word in (smallest >> CHECK_SHIFT)..=((size - 1) >> CHECK_SHIFT) {
                        if bits[word] == 0 {
                            continue;
                        }
                        let lo = word << CHECK_SHIFT;
                        let hi = ((word + 1) << CHECK_SHIFT).min(size);
                        for i in lo..hi {
                            if dense[i] == 0.0 {
                                continue;
                            }
                            for &c in self.u.rows.indices(i) {
                                bits[c >> CHECK_SHIFT] |= 1 << (c & (BITS_PER_CHECK - 1));
                            }
                            if pivot(i, dense) {
                                index.push(i);
                            }
                        }
                        bits[word] = 0;
                    }
                }
            }
            Tier::Sparse => {
                ws.input.clear();
                ws.input.extend_from_slice(index);
                index.clear();
                let nlist = dfs::reach(
                    &ws.input,
                    |i| self.u.rows.indices(i),
                    &mut ws.stack,
                    &mut ws.next,
                    &mut ws.list,
                    &mut ws.mark,
                );
                for &i in ws.list[..nlist].iter().rev() {
                    ws.mark[i] = 0;
                    if pivot(i, dense) {
                        index.push(i);
                    }
                }
                ws.input.clear();
            }
        }
    }

    // R^T: the newest eta first. The value of a new row flows back to the row
    // it replaced and to the rows of its eta.
    pub(crate) fn btran_r(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace) {
        if self.r.len() == 0 || region.is_empty() {
            return;
        }
        let tol = self.settings.zero_tolerance;
        let mark = &mut ws.mark;
        let (index, dense) = region.parts_mut();
        for &i in index.iter() {
            mark[i] = 1;
        }
        for k in (0..self.r.len()).rev() {
            let slot = self.rows + k;
            let pv = dense[slot];
            if pv == 0.0 {
                continue;
            }
            dense[slot] = 0.0;
            let old = self.permute[slot];
            dense[old] += pv;
            if mark[old] == 0 {
                mark[old] = 1;
                index.push(old);
            }
            let (rows_r, value) = self.r.eta(k);
            for (&j, &x) in rows_r.iter().zip(value) {
                dense[j] -= x * pv;
                if mark[j] == 0 {
                    mark[j] = 1;
                    index.push(j);
                }
            }
        }
        for &i in index.iter() {
            mark[i] = 0;
        }
        index.retain(|&i| {
            if dense[i].abs() > tol {
                true
            } else {
                dense[i] = 0.0;
                false
            }
        });
    }

    // L^T by rows descending. Row i feeds the columns left of it.
    pub(crate) fn btran_l(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace, average: f64) {
        if self.l.number == 0 || region.is_empty() {
            return;
        }
        let tier = self.tier("btran L", region.len(), average, self.l.number);
        let tol = self.settings.zero_tolerance;
        let base = self.l.base;
        let (index, dense) = region.parts_mut();

        // rows at or below base have empty rows in L
        let largest = match index.iter().copied().filter(|&i| i > base).max() {
            Some(i) => i,
            None => return,
        };

        let pivot = |i: usize, dense: &mut [f64]| -> bool {
            let pv = dense[i];
            if pv.abs() > tol {
                let (columns, value) = self.l.row(i);
                for (&j, &x) in columns.iter().zip(value) {
                    dense[j] -= x * pv;
                }
                true
            } else {
                dense[i] = 0.0;
                false
            }
        };

        match tier {
            Tier::Densish => {
                index.retain(|&i| i < base);
                for i in (base..=largest).rev() {
                    if dense[i] != 0.0 && pivot(i, dense) {
                        index.push(i);
                    }
                }
            }
            Tier::Sparsish => {
                let bits = &mut ws.bits;
                for &i in index.iter().filter(|&&i| i >= base) {
                    bits[i >> CHECK_SHIFT] |= 1 << (i & (BITS_PER_CHECK - 1));
                }
                index.retain(|&i| i < base);
                for word in ((base >> CHECK_SHIFT)..=(largest >> CHECK_SHIFT)).rev() {
                    if bits[word] == 0 {
                        continue;
                    }
                    let lo = (word << CHECK_SHIFT).max(base);
                    let hi = ((word + 1) << CHECK_SHIFT).min(largest + 1);
                    for i in (lo..hi).rev() {
                        if dense[i] == 0.0 {
                            continue;
                        }
                        for &j in self.l.row_columns(i) {
                            bits[j >> CHECK_SHIFT] |= 1 << (j & (BITS_PER_CHECK - 1));
                        }
                        if pivot(i, dense) {
                            index.push(i);
                        }
                    }
                    bits[word] = 0;
                }
            }
            Tier::Sparse => {
                ws.input.clear();
                ws.input.extend(index.iter().copied().filter(|&i| i >= base));
                index.retain(|&i| i < base);
                let nlist = dfs::reach(
                    &ws.input,
                    |i| self.l.row_columns(i),
                    &mut ws.stack,
                    &mut ws.next,
                    &mut ws.list,
                    &mut ws.mark,
                );
                for &i in ws.list[..nlist].iter().rev() {
                    ws.mark[i] = 0;
                    if pivot(i, dense) {
                        index.push(i);
                    }
                }
                ws.input.clear();
            }
        }
    }
}
