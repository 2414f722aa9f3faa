// Copyright (C) 2022-2023 Richard Lincoln

// Forward solves with the updated factors.
//
// FTRAN solves B x = a in three stages: L (columns ascending), the row etas
// of R in the order they were added, and U (columns descending). Each
// triangular stage comes in three traversals which give the same result and
// differ only in how the rows with work to do are found.

use crate::factor::def::{FtranUpdate, Tier, BITS_PER_CHECK, CHECK_SHIFT};
use crate::factor::dfs;
use crate::factor::stats::StageCounts;
use crate::factor::workspace::SolveWorkspace;
use crate::{Factorization, IndexedVector};
use std::time::Instant;

impl Factorization {
    /// Solves `B x = a` for a right-hand side in internal row numbering.
    ///
    /// On return `region` holds the solution indexed by internal column; use
    /// [`pivot_column_back`](Self::pivot_column_back) to map to basis
    /// positions. Returns the number of nonzeros.
    pub fn ftran(&mut self, region: &mut IndexedVector) -> usize {
        self.ftran_mut(region, false).count
    }

    /// Same as [`ftran`](Self::ftran), and keeps the partially transformed
    /// column as the spike for the next [`replace_column`](Self::replace_column).
    pub fn ftran_for_update(&mut self, region: &mut IndexedVector) -> FtranUpdate {
        self.ftran_mut(region, true)
    }

    /// Read-only [`ftran`](Self::ftran). Does not touch the fill estimates or
    /// statistics, so any number of these can run against one factorization.
    pub fn ftran_with(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace) -> usize {
        self.prepare(region, ws);
        let est = self.estimates;
        self.ftran_l(region, ws, est.ftran_after_l);
        self.ftran_r(region);
        self.ftran_u(region, ws, est.ftran_after_u);
        region.len()
    }

    /// Solves `B x = a` for `a` in original row numbering.
    ///
    /// `rhs` is replaced by the solution indexed by basis position. `work`
    /// must be empty and is left empty.
    ///
    /// # Panics
    ///
    /// If `rhs` has an entry at a row `>= rows`.
    pub fn ftran_permuted(&mut self, work: &mut IndexedVector, rhs: &mut IndexedVector) -> usize {
        debug_assert!(work.is_empty());
        if let Some(i) = rhs.max_index() {
            assert!(i < self.rows, "row {} out of range for {} rows", i, self.rows);
        }
        if work.capacity() < self.max_rows_extra {
            work.reserve(self.max_rows_extra);
        }
        {
            let (index, dense) = work.parts_mut();
            for (i, x) in rhs.iter() {
                let k = self.permute[i];
                dense[k] = x;
                index.push(k);
            }
        }
        rhs.clear();
        if rhs.capacity() < self.rows {
            rhs.reserve(self.rows);
        }
        self.ftran(work);

        let (index, dense) = rhs.parts_mut();
        for (c, x) in work.iter() {
            if let Some(pos) = self.pivot_column_back[c] {
                dense[pos] = x;
                index.push(pos);
            }
        }
        work.clear();
        rhs.len()
    }

    fn ftran_mut(&mut self, region: &mut IndexedVector, for_update: bool) -> FtranUpdate {
        let timer = self.settings.collect_statistics.then(Instant::now);
        let mut ws = std::mem::take(&mut self.workspace);
        self.prepare(region, &mut ws);
        let est = self.estimates;

        let mut counts = StageCounts {
            input: region.len(),
            ..Default::default()
        };
        self.ftran_l(region, &mut ws, est.ftran_after_l);
        counts.first = region.len();
        self.ftran_r(region);
        counts.middle = region.len();
        let stored = for_update && self.store_spike(region);
        self.ftran_u(region, &mut ws, est.ftran_after_u);
        counts.last = region.len();

        debug_assert!(ws.is_clear());
        self.workspace = ws;
        self.estimates.record_ftran(&counts);
        if let Some(t) = timer {
            self.stats.record_ftran(&counts, t.elapsed().as_secs_f64());
        }
        FtranUpdate {
            count: counts.last,
            stored,
        }
    }

    // Keeps the column after L and R as U column `rows_extra`. A pending
    // spike is dropped first.
    fn store_spike(&mut self, region: &IndexedVector) -> bool {
        self.throw_away_column();
        if self.rows_extra >= self.max_rows_extra {
            return false;
        }
        let tol = self.settings.zero_tolerance;
        let entries: Vec<(usize, f64)> = region.iter().filter(|&(_, x)| x.abs() > tol).collect();
        let slot = self.rows_extra;
        if self.u.store_column(slot, &entries) {
            self.spike = Some(slot);
            true
        } else {
            false
        }
    }

    pub(crate) fn ftran_l(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace, average: f64) {
        if self.l.number == 0 || region.is_empty() {
            return;
        }
        let tier = self.tier("ftran L", region.len(), average, self.l.number);
        let tol = self.settings.zero_tolerance;
        let base = self.l.base;
        let rows = self.rows;
        let (index, dense) = region.parts_mut();

        // rows below base have empty columns and pass through
        let smallest = match index.iter().copied().filter(|&i| i >= base).min() {
            Some(i) => i,
            None => return,
        };

        match tier {
            Tier::Densish => {
                index.retain(|&i| i < base);
                for i in smallest..rows {
                    let pv = dense[i];
                    if pv.abs() > tol {
                        let (rows_l, value) = self.l.column(i);
                        for (&j, &x) in rows_l.iter().zip(value) {
                            dense[j] -= pv * x;
                        }
                        index.push(i);
                    } else {
                        dense[i] = 0.0;
                    }
                }
            }
            Tier::Sparsish => {
                let bits = &mut ws.bits;
                for &i in index.iter().filter(|&&i| i >= base) {
                    bits[i >> CHECK_SHIFT] |= 1 << (i & (BITS_PER_CHECK - 1));
                }
                index.retain(|&i| i < base);
                let last = (rows - 1) >> CHECK_SHIFT;
                for word in (smallest >> CHECK_SHIFT)..=last {
                    if bits[word] == 0 {
                        continue;
                    }
                    let lo = (word << CHECK_SHIFT).max(smallest);
                    let hi = ((word + 1) << CHECK_SHIFT).min(rows);
                    for i in lo..hi {
                        let pv = dense[i];
                        if pv.abs() > tol {
                            let (rows_l, value) = self.l.column(i);
                            for (&j, &x) in rows_l.iter().zip(value) {
                                dense[j] -= pv * x;
                                bits[j >> CHECK_SHIFT] |= 1 << (j & (BITS_PER_CHECK - 1));
                            }
                            index.push(i);
                        } else {
                            dense[i] = 0.0;
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
                    |j| self.l.column_rows(j),
                    &mut ws.stack,
                    &mut ws.next,
                    &mut ws.list,
                    &mut ws.mark,
                );
                for &i in ws.list[..nlist].iter().rev() {
                    ws.mark[i] = 0;
                    let pv = dense[i];
                    if pv.abs() > tol {
                        let (rows_l, value) = self.l.column(i);
                        for (&j, &x) in rows_l.iter().zip(value) {
                            dense[j] -= pv * x;
                        }
                        index.push(i);
                    } else {
                        dense[i] = 0.0;
                    }
                }
                ws.input.clear();
            }
        }
    }

    pub(crate) fn ftran_r(&self, region: &mut IndexedVector) {
        if self.r.len() == 0 || region.is_empty() {
            return;
        }
        let tol = self.settings.zero_tolerance;
        let (index, dense) = region.parts_mut();
        for k in 0..self.r.len() {
            let slot = self.rows + k;
            let old = self.permute[slot];
            let mut pv = dense[old];
            dense[old] = 0.0;
            let (rows_r, value) = self.r.eta(k);
            for (&j, &x) in rows_r.iter().zip(value) {
                pv -= x * dense[j];
            }
            if pv.abs() > tol {
                dense[slot] = pv;
                index.push(slot);
            }
        }
        index.retain(|&i| dense[i] != 0.0);
    }

    pub(crate) fn ftran_u(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace, average: f64) {
        if region.is_empty() {
            return;
        }
        let tier = self.tier("ftran U", region.len(), average, self.rows_extra);
        let tol = self.settings.zero_tolerance;
        let (index, dense) = region.parts_mut();

        // returns false when the entry was dropped
        let pivot = |i: usize, dense: &mut [f64]| -> bool {
            let pv = dense[i];
            if pv.abs() > tol {
                let (rows_u, value) = self.u.columns.entries(i);
                for (&r, &x) in rows_u.iter().zip(value) {
                    dense[r] -= x * pv;
                }
                dense[i] = pv * self.pivot_region[i];
                dense[i] != 0.0
            } else {
                dense[i] = 0.0;
                false
            }
        };

        match tier {
            Tier::Densish => {
                let largest = index.iter().copied().max().unwrap_or(0);
                index.clear();
                for i in (0..=largest).rev() {
                    if dense[i] != 0.0 && pivot(i, dense) {
                        index.push(i);
                    }
                }
            }
            Tier::Sparsish => {
                let bits = &mut ws.bits;
                let mut largest = 0;
                for &i in index.iter() {
                    bits[i >> CHECK_SHIFT] |= 1 << (i & (BITS_PER_CHECK - 1));
                    largest = largest.max(i);
                }
                index.clear();
                for word in (0..=(largest >> CHECK_SHIFT)).rev() {
                    if bits[word] == 0 {
                        continue;
                    }
                    let lo = word << CHECK_SHIFT;
                    let hi = ((word + 1) << CHECK_SHIFT).min(largest + 1);
                    for i in (lo..hi).rev() {
                        if dense[i] == 0.0 {
                            continue;
                        }
                        for &r in self.u.columns.indices(i) {
                            bits[r >> CHECK_SHIFT] |= 1 << (r & (BITS_PER_CHECK - 1));
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
                ws.input.extend_from_slice(index);
                index.clear();
                let nlist = dfs::reach(
                    &ws.input,
                    |j| self.u.columns.indices(j),
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
