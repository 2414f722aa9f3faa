// Copyright (C) 2022-2023 Richard Lincoln

// Column replacement
//
// The spike s (the entering column after L and R) becomes the new last column
// of U. The row of the leaving column p is eliminated against the rows below
// it: with z solving U^T z = U[p, :] the row eta z is appended to R, and the
// new pivot is s[p] - z^T s. Row p and column p leave U, the spike moves in
// as column `rows_extra` and the pivot test compares the new pivot with the
// one implied by the caller's check value.

use crate::factor::def::{ReplaceStatus, PIVOT_ZERO};
use crate::{Factorization, FactorError, IndexedVector};
use log::{debug, warn};
use std::time::Instant;

impl Factorization {
    /// Replaces the column at basis position `pivot_row` by the spike stored
    /// by the last [`ftran_for_update`](Self::ftran_for_update).
    ///
    /// `pivot_check` is the entry at `pivot_row` of the FTRAN result of the
    /// entering column, computed with the factors before this update.
    /// `region` is scratch space and is left empty.
    ///
    /// Nothing is changed unless the status reports the pivot as applied.
    pub fn replace_column(
        &mut self,
        region: &mut IndexedVector,
        pivot_row: usize,
        pivot_check: f64,
    ) -> ReplaceStatus {
        assert!(
            pivot_row < self.rows,
            "pivot row {} out of range for {} rows",
            pivot_row,
            self.rows
        );
        let timer = self.settings.collect_statistics.then(Instant::now);
        let status = self.replace(region, pivot_row, pivot_check);
        region.clear();

        match status {
            ReplaceStatus::Singular => debug!(
                "pivot {} rejected after {} updates (check {:e})",
                pivot_row, self.number_pivots, pivot_check
            ),
            ReplaceStatus::OkDegraded => debug!(
                "pivot {} accepted with reduced accuracy after {} updates",
                pivot_row, self.number_pivots
            ),
            ReplaceStatus::PivotLimitReached => {
                debug!("pivot limit of {} reached", self.settings.maximum_pivots)
            }
            _ => {}
        }
        if let Some(t) = timer {
            self.stats.replace_calls += 1;
            self.stats.time_replace += t.elapsed().as_secs_f64();
        }
        status
    }

    /// Replaces the column at basis position `pivot_row` by the sparse column
    /// `(indices, values)` given in original row numbering.
    pub fn replace_column_sparse(
        &mut self,
        pivot_row: usize,
        pivot_check: f64,
        indices: &[usize],
        values: &[f64],
    ) -> Result<ReplaceStatus, FactorError> {
        if pivot_row >= self.rows {
            return Err(FactorError::IndexOutOfRange {
                index: pivot_row,
                len: self.rows,
            });
        }
        if let Some(&i) = indices.iter().find(|&&i| i >= self.rows) {
            return Err(FactorError::IndexOutOfRange {
                index: i,
                len: self.rows,
            });
        }
        let column = IndexedVector::from_sparse(self.rows, indices, values)?;
        let mut region = self.new_region();
        {
            let (index, dense) = region.parts_mut();
            for (i, x) in column.iter() {
                let k = self.permute[i];
                dense[k] = x;
                index.push(k);
            }
        }
        self.ftran_for_update(&mut region);
        region.clear();
        Ok(self.replace_column(&mut region, pivot_row, pivot_check))
    }

    /// Classifies a replacement pivot. `save_from_u` is the new pivot as
    /// computed from the factors and `old_pivot` the value expected from the
    /// caller's check. The tolerance tightens with the number of updates.
    pub fn check_pivot(&self, save_from_u: f64, old_pivot: f64) -> ReplaceStatus {
        if save_from_u.abs() <= PIVOT_ZERO {
            return ReplaceStatus::Singular;
        }
        let extra = self.rows_extra;
        let tolerance = if extra < self.rows + 2 {
            1.0e-5
        } else if extra < self.rows + 10 {
            1.0e-6
        } else if extra < self.rows + 50 {
            1.0e-8
        } else {
            1.0e-10
        };
        let tolerance = tolerance * self.settings.relax_check;

        let check = save_from_u / old_pivot;
        if (1.0 - check.abs()).abs() < tolerance {
            ReplaceStatus::Ok
        } else if (old_pivot.abs() - save_from_u.abs()).abs() < 1.0e-12
            || (1.0 - check.abs()).abs() < 1.0e-8
        {
            ReplaceStatus::OkDegraded
        } else {
            ReplaceStatus::Singular
        }
    }

    fn replace(&mut self, region: &mut IndexedVector, pivot_row: usize, pivot_check: f64) -> ReplaceStatus {
        if self.rows_extra >= self.max_rows_extra {
            return ReplaceStatus::PivotLimitReached;
        }
        let slot = match self.spike {
            Some(slot) => slot,
            None => {
                return ReplaceStatus::OutOfSpace {
                    pivot_applied: false,
                }
            }
        };
        debug_assert_eq!(slot, self.rows_extra);

        let mut ws = std::mem::take(&mut self.workspace);
        region.clear();
        self.prepare(region, &mut ws);

        let p = self.pivot_column[pivot_row];
        let old_pivot = pivot_check / self.pivot_region[p];

        // row p of U, then z from U^T z = U[p, :]
        {
            let (index, dense) = region.parts_mut();
            let (columns, slots) = self.u.rows.entries(p);
            for (&c, &s) in columns.iter().zip(slots) {
                dense[c] = self.u.value(s);
                index.push(c);
            }
        }
        let average = self.estimates.btran_after_u;
        self.btran_u(region, &mut ws, average);
        debug_assert!(ws.is_clear());
        self.workspace = ws;

        let tol = self.settings.zero_tolerance;
        let mut save_from_u = 0.0;
        let mut spike_nnz = 0;
        let mut longest = 0;
        let (rows_s, value) = self.u.columns.entries(slot);
        for (&r, &x) in rows_s.iter().zip(value) {
            if x.abs() <= tol {
                continue;
            }
            if r == p {
                save_from_u += x;
            } else {
                save_from_u -= x * region[r];
                spike_nnz += 1;
                longest = longest.max(self.u.rows.count[r]);
            }
        }

        let status = self.check_pivot(save_from_u, old_pivot);
        if status == ReplaceStatus::Singular {
            return status;
        }

        // everything below must fit without failing halfway
        if self.r.room() < region.len()
            || self.u.rows.live() + spike_nnz + longest + 1 > self.u.rows.capacity()
        {
            return ReplaceStatus::OutOfSpace {
                pivot_applied: false,
            };
        }

        self.r.push(region.iter());
        self.u.remove_column(p);
        self.u.remove_row(p);

        self.permute[slot] = p;
        self.pivot_column[pivot_row] = slot;
        self.pivot_column_back[slot] = Some(pivot_row);
        self.pivot_column_back[p] = None;

        let scale = 1.0 / save_from_u;
        self.u.rows.push_empty(slot);
        self.u.columns.retain(slot, |r, x| r != p && x.abs() > tol);
        for s in self.u.columns.range(slot) {
            self.u.columns.value[s] *= scale;
        }
        let linked = self.u.link_column(slot, self.settings.pad, self.settings.stretch);
        debug_assert!(linked, "row file overflow after capacity check");

        self.pivot_region[p] = 0.0;
        self.pivot_region[slot] = scale;
        self.rows_extra += 1;
        self.number_pivots += 1;
        self.spike = None;

        #[cfg(feature = "debug")]
        debug_assert_eq!(self.u.consistency_errors(None), 0);

        if status == ReplaceStatus::Ok && self.growth_exceeded() {
            warn!(
                "fill grew from {} to {} elements after {} updates, refactorize",
                self.factor_elements,
                self.total_elements(),
                self.number_pivots
            );
            return ReplaceStatus::OutOfSpace {
                pivot_applied: true,
            };
        }
        status
    }

    // Asks for a refactorization once updates have added much more fill than
    // the supplied factors had and the arenas are filling up.
    pub(crate) fn growth_exceeded(&self) -> bool {
        let rows = self.rows;
        if self.rows_extra <= rows + 50 {
            return false;
        }
        let mut extra = self.factor_elements / 2;
        if self.rows_extra > rows + 100 + rows / 500 {
            extra = extra.max(2 * rows);
        } else {
            extra = extra.max(5 * rows);
        }
        let total = self.total_elements();
        let added = total.saturating_sub(self.factor_elements);
        added > extra
            && added > 2 * self.factor_elements
            && 3 * total > 2 * (self.u.columns.capacity() + self.l.nnz())
    }
}
