// Copyright (C) 2022-2023 Richard Lincoln

use crate::factor::def::{select_tier, Tier};
use crate::factor::eta::EtaFile;
use crate::factor::lower::LowerFactor;
use crate::factor::stats::{DensityEstimates, Statistics};
use crate::factor::upper::UStore;
use crate::factor::workspace::SolveWorkspace;
use crate::{FactorError, FactorSettings, IndexedVector, SparseColumns};
use log::{debug, trace};

/// LU factors of a basis matrix together with the updates applied since they
/// were computed.
///
/// Internally the basis is `L * R^-1 * U` (up to permutations) where `L` is
/// unit lower triangular, `R` a product of row etas and `U` upper triangular
/// with an explicit diagonal. Row `i < rows` of the internal numbering is the
/// original row `permute_back[i]`; a replacement retires the internal row of
/// the leaving column and creates a new one, `rows + k` for the k-th
/// replacement.
#[derive(Debug, Clone)]
pub struct Factorization {
    pub(crate) settings: FactorSettings,

    pub(crate) rows: usize,           // dimension of the basis
    pub(crate) rows_extra: usize,     // rows + replacements done
    pub(crate) max_rows_extra: usize, // rows + maximum_pivots
    pub(crate) sparse_threshold: usize,
    pub(crate) sparse_threshold2: usize,

    pub(crate) l: LowerFactor,
    pub(crate) u: UStore,
    pub(crate) r: EtaFile,

    /// reciprocal pivot of every internal row in use, zero otherwise
    pub(crate) pivot_region: Vec<f64>,

    // permute[i] is the internal row of original row i for i < rows and the
    // retired internal row replaced by new row i for i >= rows
    pub(crate) permute: Vec<usize>,
    pub(crate) permute_back: Vec<Option<usize>>,
    pub(crate) pivot_column: Vec<usize>,
    pub(crate) pivot_column_back: Vec<Option<usize>>,

    pub(crate) number_pivots: usize,
    pub(crate) spike: Option<usize>, // column file line of the pending spike
    pub(crate) factor_elements: usize,

    pub(crate) estimates: DensityEstimates,
    pub(crate) stats: Statistics,
    pub(crate) workspace: SolveWorkspace,
}

impl Factorization {
    /// Sets up the update engine from existing factors of a basis `B`.
    ///
    /// With `P` the row permutation (`row_permutation[i]` is the internal row
    /// of original row `i`) and `Q` the column permutation
    /// (`column_permutation[k]` is the internal column of basis position `k`)
    /// the factors satisfy `B[i][k] = (L * U)[P[i]][Q[k]]`.
    ///
    /// `lower` holds the strictly lower part of the unit lower factor by
    /// columns, `upper` the strictly upper part of U by columns and
    /// `diagonal` the pivots.
    pub fn from_factors(
        settings: FactorSettings,
        lower: &SparseColumns,
        upper: &SparseColumns,
        diagonal: &[f64],
        row_permutation: &[usize],
        column_permutation: &[usize],
    ) -> Result<Self, FactorError> {
        let rows = diagonal.len();
        lower.check("lower", rows)?;
        upper.check("upper", rows)?;
        check_permutation(row_permutation, rows, "row_permutation")?;
        check_permutation(column_permutation, rows, "column_permutation")?;
        if let Some(i) = diagonal.iter().position(|&d| d == 0.0 || !d.is_finite()) {
            return Err(FactorError::ZeroPivot(i));
        }

        let l = LowerFactor::new(lower)?;

        let max_rows_extra = rows + settings.maximum_pivots;
        let area_factor = settings.area_factor;
        let u_area = settings
            .u_area
            .unwrap_or((area_factor * (upper.nnz() + 2 * rows) as f64) as usize);
        if u_area < upper.nnz() {
            return Err(FactorError::AreaTooSmall {
                what: "u_area",
                needed: upper.nnz(),
                found: u_area,
            });
        }
        let r_area = settings
            .r_area
            .unwrap_or((area_factor * (upper.nnz() + l.nnz() + rows) as f64) as usize);

        // U by columns, scaled by the reciprocal pivots
        let mut u = UStore::new(max_rows_extra, u_area);
        let mut pivot_region = vec![0.0; max_rows_extra];
        let mut column = Vec::new();
        for j in 0..rows {
            let (index, value) = upper.column(j);
            let pivot = 1.0 / diagonal[j];
            column.clear();
            for (&i, &x) in index.iter().zip(value) {
                if i >= j {
                    return Err(FactorError::NotTriangular {
                        factor: "U",
                        row: i,
                        column: j,
                    });
                }
                if x != 0.0 {
                    column.push((i, x * pivot));
                }
            }
            u.columns.append_line(j, &column);
            pivot_region[j] = pivot;
        }
        u.build_rows(rows);

        let mut permute = vec![0; max_rows_extra];
        let mut permute_back = vec![None; max_rows_extra];
        for (i, &p) in row_permutation.iter().enumerate() {
            permute[i] = p;
            permute_back[p] = Some(i);
        }
        let mut pivot_column_back = vec![None; max_rows_extra];
        for (k, &q) in column_permutation.iter().enumerate() {
            pivot_column_back[q] = Some(k);
        }

        let sparse_threshold = settings.sparse_threshold.unwrap_or((rows / 10).max(8));
        let sparse_threshold2 = settings
            .sparse_threshold2
            .unwrap_or((rows / 2).max(sparse_threshold));
        let factor_elements = l.nnz() + u.columns.live();

        debug!(
            "factorization of {} rows: {} in L, {} in U, room for {} pivots",
            rows,
            l.nnz(),
            u.columns.live(),
            settings.maximum_pivots
        );

        Ok(Self {
            rows,
            rows_extra: rows,
            max_rows_extra,
            sparse_threshold,
            sparse_threshold2,
            l,
            u,
            r: EtaFile::new(r_area, settings.maximum_pivots),
            pivot_region,
            permute,
            permute_back,
            pivot_column: column_permutation.to_vec(),
            pivot_column_back,
            number_pivots: 0,
            spike: None,
            factor_elements,
            estimates: DensityEstimates::default(),
            stats: Statistics::default(),
            workspace: SolveWorkspace::new(max_rows_extra),
            settings,
        })
    }

    /// Dimension of the basis.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of internal rows ever used: `rows` plus replacements done.
    pub fn rows_extra(&self) -> usize {
        self.rows_extra
    }

    /// Largest internal row count before a refactorization is needed.
    pub fn max_rows_extra(&self) -> usize {
        self.max_rows_extra
    }

    /// Replacements since the factors were supplied.
    pub fn number_pivots(&self) -> usize {
        self.number_pivots
    }

    pub fn settings(&self) -> &FactorSettings {
        &self.settings
    }

    /// Internal row of each original row, followed by the retired row of each
    /// new internal row.
    pub fn permute(&self) -> &[usize] {
        &self.permute[..self.rows_extra]
    }

    /// Original row of each internal row; None for rows created by
    /// replacements.
    pub fn permute_back(&self) -> &[Option<usize>] {
        &self.permute_back[..self.rows_extra]
    }

    /// Internal column of each basis position.
    pub fn pivot_column(&self) -> &[usize] {
        &self.pivot_column
    }

    /// Basis position of each internal column; None for retired columns.
    pub fn pivot_column_back(&self) -> &[Option<usize>] {
        &self.pivot_column_back[..self.rows_extra]
    }

    /// Reciprocal pivots by internal row.
    pub fn pivot_region(&self) -> &[f64] {
        &self.pivot_region[..self.rows_extra]
    }

    /// Reciprocal of the pivot of the column at basis position `k`.
    pub fn reciprocal_pivot(&self, k: usize) -> f64 {
        self.pivot_region[self.pivot_column[k]]
    }

    pub fn l_elements(&self) -> usize {
        self.l.nnz()
    }

    /// Entries of U above the diagonal, not counting a pending spike.
    pub fn u_elements(&self) -> usize {
        let spike = self.spike.map_or(0, |c| self.u.columns.count[c]);
        self.u.columns.live() - spike
    }

    pub fn r_elements(&self) -> usize {
        self.r.nnz()
    }

    pub(crate) fn total_elements(&self) -> usize {
        self.l.nnz() + self.u.columns.live() + self.r.nnz()
    }

    /// Length of the U arenas.
    pub fn u_area(&self) -> usize {
        self.u.columns.capacity()
    }

    /// Number of times the U row file was compacted.
    pub fn row_compressions(&self) -> usize {
        self.u.rows.compressions
    }

    /// Number of times the U column file was compacted.
    pub fn column_compressions(&self) -> usize {
        self.u.columns.compressions
    }

    /// First arena slot of the U row of internal row `i`, None if the row is
    /// not in the arena.
    pub fn u_row_start(&self, i: usize) -> Option<usize> {
        if i < self.u.rows.nlines() && self.u.rows.order.contains(i) {
            Some(self.u.rows.start[i])
        } else {
            None
        }
    }

    /// True while a spike from `ftran_for_update` waits for `replace_column`.
    pub fn has_pending_spike(&self) -> bool {
        self.spike.is_some()
    }

    /// Drops the spike stored by the last `ftran_for_update`.
    pub fn throw_away_column(&mut self) {
        if let Some(c) = self.spike.take() {
            self.u.columns.remove_line(c);
        }
    }

    /// Stored U entries as sorted (row, column, value) triples read through
    /// the column view. Values are scaled by the column's reciprocal pivot.
    pub fn u_entries_by_column(&self) -> Vec<(usize, usize, f64)> {
        self.u.triples_by_column(self.spike)
    }

    /// Same as [`u_entries_by_column`](Self::u_entries_by_column), read
    /// through the row view.
    pub fn u_entries_by_row(&self) -> Vec<(usize, usize, f64)> {
        self.u.triples_by_row()
    }

    /// Number of entries on which the row and column views of U disagree.
    pub fn u_consistency_errors(&self) -> usize {
        self.u.consistency_errors(self.spike)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn reset_statistics(&mut self) {
        self.stats = Statistics::default();
    }

    pub fn estimates(&self) -> &DensityEstimates {
        &self.estimates
    }

    /// A workspace sized for the read-only solves of this factorization.
    pub fn new_workspace(&self) -> SolveWorkspace {
        SolveWorkspace::new(self.max_rows_extra)
    }

    /// A vector long enough for any internal row.
    pub fn new_region(&self) -> IndexedVector {
        IndexedVector::new(self.max_rows_extra)
    }

    pub(crate) fn tier(&self, stage: &str, number: usize, average: f64, size: usize) -> Tier {
        let tier = select_tier(
            number,
            average,
            size,
            self.sparse_threshold,
            self.sparse_threshold2,
        );
        trace!("{}: {:?} for {} nonzeros", stage, tier, number);
        tier
    }

    pub(crate) fn prepare(&self, region: &mut IndexedVector, ws: &mut SolveWorkspace) {
        if region.capacity() < self.max_rows_extra {
            region.reserve(self.max_rows_extra);
        }
        ws.reserve(self.max_rows_extra);
        debug_assert!(!region.is_packed());
    }
}

fn check_permutation(perm: &[usize], n: usize, what: &'static str) -> Result<(), FactorError> {
    if perm.len() != n {
        return Err(FactorError::DimensionMismatch {
            what,
            expected: n,
            found: perm.len(),
        });
    }
    let mut seen = vec![false; n];
    for &p in perm {
        if p >= n || seen[p] {
            return Err(FactorError::InvalidPermutation(what));
        }
        seen[p] = true;
    }
    Ok(())
}
