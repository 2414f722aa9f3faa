// Copyright (C) 2022-2023 Richard Lincoln

use crate::FactorError;

/// Compressed sparse columns: column `j` holds
/// `index[start[j]..start[j+1]]` and `value[start[j]..start[j+1]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseColumns {
    pub start: Vec<usize>,
    pub index: Vec<usize>,
    pub value: Vec<f64>,
}

impl SparseColumns {
    /// `ncols` empty columns.
    pub fn new(ncols: usize) -> Self {
        Self {
            start: vec![0; ncols + 1],
            index: Vec::new(),
            value: Vec::new(),
        }
    }

    /// Builds the columns from `(row, value)` lists.
    ///
    /// ```
    /// use etalu::SparseColumns;
    ///
    /// let a = SparseColumns::from_columns(&[vec![(1, 0.5)], vec![]]);
    /// assert_eq!(a.ncols(), 2);
    /// assert_eq!(a.column(0), (&[1usize][..], &[0.5][..]));
    /// ```
    pub fn from_columns(columns: &[Vec<(usize, f64)>]) -> Self {
        let mut a = Self::new(0);
        for column in columns {
            for &(i, x) in column {
                a.index.push(i);
                a.value.push(x);
            }
            a.start.push(a.index.len());
        }
        a
    }

    pub fn ncols(&self) -> usize {
        self.start.len().saturating_sub(1)
    }

    pub fn nnz(&self) -> usize {
        self.start.last().copied().unwrap_or(0)
    }

    pub fn column(&self, j: usize) -> (&[usize], &[f64]) {
        let range = self.start[j]..self.start[j + 1];
        (&self.index[range.clone()], &self.value[range])
    }

    // Structural checks shared by the factor constructors: `n` columns, row
    // indices below `n`, no repeated row within a column.
    pub(crate) fn check(&self, what: &'static str, n: usize) -> Result<(), FactorError> {
        if self.ncols() != n {
            return Err(FactorError::DimensionMismatch {
                what,
                expected: n,
                found: self.ncols(),
            });
        }
        if self.start[0] != 0
            || self.start.windows(2).any(|w| w[0] > w[1])
            || self.nnz() != self.index.len()
            || self.index.len() != self.value.len()
        {
            return Err(FactorError::DimensionMismatch {
                what,
                expected: self.index.len(),
                found: self.nnz(),
            });
        }
        let mut stamp = vec![usize::MAX; n];
        for j in 0..n {
            for &i in self.column(j).0 {
                if i >= n {
                    return Err(FactorError::IndexOutOfRange { index: i, len: n });
                }
                if stamp[i] == j {
                    return Err(FactorError::DuplicateIndex(i));
                }
                stamp[i] = j;
            }
        }
        Ok(())
    }
}
