// Copyright (C) 2022-2023 Richard Lincoln

use crate::{FactorError, SparseColumns};

// The unit lower factor L is static between refactorizations. Column i holds
// the multipliers of pivot i (rows > i); the row copy holds the same entries
// with row i listing columns < i. Only columns base..rows can be nonempty.

#[derive(Debug, Clone)]
pub(crate) struct LowerFactor {
    pub(crate) base: usize,
    pub(crate) number: usize,
    start: Vec<usize>,
    row_index: Vec<usize>,
    value: Vec<f64>,
    start_row: Vec<usize>,
    column_index: Vec<usize>,
    value_by_row: Vec<f64>,
}

impl LowerFactor {
    pub(crate) fn new(lower: &SparseColumns) -> Result<Self, FactorError> {
        let rows = lower.ncols();
        let mut start = Vec::with_capacity(rows + 1);
        let mut row_index = Vec::with_capacity(lower.nnz());
        let mut value = Vec::with_capacity(lower.nnz());
        let mut row_count = vec![0; rows];
        let mut base = rows;

        start.push(0);
        for j in 0..rows {
            let (index, x) = lower.column(j);
            for (&i, &v) in index.iter().zip(x) {
                if i <= j {
                    return Err(FactorError::NotTriangular {
                        factor: "L",
                        row: i,
                        column: j,
                    });
                }
                if v != 0.0 {
                    row_index.push(i);
                    value.push(v);
                    row_count[i] += 1;
                }
            }
            if base == rows && row_index.len() > start[j] {
                base = j;
            }
            start.push(row_index.len());
        }

        // row copy
        let mut start_row = Vec::with_capacity(rows + 1);
        start_row.push(0);
        for i in 0..rows {
            start_row.push(start_row[i] + row_count[i]);
        }
        let nz = row_index.len();
        let mut column_index = vec![0; nz];
        let mut value_by_row = vec![0.0; nz];
        let mut put = start_row[..rows].to_vec();
        for j in 0..rows {
            for pos in start[j]..start[j + 1] {
                let i = row_index[pos];
                column_index[put[i]] = j;
                value_by_row[put[i]] = value[pos];
                put[i] += 1;
            }
        }

        Ok(Self {
            base,
            number: rows - base,
            start,
            row_index,
            value,
            start_row,
            column_index,
            value_by_row,
        })
    }

    pub(crate) fn nnz(&self) -> usize {
        self.row_index.len()
    }

    pub(crate) fn column(&self, j: usize) -> (&[usize], &[f64]) {
        let range = self.start[j]..self.start[j + 1];
        (&self.row_index[range.clone()], &self.value[range])
    }

    pub(crate) fn column_rows(&self, j: usize) -> &[usize] {
        &self.row_index[self.start[j]..self.start[j + 1]]
    }

    pub(crate) fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.start_row[i]..self.start_row[i + 1];
        (&self.column_index[range.clone()], &self.value_by_row[range])
    }

    pub(crate) fn row_columns(&self, i: usize) -> &[usize] {
        &self.column_index[self.start_row[i]..self.start_row[i + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_copy() {
        let lower = SparseColumns::from_columns(&[
            vec![],
            vec![(2, 0.5), (3, -1.0)],
            vec![(3, 2.0)],
            vec![],
        ]);
        let l = LowerFactor::new(&lower).unwrap();
        assert_eq!(l.base, 1);
        assert_eq!(l.number, 3);
        assert_eq!(l.nnz(), 3);
        assert_eq!(l.row(3), (&[1usize, 2][..], &[-1.0, 2.0][..]));
        assert_eq!(l.row(2), (&[1usize][..], &[0.5][..]));
        assert!(l.row(0).0.is_empty());
    }

    #[test]
    fn test_rejects_upper_entry() {
        let lower = SparseColumns::from_columns(&[vec![], vec![(0, 1.0)]]);
        assert!(matches!(
            LowerFactor::new(&lower),
            Err(FactorError::NotTriangular { factor: "L", .. })
        ));
    }

    #[test]
    fn test_empty() {
        let l = LowerFactor::new(&SparseColumns::new(3)).unwrap();
        assert_eq!(l.base, 3);
        assert_eq!(l.number, 0);
    }
}
