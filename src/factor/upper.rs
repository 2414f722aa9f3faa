// Copyright (C) 2022-2023 Richard Lincoln

use crate::factor::file::File;
use log::debug;

// Upper factor U, stored twice.
//
// The column file owns the entries: line c holds (row, value) for the rows
// above the diagonal of column c, values scaled by the reciprocal pivot of
// column c. The row file is an index into it: line r holds (column, slot)
// where `slot` is the position of entry (r, column) in the column file.
//
// All mutations go through the methods below so both files always describe
// the same set of entries.

#[derive(Debug, Clone)]
pub(crate) struct UStore {
    pub(crate) columns: File<f64>,
    pub(crate) rows: File<usize>,
}

impl UStore {
    pub(crate) fn new(nlines: usize, area: usize) -> Self {
        Self {
            columns: File::new(nlines, area),
            rows: File::new(nlines, area),
        }
    }

    pub(crate) fn value(&self, slot: usize) -> f64 {
        self.columns.value[slot]
    }

    /// Builds the row file from the column file. All rows `0..nrows` are laid
    /// out in order with no gaps.
    pub(crate) fn build_rows(&mut self, nrows: usize) {
        let mut count = vec![0; nrows];
        for c in self.columns.order.iter() {
            for &r in self.columns.indices(c) {
                count[r] += 1;
            }
        }
        let mut put = 0;
        for (r, &n) in count.iter().enumerate() {
            self.rows.start[r] = put;
            self.rows.count[r] = 0;
            self.rows.order.push_back(r);
            put += n;
        }
        let nlines = self.rows.nlines();
        self.rows.start[nlines] = put;

        let columns: Vec<usize> = self.columns.order.iter().collect();
        for c in columns {
            for slot in self.columns.range(c) {
                let r = self.columns.index[slot];
                let pos = self.rows.start[r] + self.rows.count[r];
                self.rows.index[pos] = c;
                self.rows.value[pos] = slot;
                self.rows.count[r] += 1;
            }
        }
    }

    /// Removes column `c` from both files.
    pub(crate) fn remove_column(&mut self, c: usize) {
        for slot in self.columns.range(c) {
            let r = self.columns.index[slot];
            if let Some(pos) = self.find_in_row(r, slot) {
                self.rows.swap_remove(r, pos);
            }
        }
        self.columns.remove_line(c);
    }

    /// Removes row `r` from both files.
    pub(crate) fn remove_row(&mut self, r: usize) {
        for pos in self.rows.range(r) {
            let c = self.rows.index[pos];
            let slot = self.rows.value[pos];
            if let Some(moved) = self.columns.swap_remove(c, slot) {
                // the entry from `moved` now lives in `slot`
                let r2 = self.columns.index[slot];
                if let Some(pos2) = self.find_in_row(r2, moved) {
                    self.rows.value[pos2] = slot;
                }
            }
        }
        self.rows.remove_line(r);
    }

    fn find_in_row(&self, r: usize, slot: usize) -> Option<usize> {
        self.rows.range(r).find(|&pos| self.rows.value[pos] == slot)
    }

    /// Stores column `c` in the column file only. If the tail is too short the
    /// column file is compressed and the row file's slots are rebased.
    pub(crate) fn store_column(&mut self, c: usize, entries: &[(usize, f64)]) -> bool {
        self.columns.remove_line(c);
        if self.columns.capacity() - self.columns.used() < entries.len() {
            self.compress_columns();
            if self.columns.capacity() - self.columns.used() < entries.len() {
                return false;
            }
        }
        self.columns.append_line(c, entries)
    }

    /// Adds the entries of column `c` to the row file.
    pub(crate) fn link_column(&mut self, c: usize, pad: usize, stretch: f64) -> bool {
        for slot in self.columns.range(c) {
            let r = self.columns.index[slot];
            if self.rows.push(r, c, slot, pad, stretch).is_none() {
                return false;
            }
        }
        true
    }

    pub(crate) fn compress_columns(&mut self) {
        let old_start = self.columns.start.clone();
        self.columns.compress();
        let rows: Vec<usize> = self.rows.order.iter().collect();
        for r in rows {
            for pos in self.rows.range(r) {
                let c = self.rows.index[pos];
                self.rows.value[pos] = self.rows.value[pos] - old_start[c] + self.columns.start[c];
            }
        }
        debug!("rebased row file after column compression");
    }

    /// Counts row file entries that do not point at a matching column entry
    /// plus column entries that no row file entry points at. `skip` is a
    /// column held only in the column file.
    pub(crate) fn consistency_errors(&self, skip: Option<usize>) -> usize {
        let mut ndiff = 0;
        let mut seen = vec![false; self.columns.capacity()];
        for r in self.rows.order.iter() {
            let (index, slots) = self.rows.entries(r);
            for (&c, &slot) in index.iter().zip(slots) {
                if self.columns.range(c).contains(&slot) && self.columns.index[slot] == r {
                    seen[slot] = true;
                } else {
                    ndiff += 1;
                }
            }
        }
        for c in self.columns.order.iter() {
            if Some(c) == skip {
                continue;
            }
            ndiff += self.columns.range(c).filter(|&slot| !seen[slot]).count();
        }
        ndiff
    }

    /// (row, column, value) triples seen through the column file.
    pub(crate) fn triples_by_column(&self, skip: Option<usize>) -> Vec<(usize, usize, f64)> {
        let mut triples = Vec::new();
        for c in self.columns.order.iter() {
            if Some(c) == skip {
                continue;
            }
            let (index, value) = self.columns.entries(c);
            triples.extend(index.iter().zip(value).map(|(&r, &x)| (r, c, x)));
        }
        triples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        triples
    }

    /// (row, column, value) triples seen through the row file.
    pub(crate) fn triples_by_row(&self) -> Vec<(usize, usize, f64)> {
        let mut triples = Vec::new();
        for r in self.rows.order.iter() {
            let (index, slots) = self.rows.entries(r);
            triples.extend(
                index
                    .iter()
                    .zip(slots)
                    .map(|(&c, &slot)| (r, c, self.value(slot))),
            );
        }
        triples.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        triples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4x4 upper factor with entries (0,1) (0,3) (1,3) (2,3)
    fn store() -> UStore {
        let mut u = UStore::new(6, 20);
        assert!(u.columns.append_line(0, &[]));
        assert!(u.columns.append_line(1, &[(0, 1.0)]));
        assert!(u.columns.append_line(2, &[]));
        assert!(u.columns.append_line(3, &[(0, 2.0), (1, 3.0), (2, 4.0)]));
        u.build_rows(4);
        u
    }

    #[test]
    fn test_build_rows() {
        let u = store();
        assert_eq!(u.consistency_errors(None), 0);
        assert_eq!(u.triples_by_row(), u.triples_by_column(None));
        assert_eq!(u.rows.indices(0), &[1, 3]);
        assert_eq!(u.rows.count[3], 0);
    }

    #[test]
    fn test_remove_row_and_column() {
        let mut u = store();
        u.remove_row(0);
        assert_eq!(u.consistency_errors(None), 0);
        assert_eq!(
            u.triples_by_column(None),
            vec![(1, 3, 3.0), (2, 3, 4.0)]
        );
        u.remove_column(3);
        assert_eq!(u.consistency_errors(None), 0);
        assert!(u.triples_by_row().is_empty());
    }

    #[test]
    fn test_link_new_column() {
        let mut u = store();
        assert!(u.store_column(4, &[(1, 5.0), (2, 6.0)]));
        assert_eq!(u.consistency_errors(Some(4)), 0);
        assert!(u.link_column(4, 0, 0.0));
        assert_eq!(u.consistency_errors(None), 0);
        assert_eq!(u.triples_by_row(), u.triples_by_column(None));
    }

    #[test]
    fn test_compress_columns_rebases_rows() {
        let mut u = UStore::new(4, 6);
        assert!(u.columns.append_line(0, &[]));
        assert!(u.columns.append_line(1, &[(0, 1.0)]));
        assert!(u.columns.append_line(2, &[(0, 2.0), (1, 3.0)]));
        u.build_rows(3);
        u.remove_column(1);

        // 3 slots left at the tail plus one gap at the front
        let spike = [(0, 7.0), (1, 8.0), (2, 9.0)];
        assert!(u.store_column(3, &spike));
        assert_eq!(u.columns.compressions, 0);

        // storing it again needs the gaps back
        assert!(u.store_column(3, &spike));
        assert_eq!(u.columns.compressions, 1);
        assert_eq!(u.columns.start[2], 0);
        assert_eq!(u.columns.start[3], 2);
        assert_eq!(u.consistency_errors(Some(3)), 0);
        assert_eq!(
            u.triples_by_row(),
            vec![(0, 2, 2.0), (1, 2, 3.0)]
        );
    }
}
