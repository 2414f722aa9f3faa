// Copyright (C) 2022-2023 Richard Lincoln

use crate::factor::list::LinkedList;
use log::debug;
use std::ops::Range;

// Data file implementation
//
// A data file stores lines of (index, value) pairs. Entries of each line are
// contiguous in memory. Lines can be in any order in memory and there can be
// gaps between consecutive lines.
//
//     index, value    storing (index, value) pairs
//     start[k]        first slot of line 0 <= k < nlines
//     count[k]        number of entries in line k
//     start[nlines]   first slot of unused space at the end of the file
//
// `order` links the lines that occupy memory in the order in which they
// appear. Lines outside the list are empty. The room of a line is the gap up
// to the next line in memory, or up to the capacity for the last line.

#[derive(Debug, Clone)]
pub(crate) struct File<T> {
    pub(crate) start: Vec<usize>,
    pub(crate) count: Vec<usize>,
    pub(crate) order: LinkedList,
    pub(crate) index: Vec<usize>,
    pub(crate) value: Vec<T>,
    pub(crate) compressions: usize,
}

impl<T: Copy + Default> File<T> {
    /// Empty file of `nlines` lines and `capacity` slots.
    pub(crate) fn new(nlines: usize, capacity: usize) -> Self {
        Self {
            start: vec![0; nlines + 1],
            count: vec![0; nlines],
            order: LinkedList::new(nlines),
            index: vec![0; capacity],
            value: vec![T::default(); capacity],
            compressions: 0,
        }
    }

    pub(crate) fn nlines(&self) -> usize {
        self.count.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.index.len()
    }

    /// First unused slot at the file end.
    pub(crate) fn used(&self) -> usize {
        self.start[self.nlines()]
    }

    /// Number of stored entries.
    pub(crate) fn live(&self) -> usize {
        self.order.iter().map(|k| self.count[k]).sum()
    }

    pub(crate) fn range(&self, line: usize) -> Range<usize> {
        self.start[line]..self.start[line] + self.count[line]
    }

    pub(crate) fn indices(&self, line: usize) -> &[usize] {
        &self.index[self.range(line)]
    }

    pub(crate) fn entries(&self, line: usize) -> (&[usize], &[T]) {
        let range = self.range(line);
        (&self.index[range.clone()], &self.value[range])
    }

    fn room(&self, line: usize) -> usize {
        let limit = match self.order.next(line) {
            Some(next) => self.start[next],
            None => self.capacity(),
        };
        limit - (self.start[line] + self.count[line])
    }

    /// Stores a new line at the file end, compressing first if the tail is too
    /// short. `line` must be empty. Returns false if even a compressed file
    /// has no room for `entries`.
    pub(crate) fn append_line(&mut self, line: usize, entries: &[(usize, T)]) -> bool {
        debug_assert_eq!(self.count[line], 0);
        self.order.remove(line);
        if self.capacity() - self.used() < entries.len() {
            self.compress();
            if self.capacity() - self.used() < entries.len() {
                return false;
            }
        }
        let mut put = self.used();
        self.start[line] = put;
        for &(i, x) in entries {
            self.index[put] = i;
            self.value[put] = x;
            put += 1;
        }
        self.count[line] = entries.len();
        self.order.push_back(line);
        let nlines = self.nlines();
        self.start[nlines] = put;
        true
    }

    /// Appends one entry to `line`. A line without room is moved to the file
    /// end first, with `pad + stretch * len` slots left behind it. Returns the
    /// slot written, or None if a compressed file cannot take the line.
    pub(crate) fn push(
        &mut self,
        line: usize,
        index: usize,
        value: T,
        pad: usize,
        stretch: f64,
    ) -> Option<usize> {
        debug_assert!(self.order.contains(line));
        if self.room(line) == 0 {
            let extra = pad + (stretch * self.count[line] as f64) as usize;
            if !self.reappend(line, extra) {
                return None;
            }
        }
        let put = self.start[line] + self.count[line];
        self.index[put] = index;
        self.value[put] = value;
        self.count[line] += 1;
        let nlines = self.nlines();
        if put + 1 > self.start[nlines] {
            self.start[nlines] = put + 1;
        }
        Some(put)
    }

    /// Moves `line` to the file end, leaving room for at least one more entry
    /// and at most `extra_space`.
    pub(crate) fn reappend(&mut self, line: usize, extra_space: usize) -> bool {
        let len = self.count[line];
        if self.capacity() - self.used() < len + 1 {
            self.compress();
            if self.capacity() - self.used() < len + 1 {
                return false;
            }
        }
        let ibeg = self.start[line];
        let put = self.used();
        self.index.copy_within(ibeg..ibeg + len, put);
        self.value.copy_within(ibeg..ibeg + len, put);
        self.start[line] = put;
        self.order.move_to_back(line);

        let room = self.capacity() - (put + len);
        let nlines = self.nlines();
        self.start[nlines] = put + len + extra_space.clamp(1, room);
        true
    }

    /// Compresses the file to reuse memory gaps. The ordering of lines in
    /// memory is unchanged and no extra space is kept between lines.
    ///
    /// Return: number of entries in file
    pub(crate) fn compress(&mut self) -> usize {
        let mut used = 0;
        let mut line = self.order.first();
        while let Some(k) = line {
            let ibeg = self.start[k];
            let len = self.count[k];
            debug_assert!(ibeg >= used);
            if ibeg > used {
                self.index.copy_within(ibeg..ibeg + len, used);
                self.value.copy_within(ibeg..ibeg + len, used);
            }
            self.start[k] = used;
            used += len;
            line = self.order.next(k);
        }
        let nlines = self.nlines();
        debug!(
            "compressed file: {} of {} slots in use, {} reclaimed",
            used,
            self.capacity(),
            self.start[nlines] - used
        );
        self.start[nlines] = used;
        self.compressions += 1;
        used
    }

    /// Empties `line` and drops it from the memory order.
    pub(crate) fn remove_line(&mut self, line: usize) {
        self.count[line] = 0;
        self.order.remove(line);
    }

    /// Links an empty line at the file end.
    pub(crate) fn push_empty(&mut self, line: usize) {
        debug_assert_eq!(self.count[line], 0);
        self.order.remove(line);
        self.start[line] = self.used();
        self.order.push_back(line);
    }

    /// Removes the entry in slot `pos` of `line` by moving the last entry of
    /// the line into it. Returns the slot the moved entry came from.
    pub(crate) fn swap_remove(&mut self, line: usize, pos: usize) -> Option<usize> {
        debug_assert!(self.range(line).contains(&pos));
        let last = self.start[line] + self.count[line] - 1;
        self.count[line] -= 1;
        if pos != last {
            self.index[pos] = self.index[last];
            self.value[pos] = self.value[last];
            Some(last)
        } else {
            None
        }
    }

    /// Keeps the entries of `line` for which `keep` is true, in order.
    pub(crate) fn retain(&mut self, line: usize, mut keep: impl FnMut(usize, T) -> bool) {
        let range = self.range(line);
        let mut put = range.start;
        for pos in range {
            let (i, x) = (self.index[pos], self.value[pos]);
            if keep(i, x) {
                self.index[put] = i;
                self.value[put] = x;
                put += 1;
            }
        }
        self.count[line] = put - self.start[line];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(file: &File<f64>, k: usize) -> Vec<(usize, f64)> {
        let (index, value) = file.entries(k);
        index.iter().copied().zip(value.iter().copied()).collect()
    }

    #[test]
    fn test_push_moves_line_to_end() {
        let mut file = File::<f64>::new(3, 12);
        assert!(file.append_line(0, &[(0, 1.0), (1, 2.0)]));
        assert!(file.append_line(1, &[(5, 3.0)]));
        assert_eq!(file.used(), 3);

        // line 0 is boxed in by line 1
        let pos = file.push(0, 7, 4.0, 2, 0.0).unwrap();
        assert_eq!(file.start[0], 3);
        assert_eq!(pos, 5);
        assert_eq!(file.used(), 3 + 2 + 2);
        assert_eq!(line(&file, 0), vec![(0, 1.0), (1, 2.0), (7, 4.0)]);
        assert_eq!(file.order.iter().collect::<Vec<_>>(), vec![1, 0]);

        // the last line grows in place into its extra space
        file.push(0, 8, 5.0, 2, 0.0).unwrap();
        assert_eq!(file.start[0], 3);
        assert_eq!(file.count[0], 4);
    }

    #[test]
    fn test_compress_reclaims_gaps() {
        let mut file = File::<f64>::new(3, 8);
        assert!(file.append_line(0, &[(0, 1.0), (1, 2.0), (2, 3.0)]));
        assert!(file.append_line(1, &[(3, 4.0)]));
        assert!(file.append_line(2, &[(4, 5.0), (5, 6.0)]));
        file.remove_line(0);

        // 2 free slots at the end, line 1 needs 2 to move
        assert!(file.push(1, 9, 7.0, 4, 0.0).is_some());
        assert_eq!(file.compressions, 0);
        assert_eq!(file.start[1], 6);

        // no room left at the tail: line 2 forces a compression
        assert!(file.push(2, 6, 8.0, 0, 0.0).is_some());
        assert_eq!(file.compressions, 1);
        assert_eq!(line(&file, 2), vec![(4, 5.0), (5, 6.0), (6, 8.0)]);
        assert_eq!(line(&file, 1), vec![(3, 4.0), (9, 7.0)]);
        assert_eq!(file.live(), 5);
    }

    #[test]
    fn test_push_fails_when_full() {
        let mut file = File::<f64>::new(2, 3);
        assert!(file.append_line(0, &[(0, 1.0), (1, 1.0)]));
        assert!(file.append_line(1, &[(0, 1.0)]));
        assert_eq!(file.push(0, 2, 1.0, 0, 0.0), None);
        assert_eq!(file.count[0], 2);
    }

    #[test]
    fn test_swap_remove_and_retain() {
        let mut file = File::<f64>::new(1, 4);
        assert!(file.append_line(0, &[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)]));
        assert_eq!(file.swap_remove(0, 1), Some(3));
        assert_eq!(line(&file, 0), vec![(0, 1.0), (3, 4.0), (2, 3.0)]);
        assert_eq!(file.swap_remove(0, 2), None);
        file.retain(0, |i, _| i != 0);
        assert_eq!(line(&file, 0), vec![(3, 4.0)]);
    }
}
