// Copyright (C) 2022-2023 Richard Lincoln

// Doubly linked list over the elements 0..n-1 with the head at index n.
//
// The implementation uses arrays
//
//     next[0..n], prev[0..n]
//
//     next[i]  element after i in the list
//     prev[i]  element before i in the list
//     next[n]  first element
//     prev[n]  last element
//
// The forward link of the last element points to the head, as does the
// backward link of the first element. For an empty list the head points to
// itself. When an element is not in the list its links point to itself.

#[derive(Debug, Clone)]
pub(crate) struct LinkedList {
    next: Vec<usize>,
    prev: Vec<usize>,
}

impl LinkedList {
    /// Empty list able to hold the elements `0..n`.
    pub(crate) fn new(n: usize) -> Self {
        Self {
            next: (0..=n).collect(),
            prev: (0..=n).collect(),
        }
    }

    fn head(&self) -> usize {
        self.next.len() - 1
    }

    fn link(&self, i: usize) -> Option<usize> {
        if i == self.head() {
            None
        } else {
            Some(i)
        }
    }

    pub(crate) fn first(&self) -> Option<usize> {
        self.link(self.next[self.head()])
    }

    /// Element following `elem`, which must be in the list.
    pub(crate) fn next(&self, elem: usize) -> Option<usize> {
        debug_assert!(self.contains(elem));
        self.link(self.next[elem])
    }

    pub(crate) fn contains(&self, elem: usize) -> bool {
        self.next[elem] != elem
    }

    /// Appends `elem`, which must not be in the list already.
    pub(crate) fn push_back(&mut self, elem: usize) {
        assert!(!self.contains(elem));
        let head = self.head();
        let temp = self.prev[head];
        self.prev[head] = elem;
        self.prev[elem] = temp;
        self.next[temp] = elem;
        self.next[elem] = head;
    }

    /// Unlinks `elem`. Does nothing if `elem` is not in the list.
    pub(crate) fn remove(&mut self, elem: usize) {
        let (next, prev) = (self.next[elem], self.prev[elem]);
        self.next[prev] = next;
        self.prev[next] = prev;
        self.next[elem] = elem;
        self.prev[elem] = elem;
    }

    pub(crate) fn move_to_back(&mut self, elem: usize) {
        self.remove(elem);
        self.push_back(elem);
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            at: self.first(),
        }
    }
}

pub(crate) struct Iter<'a> {
    list: &'a LinkedList,
    at: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let elem = self.at?;
        self.at = self.list.next(elem);
        Some(elem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_order() {
        let mut list = LinkedList::new(5);
        assert_eq!(list.first(), None);
        for i in [3, 0, 4] {
            list.push_back(i);
        }
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![3, 0, 4]);

        list.move_to_back(3);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 4, 3]);
        assert_eq!(list.iter().last(), Some(3));

        list.remove(4);
        assert!(!list.contains(4));
        list.remove(4);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 3]);

        list.remove(0);
        list.remove(3);
        assert_eq!(list.first(), None);
        assert_eq!(list.iter().count(), 0);
    }
}
