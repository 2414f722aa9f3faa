// Copyright (C) 2022-2023 Richard Lincoln

// Depth first search in the graph of a triangular factor.

/// Computes the nodes reachable from `roots` by depth first search, using an
/// explicit stack with one edge cursor per frame.
///
/// `neighbours(j)` lists the nodes depending on `j`. Nodes are written to
/// `list` in the order in which they finish; the return value is their
/// number. Walking `list[..n]` backwards visits each node before any of its
/// neighbours.
///
/// `mark` must be zero for every node on entry. A node is marked 2 while it
/// is on the stack and 1 once finished; the caller resets the marks of the
/// listed nodes. Roots that are already marked are skipped.
pub(crate) fn reach<'a, F>(
    roots: &[usize],
    neighbours: F,
    stack: &mut [usize],
    next: &mut [usize],
    list: &mut [usize],
    mark: &mut [u8],
) -> usize
where
    F: Fn(usize) -> &'a [usize],
{
    let mut nlist = 0;
    for &root in roots {
        if mark[root] != 0 {
            continue;
        }
        stack[0] = root;
        next[0] = neighbours(root).len();
        mark[root] = 2;
        let mut head = 1;
        while head > 0 {
            let j = stack[head - 1];
            let cursor = next[head - 1];
            if cursor == 0 {
                // node j has no unvisited neighbours
                head -= 1;
                list[nlist] = j;
                nlist += 1;
                mark[j] = 1;
            } else {
                next[head - 1] = cursor - 1;
                let k = neighbours(j)[cursor - 1];
                if mark[k] == 0 {
                    stack[head] = k;
                    next[head] = neighbours(k).len();
                    mark[k] = 2;
                    head += 1;
                }
            }
        }
    }
    nlist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reach_topological() {
        // 0 -> 2, 0 -> 3, 2 -> 3, 1 -> 4
        let graph: Vec<Vec<usize>> = vec![vec![2, 3], vec![4], vec![3], vec![], vec![]];
        let mut stack = vec![0; 5];
        let mut next = vec![0; 5];
        let mut list = vec![0; 5];
        let mut mark = vec![0u8; 5];

        let n = reach(
            &[0],
            |j| graph[j].as_slice(),
            &mut stack,
            &mut next,
            &mut list,
            &mut mark,
        );
        assert_eq!(n, 3);
        let order: Vec<usize> = list[..n].iter().rev().copied().collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert!(mark[..4].iter().zip([1, 0, 1, 1]).all(|(&m, e)| m == e));
        assert_eq!(mark[4], 0);

        // an already finished node is not listed again
        let n = reach(
            &[3, 1],
            |j| graph[j].as_slice(),
            &mut stack,
            &mut next,
            &mut list,
            &mut mark,
        );
        assert_eq!(&list[..n], &[4, 1]);
    }
}
