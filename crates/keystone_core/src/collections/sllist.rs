//! Singly linked list primitives over index-linked nodes.
//!
//! Nodes live in a caller-owned slice (an arena column, a `Vec`, a fixed
//! buffer). A list is just a head index; each node stores the index of its
//! successor. Linking and unlinking never moves node storage.

/// A node that stores the index of its successor.
pub trait Linked {
    /// Index of the next node, `None` at the tail.
    fn next(&self) -> Option<usize>;

    /// Relinks this node.
    fn set_next(&mut self, next: Option<usize>);
}

/// Links `index` in front of the list.
pub fn prepend<N: Linked>(nodes: &mut [N], head: &mut Option<usize>, index: usize) {
    nodes[index].set_next(*head);
    *head = Some(index);
}

/// Links `index` after the current tail. O(n) in the list length.
pub fn append<N: Linked>(nodes: &mut [N], head: &mut Option<usize>, index: usize) {
    let tail = iter(nodes, *head).last();
    match tail {
        Some(tail) => splice_after(nodes, tail, index),
        None => {
            nodes[index].set_next(None);
            *head = Some(index);
        }
    }
}

/// Links `index` directly after node `after`.
pub fn splice_after<N: Linked>(nodes: &mut [N], after: usize, index: usize) {
    let next = nodes[after].next();
    nodes[index].set_next(next);
    nodes[after].set_next(Some(index));
}

/// Unlinks `index`. Returns `false` when it is not in the list.
pub fn remove<N: Linked>(nodes: &mut [N], head: &mut Option<usize>, index: usize) -> bool {
    if *head == Some(index) {
        *head = nodes[index].next();
        nodes[index].set_next(None);
        return true;
    }

    let Some(previous) = iter(nodes, *head).find(|&node| nodes[node].next() == Some(index)) else {
        return false;
    };
    let next = nodes[index].next();
    nodes[previous].set_next(next);
    nodes[index].set_next(None);
    true
}

/// Iterates node indices from `head` in link order.
pub fn iter<N: Linked>(nodes: &[N], head: Option<usize>) -> impl Iterator<Item = usize> + '_ {
    std::iter::successors(head, move |&index| nodes[index].next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Default)]
    struct Node {
        next: Option<usize>,
    }

    impl Linked for Node {
        fn next(&self) -> Option<usize> {
            self.next
        }

        fn set_next(&mut self, next: Option<usize>) {
            self.next = next;
        }
    }

    fn collect(nodes: &[Node], head: Option<usize>) -> Vec<usize> {
        iter(nodes, head).collect()
    }

    #[test]
    fn test_prepend_and_append() {
        let mut nodes = [Node::default(); 4];
        let mut head = None;
        append(&mut nodes, &mut head, 1);
        append(&mut nodes, &mut head, 2);
        prepend(&mut nodes, &mut head, 3);
        assert_eq!(collect(&nodes, head), vec![3, 1, 2]);
    }

    #[test]
    fn test_splice_after() {
        let mut nodes = [Node::default(); 4];
        let mut head = None;
        append(&mut nodes, &mut head, 0);
        append(&mut nodes, &mut head, 1);
        splice_after(&mut nodes, 0, 2);
        assert_eq!(collect(&nodes, head), vec![0, 2, 1]);
    }

    #[test]
    fn test_remove() {
        let mut nodes = [Node::default(); 4];
        let mut head = None;
        for index in 0..4 {
            append(&mut nodes, &mut head, index);
        }

        assert!(remove(&mut nodes, &mut head, 2));
        assert_eq!(collect(&nodes, head), vec![0, 1, 3]);
        assert!(remove(&mut nodes, &mut head, 0));
        assert_eq!(collect(&nodes, head), vec![1, 3]);
        assert!(!remove(&mut nodes, &mut head, 2));
        assert!(remove(&mut nodes, &mut head, 3));
        assert_eq!(collect(&nodes, head), vec![1]);
    }

    #[test]
    fn test_empty_list() {
        let nodes: [Node; 0] = [];
        assert_eq!(iter(&nodes, None).count(), 0);
    }
}
