//! Fixed-capacity ring of formatted log lines
//!
//! Keeps the tail of a vertex's output for error replay once the full log
//! has been printed and dropped.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, overwriting the oldest one when full.
    pub fn push(&mut self, line: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.lines.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(ring: &LogRing) -> Vec<String> {
        ring.iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect()
    }

    #[test]
    fn test_keeps_insertion_order_below_capacity() {
        let mut ring = LogRing::new(3);
        ring.push(b"a".to_vec());
        ring.push(b"b".to_vec());

        assert_eq!(ring.len(), 2);
        assert_eq!(collect(&ring), vec!["a", "b"]);
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let mut ring = LogRing::new(3);
        for line in ["1", "2", "3", "4", "5"] {
            ring.push(line.as_bytes().to_vec());
        }

        assert_eq!(ring.len(), 3);
        assert_eq!(collect(&ring), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_zero_capacity_drops_everything() {
        let mut ring = LogRing::new(0);
        ring.push(b"x".to_vec());
        assert!(ring.is_empty());
    }
}
