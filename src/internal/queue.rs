//! Per-CPort transmit queue.
//!
//! Holds descriptor tags in enqueue order. Only the head may own a channel,
//! so flushing never has to look past the front entry.

use heapless::Deque;

use crate::driver::callback::ResetCompletion;
use crate::hal::XferTag;

pub(crate) struct CPortQueue<const N: usize> {
    fifo: Deque<XferTag, N>,
    /// A reset was requested; new sends are refused until it is carried out
    pub pending_reset: bool,
    pub reset_completion: Option<ResetCompletion>,
}

impl<const N: usize> CPortQueue<N> {
    pub const fn new() -> Self {
        Self {
            fifo: Deque::new(),
            pending_reset: false,
            reset_completion: None,
        }
    }

    #[inline]
    pub fn push_back(&mut self, tag: XferTag) -> Result<(), XferTag> {
        self.fifo.push_back(tag)
    }

    #[inline]
    pub fn front(&self) -> Option<XferTag> {
        self.fifo.front().copied()
    }

    #[inline]
    pub fn back(&self) -> Option<XferTag> {
        self.fifo.back().copied()
    }

    #[inline]
    pub fn pop_back(&mut self) -> Option<XferTag> {
        self.fifo.pop_back()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    /// Unlink `tag`, preserving the order of the remaining entries
    pub fn remove(&mut self, tag: XferTag) -> bool {
        if self.fifo.front() == Some(&tag) {
            self.fifo.pop_front();
            return true;
        }

        let mut found = false;
        for _ in 0..self.fifo.len() {
            if let Some(entry) = self.fifo.pop_front() {
                if entry == tag && !found {
                    found = true;
                } else {
                    let _ = self.fifo.push_back(entry);
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    fn tags(queue: &mut CPortQueue<4>) -> Vec<XferTag> {
        let mut out = Vec::new();
        while let Some(tag) = queue.pop_back() {
            out.push(tag);
        }
        out.reverse();
        out
    }

    #[test]
    fn fifo_order() {
        let mut queue: CPortQueue<4> = CPortQueue::new();
        queue.push_back(XferTag::new(0, 0)).unwrap();
        queue.push_back(XferTag::new(1, 0)).unwrap();

        assert_eq!(queue.front(), Some(XferTag::new(0, 0)));
        assert_eq!(queue.back(), Some(XferTag::new(1, 0)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn push_beyond_capacity_fails() {
        let mut queue: CPortQueue<4> = CPortQueue::new();
        for slot in 0..4 {
            queue.push_back(XferTag::new(slot, 0)).unwrap();
        }

        assert!(queue.push_back(XferTag::new(9, 0)).is_err());
    }

    #[test]
    fn remove_middle_keeps_order() {
        let mut queue: CPortQueue<4> = CPortQueue::new();
        for slot in 0..4 {
            queue.push_back(XferTag::new(slot, 0)).unwrap();
        }

        assert!(queue.remove(XferTag::new(2, 0)));
        assert!(!queue.remove(XferTag::new(2, 0)));

        assert_eq!(
            tags(&mut queue),
            [XferTag::new(0, 0), XferTag::new(1, 0), XferTag::new(3, 0)]
        );
    }

    #[test]
    fn remove_head() {
        let mut queue: CPortQueue<4> = CPortQueue::new();
        queue.push_back(XferTag::new(5, 1)).unwrap();
        queue.push_back(XferTag::new(6, 1)).unwrap();

        assert!(queue.remove(XferTag::new(5, 1)));
        assert_eq!(queue.front(), Some(XferTag::new(6, 1)));
        assert_eq!(queue.len(), 1);
    }
}
