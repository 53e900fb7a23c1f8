//! The wait queue: strict first-in, first-out.
//!
//! Like [`CapacityStore`](crate::CapacityStore), this is a plain
//! single-owner structure. The coordinator holds it behind its lock.

use std::collections::VecDeque;

use waitroom_protocol::SessionId;

/// One visitor waiting in line.
#[derive(Debug, Clone)]
struct WaitEntry {
    id: SessionId,
    /// Enqueue order. Strictly increasing along the queue.
    seq: u64,
}

/// Visitors waiting for a slot, oldest first.
///
/// Position is the 1-based index in the deque; there is no separate
/// position field to keep in sync.
#[derive(Debug, Default)]
pub struct WaitQueue {
    entries: VecDeque<WaitEntry>,
    next_seq: u64,
}

impl WaitQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` to the back of the line and returns its position.
    ///
    /// Enqueueing a visitor already in line is a no-op that returns their
    /// existing position, so a reconnecting browser never loses its place
    /// or appears twice.
    pub fn enqueue(&mut self, id: &SessionId) -> usize {
        if let Some(position) = self.position_of(id) {
            return position;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(WaitEntry {
            id: id.clone(),
            seq,
        });
        self.entries.len()
    }

    /// 1-based rank of `id`, or `None` if it is not waiting.
    pub fn position_of(&self, id: &SessionId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.id == id)
            .map(|index| index + 1)
    }

    /// Removes and returns the visitor at the head of the line.
    pub fn dequeue_head(&mut self) -> Option<SessionId> {
        self.entries.pop_front().map(|entry| entry.id)
    }

    /// Puts a just-dequeued visitor back at the head.
    ///
    /// Only the promotion path calls this, right after `dequeue_head`, when
    /// the freed slot turned out to be taken. The entry gets a sequence
    /// number below the current head so the queue stays ordered.
    pub fn requeue_front(&mut self, id: SessionId) {
        if self.position_of(&id).is_some() {
            return;
        }
        let seq = self
            .entries
            .front()
            .map_or(self.next_seq, |head| head.seq)
            .saturating_sub(1);
        self.entries.push_front(WaitEntry { id, seq });
    }

    /// Removes `id` from wherever it is. Returns whether it was waiting.
    pub fn remove(&mut self, id: &SessionId) -> bool {
        match self.entries.iter().position(|entry| &entry.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is waiting.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.entries.iter().any(|entry| &entry.id == id)
    }

    /// Everyone waiting, head first.
    pub fn snapshot(&self) -> Vec<SessionId> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the queue. Sequence numbers keep counting up.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether sequence numbers increase strictly from head to tail.
    #[cfg(test)]
    fn is_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.seq < b.seq)
    }
}
