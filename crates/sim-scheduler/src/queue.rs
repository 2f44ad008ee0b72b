//! Priority queue of task identities.
//!
//! Higher priorities dequeue first; equal priorities dequeue in submission
//! order. Each task appears at most once.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::{Priority, TaskId};

/// Returned by [`TaskQueue::take_next`] when nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("task queue is empty")]
pub struct QueueEmpty;

type QueueKey = (Reverse<Priority>, u64);

/// Where a task sat in the queue when it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePosition(QueueKey);

/// Ordered task queue with O(1) emptiness checks and by-id updates.
#[derive(Debug, Default, Clone)]
pub struct TaskQueue {
    order: BTreeMap<QueueKey, TaskId>,
    keys: HashMap<TaskId, QueueKey>,
    next_seq: u64,
}

impl TaskQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `id` at `priority`. A task already queued has its priority
    /// overwritten and moves behind its new equal-priority peers.
    pub fn submit(&mut self, id: TaskId, priority: Priority) {
        self.remove(id);
        let key = (Reverse(priority), self.next_seq);
        self.next_seq += 1;
        self.order.insert(key, id);
        self.keys.insert(id, key);
    }

    /// Removes and returns the highest-priority task.
    ///
    /// # Errors
    ///
    /// Returns [`QueueEmpty`] when nothing is queued.
    pub fn take_next(&mut self) -> Result<TaskId, QueueEmpty> {
        self.take_next_with_position().map(|(id, _)| id)
    }

    /// Like [`take_next`](Self::take_next), also returning the position the
    /// task held so it can be put back with [`requeue`](Self::requeue).
    ///
    /// # Errors
    ///
    /// Returns [`QueueEmpty`] when nothing is queued.
    pub fn take_next_with_position(&mut self) -> Result<(TaskId, QueuePosition), QueueEmpty> {
        let (key, id) = self.order.pop_first().ok_or(QueueEmpty)?;
        self.keys.remove(&id);
        Ok((id, QueuePosition(key)))
    }

    /// Puts `id` back at `position`, ahead of equal-priority tasks queued
    /// after it was taken.
    pub fn requeue(&mut self, id: TaskId, position: QueuePosition) {
        self.remove(id);
        self.order.insert(position.0, id);
        self.keys.insert(id, position.0);
    }

    /// Removes `id`, returning the priority it was queued at.
    pub fn remove(&mut self, id: TaskId) -> Option<Priority> {
        let key = self.keys.remove(&id)?;
        self.order.remove(&key);
        Some(key.0 .0)
    }

    /// Priority `id` is queued at.
    #[must_use]
    pub fn priority(&self, id: TaskId) -> Option<Priority> {
        self.keys.get(&id).map(|key| key.0 .0)
    }

    /// Returns true if `id` is queued.
    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Iterates queued tasks in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, Priority)> + '_ {
        self.order.iter().map(|(key, id)| (*id, key.0 .0))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{QueueEmpty, TaskQueue};
    use crate::TaskId;

    fn id(raw: u64) -> TaskId {
        TaskId::new(raw)
    }

    #[test]
    fn empty_queue_reports_queue_empty() {
        let mut queue = TaskQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.take_next(), Err(QueueEmpty));
    }

    #[test]
    fn higher_priority_dequeues_first_and_ties_are_fifo() {
        let mut queue = TaskQueue::new();
        queue.submit(id(1), 1);
        queue.submit(id(2), 2);
        queue.submit(id(3), 1);
        queue.submit(id(4), 2);

        let order: Vec<_> = std::iter::from_fn(|| queue.take_next().ok()).collect();
        assert_eq!(order, vec![id(2), id(4), id(1), id(3)]);
    }

    #[test]
    fn resubmitting_overwrites_priority_without_duplicating() {
        let mut queue = TaskQueue::new();
        queue.submit(id(1), 1);
        queue.submit(id(2), 3);
        queue.submit(id(1), 5);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.priority(id(1)), Some(5));
        assert_eq!(queue.take_next(), Ok(id(1)));
        assert_eq!(queue.take_next(), Ok(id(2)));
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_drops_only_the_named_task() {
        let mut queue = TaskQueue::new();
        queue.submit(id(1), 1);
        queue.submit(id(2), 1);
        assert_eq!(queue.remove(id(1)), Some(1));
        assert_eq!(queue.remove(id(1)), None);
        assert!(!queue.contains(id(1)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![(id(2), 1)]);
    }

    #[test]
    fn requeue_restores_the_original_place() {
        let mut queue = TaskQueue::new();
        queue.submit(id(1), 1);
        queue.submit(id(2), 1);
        let (taken, position) = queue.take_next_with_position().expect("queued");
        assert_eq!(taken, id(1));
        queue.submit(id(3), 1);

        queue.requeue(taken, position);
        assert_eq!(queue.priority(taken), Some(1));
        let order: Vec<_> = std::iter::from_fn(|| queue.take_next().ok()).collect();
        assert_eq!(order, vec![id(1), id(2), id(3)]);
    }

    proptest! {
        #[test]
        fn dequeue_order_is_priority_then_submission(priorities in prop::collection::vec(-5i32..5, 0..64)) {
            let mut queue = TaskQueue::new();
            for (raw, priority) in priorities.iter().enumerate() {
                queue.submit(id(raw as u64), *priority);
            }

            let mut expected: Vec<_> = priorities
                .iter()
                .enumerate()
                .map(|(raw, priority)| (id(raw as u64), *priority))
                .collect();
            expected.sort_by_key(|(task, priority)| (std::cmp::Reverse(*priority), *task));

            prop_assert_eq!(queue.iter().collect::<Vec<_>>(), expected.clone());
            let drained: Vec<_> = std::iter::from_fn(|| queue.take_next().ok()).collect();
            prop_assert_eq!(drained, expected.into_iter().map(|(task, _)| task).collect::<Vec<_>>());
        }
    }
}
