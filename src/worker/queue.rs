//! Pending request queue: tasks waiting to be dispatched, lowest priority first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::QueueError;
use crate::worker::task::Task;

struct QueueItem {
    priority: i64,
    seq: u64,
    task: Task,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: invert so the lowest priority and then
        // the oldest insertion sits on top.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of not-yet-started tasks.
///
/// Equal priorities come out in insertion order.
#[derive(Default)]
pub struct PendingRequestQueue {
    heap: BinaryHeap<QueueItem>,
    next_seq: u64,
}

impl PendingRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task under the given priority.
    pub fn add(&mut self, priority: i64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueItem {
            priority,
            seq,
            task,
        });
    }

    /// Remove and return the most urgent task.
    pub fn pop(&mut self) -> Result<Task, QueueError> {
        self.heap
            .pop()
            .map(|item| item.task)
            .ok_or(QueueError::EmptyQueue)
    }

    /// Look at the most urgent task and its priority without removing it.
    pub fn peek(&self) -> Option<(i64, &Task)> {
        self.heap.peek().map(|item| (item.priority, &item.task))
    }

    /// True if any queued task sorts strictly before `threshold`.
    pub fn has_work_below(&self, threshold: i64) -> bool {
        self.peek().is_some_and(|(priority, _)| priority < threshold)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Empty the queue, returning tasks in dispatch order.
    pub fn drain_sorted(&mut self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.heap.pop() {
            tasks.push(item.task);
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Task {
        Task::background(name)
    }

    #[test]
    fn lower_priority_pops_first() {
        let mut queue = PendingRequestQueue::new();
        queue.add(10, named("later"));
        queue.add(1, named("now"));

        assert_eq!(queue.pop().unwrap().name, "now");
        assert_eq!(queue.pop().unwrap().name, "later");
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let mut queue = PendingRequestQueue::new();
        queue.add(5, named("a"));
        queue.add(1, named("first"));
        queue.add(5, named("b"));
        queue.add(5, named("c"));

        let order: Vec<String> = queue.drain_sorted().into_iter().map(|t| t.name).collect();
        assert_eq!(order, ["first", "a", "b", "c"]);
    }

    #[test]
    fn pop_order_is_non_decreasing() {
        let mut queue = PendingRequestQueue::new();
        let priorities = [7, 3, 999, 3, 1000, -2, 50, 7, 0];
        for (i, p) in priorities.iter().enumerate() {
            queue.add(*p, named(&i.to_string()));
        }

        let mut last = (i64::MIN, 0usize);
        while let Some((priority, task)) = queue.peek().map(|(p, t)| (p, t.name.clone())) {
            let index: usize = task.parse().unwrap();
            assert!(priority >= last.0);
            if priority == last.0 {
                assert!(index > last.1, "ties must come out in insertion order");
            }
            last = (priority, index);
            queue.pop().unwrap();
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_on_empty_is_an_error() {
        let mut queue = PendingRequestQueue::new();
        assert!(matches!(queue.pop(), Err(QueueError::EmptyQueue)));
    }

    #[test]
    fn peek_does_not_remove() {
        let mut queue = PendingRequestQueue::new();
        assert!(queue.peek().is_none());
        queue.add(999, Task::wait_threadpool());
        queue.add(1000, Task::force_quit());

        let (priority, task) = queue.peek().unwrap();
        assert_eq!(priority, 999);
        assert_eq!(task.name, "wait_threadpool");
        assert_eq!(queue.len(), 2);
        assert!(!queue.has_work_below(999));

        queue.add(100, named("repository_load"));
        assert!(queue.has_work_below(999));
    }
}
