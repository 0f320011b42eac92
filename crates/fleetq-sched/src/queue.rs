//! Queue reorder protocol

use std::collections::HashMap;
use uuid::Uuid;

use fleetq_core::{FleetError, FleetResult, QueueEntry};

/// Relocate one entry to a target position
///
/// All other entries keep their relative order; a target past the end is
/// clamped to the last position. Total and deterministic: the same inputs
/// always produce the same sequence, and a move to the entry's current
/// position returns the input order unchanged. Fails with `EntryNotFound`
/// when the id is absent.
pub fn reorder(
    queue: &[QueueEntry],
    entry_id: Uuid,
    target_position: usize,
) -> FleetResult<Vec<QueueEntry>> {
    let current = queue
        .iter()
        .position(|e| e.id == entry_id)
        .ok_or(FleetError::EntryNotFound(entry_id))?;

    let mut next = queue.to_vec();
    let entry = next.remove(current);
    let target = target_position.min(next.len());
    next.insert(target, entry);
    Ok(next)
}

/// Replace the queue with a caller-supplied full ordering
///
/// The id list must be a permutation of the current queue's ids. Any
/// unknown, missing, or duplicated id fails with `EntryNotFound` and no
/// partial order escapes: the function either returns the complete
/// replacement or nothing.
pub fn apply_order(queue: &[QueueEntry], order: &[Uuid]) -> FleetResult<Vec<QueueEntry>> {
    let mut remaining: HashMap<Uuid, QueueEntry> =
        queue.iter().map(|e| (e.id, e.clone())).collect();

    let mut next = Vec::with_capacity(queue.len());
    for id in order {
        let entry = remaining
            .remove(id)
            .ok_or(FleetError::EntryNotFound(*id))?;
        next.push(entry);
    }

    if let Some(id) = remaining.keys().next() {
        return Err(FleetError::EntryNotFound(*id));
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetq_core::Priority;

    fn create_test_queue(len: usize) -> Vec<QueueEntry> {
        (0..len)
            .map(|i| {
                QueueEntry::new(
                    format!("team-{i}"),
                    format!("user-{i}"),
                    1,
                    Priority::Normal,
                )
            })
            .collect()
    }

    fn ids(queue: &[QueueEntry]) -> Vec<Uuid> {
        queue.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_reorder_moves_entry() {
        let queue = create_test_queue(3);
        let moved = reorder(&queue, queue[0].id, 2).unwrap();
        assert_eq!(
            ids(&moved),
            vec![queue[1].id, queue[2].id, queue[0].id]
        );
    }

    #[test]
    fn test_reorder_preserves_relative_order() {
        let queue = create_test_queue(5);
        let moved = reorder(&queue, queue[3].id, 1).unwrap();
        assert_eq!(
            ids(&moved),
            vec![queue[0].id, queue[3].id, queue[1].id, queue[2].id, queue[4].id]
        );
    }

    #[test]
    fn test_reorder_noop_move_is_identity() {
        let queue = create_test_queue(4);
        let moved = reorder(&queue, queue[2].id, 2).unwrap();
        assert_eq!(ids(&moved), ids(&queue));
    }

    #[test]
    fn test_reorder_round_trip_restores_order() {
        let queue = create_test_queue(4);
        let there = reorder(&queue, queue[0].id, 3).unwrap();
        let back = reorder(&there, queue[0].id, 0).unwrap();
        assert_eq!(ids(&back), ids(&queue));
    }

    #[test]
    fn test_reorder_clamps_target_to_end() {
        let queue = create_test_queue(3);
        let moved = reorder(&queue, queue[0].id, 99).unwrap();
        assert_eq!(moved.last().unwrap().id, queue[0].id);
    }

    #[test]
    fn test_reorder_unknown_entry() {
        let queue = create_test_queue(2);
        let missing = Uuid::new_v4();
        match reorder(&queue, missing, 0) {
            Err(FleetError::EntryNotFound(id)) => assert_eq!(id, missing),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_apply_order_permutes() {
        let queue = create_test_queue(3);
        let order = vec![queue[2].id, queue[0].id, queue[1].id];
        let next = apply_order(&queue, &order).unwrap();
        assert_eq!(ids(&next), order);
        assert_eq!(next[0].team, queue[2].team);
    }

    #[test]
    fn test_apply_order_rejects_unknown_id() {
        let queue = create_test_queue(2);
        let order = vec![queue[0].id, Uuid::new_v4()];
        assert!(apply_order(&queue, &order).is_err());
    }

    #[test]
    fn test_apply_order_rejects_missing_id() {
        let queue = create_test_queue(3);
        let order = vec![queue[0].id, queue[1].id];
        assert!(apply_order(&queue, &order).is_err());
    }

    #[test]
    fn test_apply_order_rejects_duplicate_id() {
        let queue = create_test_queue(3);
        let order = vec![queue[0].id, queue[0].id, queue[1].id];
        assert!(apply_order(&queue, &order).is_err());
    }
}
