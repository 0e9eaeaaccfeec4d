use super::*;
use std::sync::Arc;
use std::time::Duration;

fn op(ordinal: u8) -> Operation {
    Operation::from_ordinal(ordinal).unwrap()
}

#[test]
fn drains_by_priority_then_submission_order() {
    let q = OpQueue::new();
    for (tag, ordinal) in [("a", 3), ("b", 1), ("c", 5), ("d", 1)] {
        q.push(op(ordinal), tag).unwrap();
    }
    let mut out = Vec::new();
    while let Some((o, tag)) = q.try_pop() {
        out.push((o.ordinal(), tag));
    }
    assert_eq!(out, vec![(5, "c"), (3, "a"), (1, "b"), (1, "d")]);
}

#[test]
fn stop_preempts_a_flood_of_renders() {
    let q = OpQueue::new();
    for i in 0..100 {
        q.push(Operation::RenderModels, i).unwrap();
    }
    q.push(Operation::Stop, 999).unwrap();
    assert_eq!(q.try_pop(), Some((Operation::Stop, 999)));
    assert_eq!(q.len(), 100);
}

#[test]
fn pop_blocks_until_a_producer_pushes() {
    let q = Arc::new(OpQueue::new());
    let producer = {
        let q = q.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            q.push(Operation::BlitToScreen, 7u32).unwrap();
        })
    };
    assert_eq!(q.pop(), Some((Operation::BlitToScreen, 7)));
    producer.join().unwrap();
}

#[test]
fn purge_removes_only_matching_operations() {
    let q = OpQueue::new();
    q.push(Operation::Animate, 1).unwrap();
    q.push(Operation::RenderModels, 2).unwrap();
    q.push(Operation::Animate, 3).unwrap();
    assert_eq!(q.purge(|o| o == Operation::Animate), 2);
    assert_eq!(q.try_pop(), Some((Operation::RenderModels, 2)));
    assert_eq!(q.try_pop(), None);
}

#[test]
fn closed_queue_rejects_pushes_and_unblocks_consumers() {
    let q = Arc::new(OpQueue::new());
    q.push(Operation::Resize, 'r').unwrap();
    let pending = q.close();
    assert_eq!(pending, vec![(Operation::Resize, 'r')]);
    assert!(q.is_closed());
    assert!(matches!(
        q.push(Operation::Stop, 's'),
        Err(FitError::EngineStopped)
    ));
    assert_eq!(q.pop(), None);
}
