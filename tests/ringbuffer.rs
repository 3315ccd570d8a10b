#![cfg(not(loom))]

use rpcprof::buffer::{BadCapacity, CircularBuffer};

fn drain_values(buffer: &CircularBuffer<u32>) -> Vec<u32> {
    buffer.drain().into_iter().map(|v| *v).collect()
}

#[test]
fn half_fill_preserves_order() {
    let size = 1u32 << 10;
    let buffer = CircularBuffer::with_capacity(size).expect("valid capacity");

    for i in 0..size / 2 {
        buffer.push(Box::new(i));
    }
    let result = drain_values(&buffer);
    assert_eq!(result.len() as u32, size / 2);
    for (i, value) in result.iter().enumerate() {
        assert_eq!(*value, i as u32);
    }

    // Second cycle on the (now reset) other queue behaves identically.
    for i in 0..size / 2 {
        buffer.push(Box::new(size + i));
    }
    let result = drain_values(&buffer);
    assert_eq!(result.len() as u32, size / 2);
    for (i, value) in result.iter().enumerate() {
        assert_eq!(*value, size + i as u32);
    }
}

#[test]
fn overflow_keeps_last_capacity_values() {
    let size = 1u32 << 10;
    let buffer = CircularBuffer::with_capacity(size).expect("valid capacity");

    for i in 0..size + size / 2 {
        buffer.push(Box::new(2 * size + i));
    }
    let result = drain_values(&buffer);
    assert_eq!(result.len() as u32, size);

    // Oldest retained value is the first of the last `size` pushes.
    let mut expected = 2 * size + size / 2;
    for value in result {
        assert_eq!(value, expected);
        expected += 1;
    }
}

#[test]
fn many_pushes_to_the_same_slots() {
    let buffer = CircularBuffer::with_capacity(4).expect("valid capacity");
    for i in 0..1024u32 {
        buffer.push(Box::new(i));
    }
    assert_eq!(drain_values(&buffer), vec![1020, 1021, 1022, 1023]);
}

#[test]
fn drain_of_empty_buffer_is_empty() {
    let buffer = CircularBuffer::<u32>::with_capacity(8).expect("valid capacity");
    assert!(buffer.drain().is_empty());
    assert!(buffer.drain().is_empty());
}

#[test]
fn exact_fill_then_drain() {
    let size = 1u32 << 6;
    let buffer = CircularBuffer::with_capacity(size).expect("valid capacity");
    for i in 0..size {
        buffer.push(Box::new(i));
    }
    let result = drain_values(&buffer);
    assert_eq!(result, (0..size).collect::<Vec<_>>());
}

#[test]
fn repeated_cycles_stay_consistent() {
    // Exercises the counter reset: each drained queue must behave like new.
    let size = 1u32 << 4;
    let buffer = CircularBuffer::with_capacity(size).expect("valid capacity");
    for cycle in 0..10u32 {
        let count = (cycle % 3) * size / 2 + 1; // under, over, and at capacity
        for i in 0..count {
            buffer.push(Box::new(cycle * 1000 + i));
        }
        let result = drain_values(&buffer);
        let expected_len = count.min(size);
        assert_eq!(result.len() as u32, expected_len, "cycle {cycle}");
        let first = cycle * 1000 + count - expected_len;
        for (offset, value) in result.iter().enumerate() {
            assert_eq!(*value, first + offset as u32, "cycle {cycle}");
        }
    }
}

#[test]
fn rejects_invalid_capacities() {
    for capacity in [0u32, 3, 5, 6, 7, 1000] {
        let result = CircularBuffer::<u32>::with_capacity(capacity);
        assert_eq!(result.err(), Some(BadCapacity(capacity)));
    }
}

#[test]
fn accepts_all_power_of_two_capacities() {
    for k in 0..=20u32 {
        let capacity = 1u32 << k;
        let buffer = CircularBuffer::<u32>::with_capacity(capacity)
            .unwrap_or_else(|e| panic!("capacity {capacity}: {e}"));
        assert_eq!(buffer.capacity(), capacity);
    }
}

#[test]
fn drained_length_never_exceeds_capacity() {
    let size = 8u32;
    let buffer = CircularBuffer::with_capacity(size).expect("valid capacity");
    for pushes in [0u32, 1, 7, 8, 9, 63] {
        for i in 0..pushes {
            buffer.push(Box::new(i));
        }
        let len = buffer.drain().len() as u32;
        assert_eq!(len, pushes.min(size));
    }
}

#[test]
fn bad_capacity_message_names_the_value() {
    let err = CircularBuffer::<u32>::with_capacity(1000).unwrap_err();
    assert_eq!(
        err.to_string(),
        "capacity must be a nonzero power of two, got 1000"
    );
}
