use proptest::prelude::*;
use radio_pipeline::BoundedQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PRODUCERS: usize = 8;
const CONSUMERS: usize = 8;
const PER_PRODUCER: usize = 1_000;

#[test]
fn test_stress_many_producers_many_consumers() {
    let total = PRODUCERS * PER_PRODUCER;
    let queue = Arc::new(BoundedQueue::new(16));
    let claimed = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let claimed = Arc::clone(&claimed);
            thread::spawn(move || {
                let mut popped = Vec::new();
                while claimed.fetch_add(1, Ordering::SeqCst) < total {
                    popped.push(queue.pop());
                }
                popped
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer panicked");
    }
    let mut popped: Vec<usize> = consumers
        .into_iter()
        .flat_map(|c| c.join().expect("consumer panicked"))
        .collect();

    popped.sort_unstable();
    assert_eq!(popped, (0..total).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[test]
fn test_per_producer_order_preserved_with_single_consumer() {
    let queue = Arc::new(BoundedQueue::new(4));
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..250 {
                    queue.push((p, seq));
                }
            })
        })
        .collect();

    let mut last_seen: HashMap<i32, i32> = HashMap::new();
    for _ in 0..1_000 {
        let (p, seq) = queue.pop();
        if let Some(prev) = last_seen.insert(p, seq) {
            assert!(seq > prev, "producer {p} went from {prev} to {seq}");
        }
    }
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(last_seen.len(), 4);
}

#[test]
fn test_capacity_never_exceeded() {
    let capacity = 3;
    let queue = Arc::new(BoundedQueue::new(capacity));
    let done = Arc::new(AtomicBool::new(false));

    // Samples the length from its own thread while producers sit blocked on a full queue
    let watcher = {
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut max_seen = 0;
            while !done.load(Ordering::SeqCst) {
                max_seen = max_seen.max(queue.len());
            }
            max_seen
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..50 {
                    queue.push(i);
                }
            })
        })
        .collect();

    for _ in 0..200 {
        thread::sleep(Duration::from_micros(200));
        queue.pop();
    }
    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let max_seen = watcher.join().unwrap();
    assert!(max_seen <= capacity, "saw {max_seen} items in a queue of {capacity}");
    assert_eq!(max_seen, capacity);
    assert!(queue.blocked_pushes() > 0);
    assert!(queue.is_empty());
}

#[test]
fn test_blocked_popper_receives_exact_item() {
    let queue: Arc<BoundedQueue<f32>> = Arc::new(BoundedQueue::new(2));
    let (tx, rx) = mpsc::channel();
    let popper = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || tx.send(queue.pop()).unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    assert!(rx.try_recv().is_err(), "pop returned from an empty queue");

    queue.push(-4.0);
    let value = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("popper did not wake up");
    assert_eq!(value, -4.0);
    popper.join().unwrap();
}

proptest! {
    #[test]
    fn prop_fifo_single_thread(items in proptest::collection::vec(any::<i64>(), 1..64)) {
        let queue = BoundedQueue::new(items.len());
        for &item in &items {
            queue.push(item);
        }
        let popped: Vec<i64> = (0..items.len()).map(|_| queue.pop()).collect();
        prop_assert_eq!(popped, items);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn prop_interleaved_ops_match_model(
        ops in proptest::collection::vec(any::<Option<u8>>(), 1..200),
        capacity in 1usize..8,
    ) {
        // Some(x) = try_push(x), None = try_pop(); checked against a VecDeque model
        let queue = BoundedQueue::new(capacity);
        let mut model = std::collections::VecDeque::new();
        for op in ops {
            match op {
                Some(x) => {
                    let accepted = queue.try_push(x).is_ok();
                    prop_assert_eq!(accepted, model.len() < capacity);
                    if accepted {
                        model.push_back(x);
                    }
                }
                None => prop_assert_eq!(queue.try_pop(), model.pop_front()),
            }
            prop_assert_eq!(queue.len(), model.len());
        }
    }
}
