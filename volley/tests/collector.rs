use volley::time::MockClock;
use volley::{Collector, Config, ConfigBuilder, Error, Task};

use crossbeam_channel::{Sender, bounded, unbounded};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Reports on a channel when it is dropped.
struct DropProbe(Sender<()>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

fn mocked(clock: &MockClock) -> Config {
    ConfigBuilder::new().clock(clock.clone()).build()
}

/// Spawns a collector task that sleeps `millis` on the mock clock and
/// returns `value`.
fn run_sleeping(collector: &Collector<i32>, millis: u64, value: i32) {
    collector
        .run(move |handle| {
            handle.sleep(Duration::from_millis(millis));
            value
        })
        .unwrap();
}

#[test]
fn test_results_in_submission_order() {
    let clock = MockClock::new();
    let collector = Collector::with_config(mocked(&clock));

    run_sleeping(&collector, 5, 1);
    run_sleeping(&collector, 1, 2);
    run_sleeping(&collector, 0, 3);

    // The third task returns immediately without registering a wakeup.
    clock.block_until_waiters(2);
    clock.advance(Duration::from_millis(5));

    assert_eq!(
        collector.wait(Duration::from_millis(10)),
        Ok(vec![1, 2, 3]),
        "Results must follow submission order, not completion order"
    );
}

#[test]
fn test_results_with_system_clock() {
    let collector = Collector::new();

    for (delay, value) in [(30, "slow"), (1, "fast"), (10, "medium")] {
        collector
            .run(move |_| {
                thread::sleep(Duration::from_millis(delay));
                value
            })
            .unwrap();
    }

    assert_eq!(
        collector.wait(WAIT_TIMEOUT),
        Ok(vec!["slow", "fast", "medium"])
    );
}

#[test]
fn test_wait_twice() {
    let collector = Collector::new();
    collector.run(|_| 1).unwrap();

    assert_eq!(collector.wait(WAIT_TIMEOUT), Ok(vec![1]));
    assert_eq!(collector.wait(WAIT_TIMEOUT), Err(Error::AlreadyFinished));
}

#[test]
fn test_wait_empty_collector() {
    let collector: Collector<i32> = Collector::new();

    assert!(collector.is_empty());
    assert_eq!(collector.wait(Duration::from_millis(10)), Ok(Vec::new()));
    assert_eq!(collector.wait(Duration::from_millis(10)), Err(Error::AlreadyFinished));
}

#[test]
fn test_run_after_finished() {
    let collector = Collector::new();
    collector.run(|_| 1).unwrap();
    collector.wait(WAIT_TIMEOUT).unwrap();

    assert_eq!(collector.run(|_| 2), Err(Error::AlreadyFinished));
    assert_eq!(collector.len(), 1);
}

#[test]
fn test_wait_timeout() {
    let clock = MockClock::new();
    let collector = Collector::with_config(mocked(&clock));

    run_sleeping(&collector, 15, 1);
    run_sleeping(&collector, 20, 2);
    run_sleeping(&collector, 30, 3);
    clock.block_until_waiters(3);

    let advancer = {
        let clock = clock.clone();
        thread::spawn(move || {
            clock.block_until_waiters(4);
            clock.advance(Duration::from_millis(10));
        })
    };

    assert_eq!(collector.wait(Duration::from_millis(10)), Err(Error::Timeout));
    advancer.join().unwrap();
    assert_eq!(collector.pending(), 3);

    // A later wait resumes collecting.
    let advancer = {
        let clock = clock.clone();
        thread::spawn(move || {
            clock.block_until_waiters(4);
            clock.advance(Duration::from_millis(20));
        })
    };

    assert_eq!(collector.wait(Duration::from_millis(100)), Ok(vec![1, 2, 3]));
    advancer.join().unwrap();
    assert_eq!(collector.pending(), 0);
}

#[test]
fn test_timeout_window_restarts_on_each_arrival() {
    let clock = MockClock::new();
    let collector = Arc::new(Collector::with_config(mocked(&clock)));

    run_sleeping(&collector, 5, 1);
    run_sleeping(&collector, 10, 2);
    run_sleeping(&collector, 15, 3);
    clock.block_until_waiters(3);

    let waiter = {
        let collector = collector.clone();
        thread::spawn(move || collector.wait(Duration::from_millis(6)))
    };

    // Each arrival arms a fresh 6ms window; the stale one stays queued
    // until its deadline passes.
    clock.block_until_waiters(4);
    clock.advance(Duration::from_millis(5));
    clock.block_until_waiters(4);
    clock.advance(Duration::from_millis(5));
    clock.block_until_waiters(3);
    clock.advance(Duration::from_millis(5));

    assert_eq!(
        waiter.join().unwrap(),
        Ok(vec![1, 2, 3]),
        "15ms in total must not time out a 6ms window"
    );
}

#[test]
fn test_wait_closer_timeout_drains_every_result() {
    let clock = MockClock::new();
    let collector = Collector::with_config(mocked(&clock));

    run_sleeping(&collector, 0, 1);
    run_sleeping(&collector, 10, 2);
    run_sleeping(&collector, 15, 3);
    clock.block_until_waiters(2);

    // The wait's first window, then the one re-armed by the first arrival.
    let advancer = {
        let clock = clock.clone();
        thread::spawn(move || {
            clock.block_until_waiters(4);
            clock.advance(Duration::from_millis(5));
        })
    };

    let (closed_tx, closed_rx) = unbounded();
    let result = collector.wait_closer(Duration::from_millis(5), move |value| {
        closed_tx.send(value).unwrap();
    });
    advancer.join().unwrap();

    assert_eq!(result, Err(Error::Timeout));
    assert_eq!(
        closed_rx.recv_timeout(WAIT_TIMEOUT),
        Ok(1),
        "already received results are closed first"
    );

    clock.advance(Duration::from_millis(20));

    let mut stragglers: Vec<i32> = (0..2)
        .map(|_| closed_rx.recv_timeout(WAIT_TIMEOUT).unwrap())
        .collect();
    stragglers.sort_unstable();
    assert_eq!(stragglers, vec![2, 3]);
    assert!(
        closed_rx.recv_timeout(Duration::from_millis(20)).is_err(),
        "each result reaches the closer only once"
    );

    assert_eq!(collector.wait(WAIT_TIMEOUT), Err(Error::AlreadyFinished));
    assert_eq!(collector.run(|_| 4), Err(Error::AlreadyFinished));
}

#[test]
fn test_wait_closer_survives_panicking_closer() {
    let clock = MockClock::new();
    let collector = Collector::with_config(mocked(&clock));

    run_sleeping(&collector, 10, 1);
    run_sleeping(&collector, 20, 2);
    clock.block_until_waiters(2);

    let advancer = {
        let clock = clock.clone();
        thread::spawn(move || {
            clock.block_until_waiters(3);
            clock.advance(Duration::from_millis(5));
        })
    };

    let (closed_tx, closed_rx) = unbounded();
    let result = collector.wait_closer(Duration::from_millis(5), move |value| {
        if value == 1 {
            panic!("closer rejected {value}");
        }
        closed_tx.send(value).unwrap();
    });
    advancer.join().unwrap();
    assert_eq!(result, Err(Error::Timeout));

    clock.advance(Duration::from_millis(10));
    clock.advance(Duration::from_millis(10));

    assert_eq!(
        closed_rx.recv_timeout(WAIT_TIMEOUT),
        Ok(2),
        "the drain keeps going after the closer panics"
    );
}

#[test]
fn test_run_with_parent_follows_parent_stop() {
    let parent = Task::new(|handle| handle.wait_for_stop());
    parent.start().unwrap();

    let collector = Collector::new();
    for n in 0..2 {
        collector
            .run_with_parent(&parent.handle(), move |handle| {
                handle.wait_for_stop();
                n
            })
            .unwrap();
    }
    collector.run(|_| 2).unwrap();

    parent.stop_and_wait(WAIT_TIMEOUT).unwrap();

    assert_eq!(
        collector.wait(WAIT_TIMEOUT),
        Ok(vec![0, 1, 2]),
        "children stop with their parent"
    );
    assert_eq!(collector.stop(), 1, "only the unlinked task was not yet stopping");
}

#[test]
fn test_wait_closer_success_never_calls_closer() {
    let collector = Collector::new();
    for n in 0..3 {
        collector.run(move |_| n).unwrap();
    }

    let (closed_tx, closed_rx) = unbounded();
    let result = collector.wait_closer(WAIT_TIMEOUT, move |value| {
        closed_tx.send(value).unwrap();
    });

    assert_eq!(result, Ok(vec![0, 1, 2]));
    assert!(
        closed_rx.recv_timeout(Duration::from_millis(20)).is_err(),
        "closer must not run when the wait succeeds"
    );
}

#[test]
fn test_stop_signals_every_task() {
    let collector = Collector::new();

    for n in 0..3 {
        collector
            .run(move |handle| {
                handle.wait_for_stop();
                n
            })
            .unwrap();
    }

    assert_eq!(collector.len(), 3);
    assert_eq!(collector.pending(), 3);

    assert_eq!(collector.stop(), 3);
    assert_eq!(collector.stop(), 0, "stop is only signalled once per task");

    assert_eq!(collector.wait(WAIT_TIMEOUT), Ok(vec![0, 1, 2]));
    assert_eq!(collector.pending(), 0);
}

#[test]
fn test_run_from_many_threads() {
    let collector = Arc::new(Collector::new());

    let submitters: Vec<_> = (0..8)
        .map(|n| {
            let collector = collector.clone();
            thread::spawn(move || collector.run(move |_| n))
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap().unwrap();
    }

    let mut results = collector.wait(WAIT_TIMEOUT).unwrap();
    results.sort_unstable();

    assert_eq!(results, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_dropping_collector_releases_workers() {
    let (returned_tx, returned_rx) = bounded(0);
    let (dropped_tx, dropped_rx) = bounded(1);
    let collector = Collector::new();

    collector
        .run(move |_| {
            returned_tx.send(()).unwrap();
            DropProbe(dropped_tx)
        })
        .unwrap();

    returned_rx.recv_timeout(WAIT_TIMEOUT).unwrap();
    drop(collector);

    assert!(
        dropped_rx.recv_timeout(WAIT_TIMEOUT).is_ok(),
        "worker should give up its send once the collector is dropped"
    );
}

#[test]
#[should_panic(expected = "collector boom")]
fn test_panic_is_resumed_on_wait() {
    let collector = Collector::new();

    collector.run(|_| 1).unwrap();
    collector.run(|_| panic!("collector boom")).unwrap();

    let _ = collector.wait(WAIT_TIMEOUT);
}
