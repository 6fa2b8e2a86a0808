use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use swsr::register::{Register, Timestamp, NO_VALUE_TS};
use swsr::value::ValueOps;

#[cfg(not(feature = "shuttle"))]
use std::thread;

#[cfg(not(feature = "shuttle"))]
use rand::{rngs::StdRng, Rng, SeedableRng};

/// The value written for timestamp `ts`: drawn from an RNG seeded by `ts`,
/// so the reader can recompute the expected value without sharing state
/// with the writer.
#[cfg(not(feature = "shuttle"))]
pub fn value_for(ts: Timestamp) -> u64 {
    StdRng::seed_from_u64(ts as u64).gen()
}

/// Writes per thread in the interleaved stress scenarios.
#[cfg(not(feature = "shuttle"))]
pub const STRESS_WRITES: usize = 50_000;

/// Writes per thread in the array-payload scenarios.
#[cfg(not(feature = "shuttle"))]
pub const PAYLOAD_WRITES: usize = 500;

/// Length of the array payload used to detect tearing.
pub const PAYLOAD_LEN: usize = 4096;

/// A heap-allocated array payload; `None` is the no-value sentinel.
pub type Payload = Option<Box<[i64; PAYLOAD_LEN]>>;

/// Builds the payload for timestamp `ts`: the first two elements are `ts`
/// and `ts + 1`, and every further element is the 32-bit-truncated sum of
/// the two before it.
pub fn fill_payload(ts: Timestamp) -> Payload {
    let mut array = Box::new([0; PAYLOAD_LEN]);
    for i in 0..PAYLOAD_LEN {
        array[i] = match i {
            0 => ts,
            1 => ts + 1,
            _ => (array[i - 1] + array[i - 2]) & 0xFFFFFFFF,
        };
    }
    Some(array)
}

/// Asserts that `payload` satisfies the recurrence seeded by `ts`.
///
/// The expected value of each element is recomputed from the *observed*
/// previous two, so a torn read is caught wherever the mixture starts.
pub fn assert_payload_matches(payload: &Payload, ts: Timestamp) {
    let array = payload.as_ref().expect("payload missing after a write");
    for i in 0..PAYLOAD_LEN {
        let expected = match i {
            0 => ts,
            1 => ts + 1,
            _ => (array[i - 1] + array[i - 2]) & 0xFFFFFFFF,
        };
        assert_eq!(array[i], expected, "torn payload at element {i}");
    }
}

/// Value operations that tag every copy with a fresh generation and track
/// which generations are live.
///
/// `get` asserts the source is still live and `free` asserts each copy is
/// released exactly once, so a protocol that lets the reader touch a freed
/// slot, or frees a slot twice, fails loudly.
#[derive(Clone)]
pub struct TagOps {
    live: Arc<Mutex<HashSet<u64>>>,
    next: Arc<AtomicU64>,
}

impl TagOps {
    pub fn new() -> Self {
        Self {
            live: Arc::new(Mutex::new(HashSet::new())),
            next: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

impl ValueOps<Option<u64>> for TagOps {
    fn copy(&self, value: &Option<u64>) -> Option<u64> {
        value.as_ref().map(|_| {
            let tag = self.next.fetch_add(1, Ordering::SeqCst);
            assert!(self.live.lock().unwrap().insert(tag));
            tag
        })
    }

    fn get(&self, source: &Option<u64>, dest: &mut Option<u64>) {
        if let Some(tag) = source {
            assert!(
                self.live.lock().unwrap().contains(tag),
                "value read after free"
            );
        }
        *dest = *source;
    }

    fn free(&self, value: Option<u64>) {
        if let Some(tag) = value {
            assert!(
                self.live.lock().unwrap().remove(&tag),
                "value freed twice"
            );
        }
    }
}

/// A register that has never been written reads as the sentinel.
#[cfg(not(feature = "shuttle"))]
pub fn assert_fresh_register_reads_sentinel<R: Register<Value = u64>>(register: R) {
    let (_writer, mut reader) = register.split();
    let mut value = 99;
    assert_eq!(reader.read(&mut value), NO_VALUE_TS);
    assert_eq!(value, 0);
}

/// A single write is read back verbatim.
#[cfg(not(feature = "shuttle"))]
pub fn assert_single_write_is_read<R: Register<Value = u64>>(register: R) {
    let (mut writer, mut reader) = register.split();
    writer.write(&42, 1);

    let mut value = 0;
    assert_eq!(reader.read(&mut value), 1);
    assert_eq!(value, 42);
}

/// After back-to-back writes a read returns the last one.
#[cfg(not(feature = "shuttle"))]
pub fn assert_last_write_wins<R: Register<Value = u64>>(register: R) {
    let (mut writer, mut reader) = register.split();
    writer.write(&10, 1);
    writer.write(&20, 2);
    writer.write(&30, 3);

    let mut value = 0;
    assert_eq!(reader.read(&mut value), 3);
    assert_eq!(value, 30);
}

/// Reads with no interleaved write return the same value and timestamp.
#[cfg(not(feature = "shuttle"))]
pub fn assert_read_is_idempotent<R: Register<Value = u64>>(register: R) {
    let (mut writer, mut reader) = register.split();
    writer.write(&7, 1);

    let mut first = 0;
    let mut second = 0;
    assert_eq!(reader.read(&mut first), 1);
    assert_eq!(reader.read(&mut second), 1);
    assert_eq!(first, second);
}

/// Runs a writer of seeded random values against a concurrent reader and
/// asserts that observed timestamps never decrease, that every observed
/// timestamp was actually written, and that each value is the one written
/// with its timestamp.
#[cfg(not(feature = "shuttle"))]
pub fn assert_monotonic_timestamps<R, F>(new_register: F, writes: usize)
where
    R: Register<Value = u64> + Send + Sync + 'static,
    F: FnOnce() -> R,
{
    let (mut writer, mut reader) = new_register().split();

    let writer_thread = thread::spawn(move || {
        for ts in 1..=writes as Timestamp {
            writer.write(&value_for(ts), ts);
        }
    });
    let reader_thread = thread::spawn(move || {
        let mut value = 0;
        let mut previous = NO_VALUE_TS;
        for _ in 0..writes {
            let ts = reader.read(&mut value);
            assert!(ts >= previous, "timestamps decreased: {previous} then {ts}");
            if ts == NO_VALUE_TS {
                assert_eq!(value, 0, "sentinel read returned a written value");
            } else {
                assert!(
                    (1..=writes as Timestamp).contains(&ts),
                    "phantom timestamp {ts}"
                );
                assert_eq!(
                    value,
                    value_for(ts),
                    "value does not match the one written at ts {ts}"
                );
            }
            previous = ts;
        }
    });

    writer_thread.join().unwrap();
    reader_thread.join().unwrap();
}

/// Runs a writer of Fibonacci-seeded array payloads against a concurrent
/// reader that re-checks the recurrence on every read.
#[cfg(not(feature = "shuttle"))]
pub fn assert_array_payloads_do_not_tear<R, F>(new_register: F, writes: usize)
where
    R: Register<Value = Payload> + Send + Sync + 'static,
    F: FnOnce() -> R,
{
    let (mut writer, mut reader) = new_register().split();

    let writer_thread = thread::spawn(move || {
        for ts in 1..=writes as Timestamp {
            let payload = fill_payload(ts);
            writer.write(&payload, ts);
        }
    });
    let reader_thread = thread::spawn(move || {
        let mut payload: Payload = None;
        for _ in 0..writes {
            let ts = reader.read(&mut payload);
            if ts == NO_VALUE_TS {
                assert!(payload.is_none(), "sentinel read returned a payload");
            } else {
                assert_payload_matches(&payload, ts);
            }
        }
    });

    writer_thread.join().unwrap();
    reader_thread.join().unwrap();
}

/// Runs a tagged workload and asserts that every copy the register made
/// was freed exactly once by the time the register is dropped, and that no
/// read ever touched a freed value.
#[cfg(not(feature = "shuttle"))]
pub fn assert_copies_and_frees_balance<R, F>(new_register: F, writes: usize)
where
    R: Register<Value = Option<u64>> + Send + Sync + 'static,
    F: FnOnce(TagOps) -> R,
{
    let ops = TagOps::new();
    let tracker = ops.clone();
    let (mut writer, mut reader) = new_register(ops).split();

    let writer_thread = thread::spawn(move || {
        for ts in 1..=writes as Timestamp {
            writer.write(&Some(ts as u64), ts);
        }
    });
    let reader_thread = thread::spawn(move || {
        let mut value = None;
        for _ in 0..writes {
            reader.read(&mut value);
        }
    });

    writer_thread.join().unwrap();
    reader_thread.join().unwrap();

    // Both handles are gone, so the register has been dropped and every
    // slot released.
    assert_eq!(tracker.live_count(), 0, "leaked copies");
}

#[cfg(feature = "shuttle")]
pub mod linearizability {
    use std::fmt::Debug;
    use std::hash::Hash;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use shuttle::rand::{thread_rng, Rng};
    use shuttle::thread;

    use swsr::register::{Register, Timestamp};
    use swsr_utils::specifications::register::{
        RegisterOperation, TimestampedRegisterSpecification,
    };
    use swsr_utils::{Action, History, WglChecker};

    pub const NUM_ITERATIONS: usize = 250;
    pub const NUM_PREEMPTIONS: usize = 3;

    const NUM_WRITES: usize = 4;
    const NUM_READS: usize = 4;

    const WRITER: usize = 0;
    const READER: usize = 1;

    #[derive(Clone, Debug)]
    struct TimedAction<T> {
        process: usize,
        action: Action<RegisterOperation<T>>,
        happened_at: Instant,
    }

    type Log<T> = Arc<Mutex<Vec<TimedAction<T>>>>;

    fn record<T>(log: &Log<T>, process: usize, action: Action<RegisterOperation<T>>) {
        let mut log = log.lock().unwrap();
        log.push(TimedAction {
            process,
            action,
            happened_at: Instant::now(),
        });
    }

    /// Asserts that the recorded actions form a linearizable history of
    /// timestamped register operations.
    fn assert_linearizable<T>(mut actions: Vec<TimedAction<T>>)
    where
        T: Clone + Debug + Default + Eq + Hash,
    {
        actions.sort_by(|a, b| a.happened_at.cmp(&b.happened_at));
        let history = History::from_actions(
            actions
                .into_iter()
                .map(|timed| (timed.process, timed.action))
                .collect(),
        );
        assert!(WglChecker::<TimestampedRegisterSpecification<T>>::is_linearizable(history));
    }

    /// Runs one writer of random values and one reader over a fresh
    /// register and checks the recorded history against the sequential
    /// register specification.
    pub fn assert_random_history_is_linearizable<R, F>(new_register: F)
    where
        R: Register<Value = u64> + Send + Sync + 'static,
        F: Fn() -> R,
    {
        let (mut writer, mut reader) = new_register().split();
        let log: Log<u64> = Arc::new(Mutex::new(Vec::new()));

        let writer_log = Arc::clone(&log);
        let writer_thread = thread::spawn(move || {
            let mut rng = thread_rng();
            for ts in 1..=NUM_WRITES as Timestamp {
                let value = rng.gen_range(0..8u64);
                record(
                    &writer_log,
                    WRITER,
                    Action::Call(RegisterOperation::Write(value, ts)),
                );
                writer.write(&value, ts);
                record(
                    &writer_log,
                    WRITER,
                    Action::Response(RegisterOperation::Write(value, ts)),
                );
            }
        });

        let reader_log = Arc::clone(&log);
        let reader_thread = thread::spawn(move || {
            let mut value = 0;
            for _ in 0..NUM_READS {
                record(&reader_log, READER, Action::Call(RegisterOperation::Read(None)));
                let ts = reader.read(&mut value);
                record(
                    &reader_log,
                    READER,
                    Action::Response(RegisterOperation::Read(Some((value, ts)))),
                );
            }
        });

        writer_thread.join().unwrap();
        reader_thread.join().unwrap();

        let actions = log.lock().unwrap().clone();
        assert_linearizable(actions);
    }
}
