//! The three-slot register of Chen and Burns
//! \[[CB97](https://www.cs.york.ac.uk/ftpdir/reports/97/YCS/279/YCS-97-279.pdf)\].
//!
//! Jing Chen and Alan Burns. "A three-slot asynchronous reader/writer
//! mechanism for multiprocessor real-time systems." Report, University of
//! York (1997).
use std::array::from_fn;
use std::cell::UnsafeCell;

use crate::sync::{AtomicU8, Ordering};
use crate::value::{TrivialOps, ValueOps};

use super::{Register, Slot, Timestamp};

/// `reading` value meaning the reader has not captured a slot.
const NOT_READING: u8 = 3;

/// Slot for the next write, indexed by `[reading][latest]`.
///
/// The chosen slot differs from `latest`, and from `reading` whenever the
/// reader has captured one.
const NEXT: [[u8; 3]; 4] = [[1, 2, 1], [2, 2, 0], [1, 0, 0], [1, 2, 0]];

/// The Chen-Burns three-slot register.
///
/// Two atomic bytes interlock the endpoints: `latest` names the slot with
/// the most recent value, and `reading` names the slot the reader has
/// captured, or [`NOT_READING`] while it has not. The writer picks a slot
/// distinct from both out of the [`NEXT`] table, installs the value, and
/// then resolves the race for `reading` with a single CAS; the reader
/// announces itself, captures `latest`, and lets the same CAS decide which
/// slot it actually reads. The writer is wait-free, the reader lock-free.
///
/// This is the canonical three-slot protocol, kept for comparison and for
/// its minimal buffer footprint.
///
/// # Examples
///
/// ```
/// use swsr::register::{ChenBurnsRegister, Register};
///
/// let register: ChenBurnsRegister<u32> = ChenBurnsRegister::new(&0);
/// let (mut writer, mut reader) = register.split();
///
/// writer.write(&7, 1);
///
/// let mut out = 0;
/// assert_eq!(reader.read(&mut out), 1);
/// assert_eq!(out, 7);
/// ```
pub struct ChenBurnsRegister<T, V: ValueOps<T> = TrivialOps> {
    ops: V,
    slots: [UnsafeCell<Slot<T>>; 3],
    /// Slot the reader has captured, or [`NOT_READING`].
    reading: AtomicU8,
    /// Slot holding the most recent value.
    latest: AtomicU8,
}

// SAFETY: slot access is mediated by the `reading`/`latest` interlock under
// the sole-writer/sole-reader contract of the raw operations.
unsafe impl<T: Send, V: ValueOps<T> + Sync> Sync for ChenBurnsRegister<T, V> {}

impl<T: Copy> ChenBurnsRegister<T, TrivialOps> {
    /// Creates a register prefilled with `sentinel` and no timestamp.
    pub fn new(sentinel: &T) -> Self {
        Self::with_ops(sentinel, TrivialOps)
    }
}

impl<T, V: ValueOps<T>> ChenBurnsRegister<T, V> {
    /// Creates a register with custom value management.
    pub fn with_ops(sentinel: &T, ops: V) -> Self {
        let slots = from_fn(|_| UnsafeCell::new(Slot::new(ops.copy(sentinel))));
        Self {
            ops,
            slots,
            reading: AtomicU8::new(NOT_READING),
            latest: AtomicU8::new(0),
        }
    }
}

impl<T, V: ValueOps<T>> Register for ChenBurnsRegister<T, V> {
    type Value = T;

    unsafe fn write(&self, value: &T, ts: Timestamp) {
        let fresh = self.ops.copy(value);

        let reading = self.reading.load(Ordering::SeqCst);
        let latest = self.latest.load(Ordering::SeqCst);
        let write_slot = NEXT[reading as usize][latest as usize];

        // SAFETY: `write_slot` differs from both the latest slot and any
        // slot the reader has captured, so the writer has exclusive access.
        let slot = &mut *self.slots[write_slot as usize].get();
        let old = slot.install(fresh, ts);
        self.ops.free(old);

        self.latest.store(write_slot, Ordering::SeqCst);
        // Takes effect only while the reader has not yet captured a slot.
        let _ = self.reading.compare_exchange(
            NOT_READING,
            write_slot,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    unsafe fn read(&self, dest: &mut T) -> Timestamp {
        self.reading.store(NOT_READING, Ordering::SeqCst);
        let captured = self.latest.load(Ordering::SeqCst);
        // Takes effect only if the writer has not already published a slot
        // for this read.
        let _ = self.reading.compare_exchange(
            NOT_READING,
            captured,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let read_slot = self.reading.load(Ordering::SeqCst);

        // SAFETY: `reading` now names this read's slot, and the writer
        // never writes into the slot named by `reading`.
        let slot = &*self.slots[read_slot as usize].get();
        slot.read_into(&self.ops, dest)
    }
}

impl<T, V: ValueOps<T>> Drop for ChenBurnsRegister<T, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `&mut self` means no operation is in flight, and each
            // slot value is taken exactly once.
            self.ops.free(unsafe { slot.get_mut().take() });
        }
    }
}
