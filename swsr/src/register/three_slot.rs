//! A three-slot register driven by a single four-bit control word.
use std::array::from_fn;
use std::cell::UnsafeCell;

use crate::sync::{AtomicU8, Ordering};
use crate::value::{TrivialOps, ValueOps};

use super::{Reader, Register, Slot, Timestamp};

/// Bits 0-1 of the control word: slot the reader is using or last used.
const LAST_READ_MASK: u8 = 0b0011;

/// The control transition a read performs: copy `latest` (bits 2-3) into
/// the last-read field, leaving `latest` itself unchanged.
fn capture_latest(control: u8) -> u8 {
    (control & 0b1100) | (control >> 2)
}

/// A three-slot register packed into one four-bit control word.
///
/// Three slots are the minimum for this kind of copying register, and this
/// variant also needs only a single atomic control word: two bits name the
/// slot with the latest value and two bits name the slot the reader is on.
/// The writer cycles through the slots, skipping the reader's, and
/// publishes with at most two CAS attempts; the only transition that can
/// interfere is the reader's single last-read update, so the second
/// attempt always takes. The reader CAS-loops to copy `latest` into the
/// last-read field and is therefore lock-free rather than wait-free.
///
/// # Examples
///
/// ```
/// use swsr::register::{Register, ThreeSlotRegister};
///
/// let register: ThreeSlotRegister<u32> = ThreeSlotRegister::new(&0);
/// let (mut writer, mut reader) = register.split();
///
/// writer.write(&7, 1);
///
/// let mut out = 0;
/// let (ts, attempts) = reader.read_with_retries(&mut out);
/// assert_eq!((ts, out), (1, 7));
/// assert_eq!(attempts, 1);
/// ```
pub struct ThreeSlotRegister<T, V: ValueOps<T> = TrivialOps> {
    ops: V,
    slots: [UnsafeCell<Slot<T>>; 3],
    /// Bits 0-1: slot the reader is using or last used. Bits 2-3: slot
    /// holding the latest value.
    control: AtomicU8,
    /// Slot of the previous write. Only the writer touches this.
    write_slot: UnsafeCell<u8>,
}

// SAFETY: slot and `write_slot` access is mediated by the control-word
// protocol under the sole-writer/sole-reader contract of the raw
// operations.
unsafe impl<T: Send, V: ValueOps<T> + Sync> Sync for ThreeSlotRegister<T, V> {}

impl<T: Copy> ThreeSlotRegister<T, TrivialOps> {
    /// Creates a register prefilled with `sentinel` and no timestamp.
    pub fn new(sentinel: &T) -> Self {
        Self::with_ops(sentinel, TrivialOps)
    }
}

impl<T, V: ValueOps<T>> ThreeSlotRegister<T, V> {
    /// Creates a register with custom value management.
    pub fn with_ops(sentinel: &T, ops: V) -> Self {
        let slots = from_fn(|_| UnsafeCell::new(Slot::new(ops.copy(sentinel))));
        Self {
            ops,
            slots,
            control: AtomicU8::new(0),
            write_slot: UnsafeCell::new(0),
        }
    }

    /// Like [`Register::read`], but also counts CAS attempts.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread reading from this register for
    /// the duration of the call.
    unsafe fn read_with_retries(&self, dest: &mut T) -> (Timestamp, i64) {
        let mut attempts = 1;
        let mut snapshot = self.control.load(Ordering::SeqCst);
        while let Err(observed) = self.control.compare_exchange(
            snapshot,
            capture_latest(snapshot),
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            snapshot = observed;
            attempts += 1;
        }
        let read_slot = snapshot >> 2;

        // SAFETY: the last-read field now names this slot, and the writer
        // skips the slot named there.
        let slot = &*self.slots[read_slot as usize].get();
        (slot.read_into(&self.ops, dest), attempts)
    }
}

impl<T, V: ValueOps<T>> Register for ThreeSlotRegister<T, V> {
    type Value = T;

    unsafe fn write(&self, value: &T, ts: Timestamp) {
        let fresh = self.ops.copy(value);

        let snapshot = self.control.load(Ordering::SeqCst);
        // SAFETY: only the writer accesses `write_slot`.
        let write_slot = &mut *self.write_slot.get();
        // Advance cyclically, skipping the slot the reader is on.
        *write_slot = (*write_slot + 1) % 3;
        if *write_slot == (snapshot & LAST_READ_MASK) {
            *write_slot = (*write_slot + 1) % 3;
        }

        // SAFETY: the chosen slot is neither the reader's slot nor the
        // latest, so the writer has exclusive access here.
        let slot = &mut *self.slots[*write_slot as usize].get();
        let old = slot.install(fresh, ts);
        self.ops.free(old);

        // Advertise the slot just written.
        let desired = (*write_slot << 2) | (snapshot & LAST_READ_MASK);
        if let Err(observed) = self
            .control
            .compare_exchange(snapshot, desired, Ordering::SeqCst, Ordering::SeqCst)
        {
            // The reader's last-read update is the only transition that can
            // intervene, and it happens at most once per read, so the
            // second attempt takes.
            let _ = self.control.compare_exchange(
                observed,
                (*write_slot << 2) | (observed & LAST_READ_MASK),
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
    }

    unsafe fn read(&self, dest: &mut T) -> Timestamp {
        let (ts, _) = self.read_with_retries(dest);
        ts
    }
}

impl<T, V: ValueOps<T>> Drop for ThreeSlotRegister<T, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `&mut self` means no operation is in flight, and each
            // slot value is taken exactly once.
            self.ops.free(unsafe { slot.get_mut().take() });
        }
    }
}

impl<T, V: ValueOps<T>> Reader<ThreeSlotRegister<T, V>> {
    /// Fills `dest` with the latest stored value and returns its timestamp
    /// together with the number of CAS attempts the read performed.
    ///
    /// An uncontended read reports one attempt. The count is an
    /// observability hook for latency harnesses; the value and timestamp
    /// are exactly those of [`read`](Reader::read).
    pub fn read_with_retries(&mut self, dest: &mut T) -> (Timestamp, i64) {
        // SAFETY: this handle is the sole reader by construction.
        unsafe { self.register.read_with_retries(dest) }
    }
}
