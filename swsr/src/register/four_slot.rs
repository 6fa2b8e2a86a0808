//! A four-slot register with a wait-free writer and a lock-free reader.
use std::array::from_fn;
use std::cell::UnsafeCell;

use crate::sync::{AtomicU8, Ordering};
use crate::value::{TrivialOps, ValueOps};

use super::{Register, Slot, Timestamp};

/// Bits 0-1 of the control word: slot the next write will use.
const NEXT_WRITE_MASK: u8 = 0b0011;

/// The control transition a read performs: keep `latest` (bits 2-3) and the
/// next-write pair bit, and force the next write onto the pair that does
/// not hold `latest`.
fn steer_next_write(control: u8) -> u8 {
    (control & 0b1110) | ((!control >> 2) & 0b01)
}

/// A four-slot register with a wait-free writer and a lock-free reader.
///
/// The four-bit control word names both the slot holding the latest value
/// and the slot the next write will use. The writer fills the named slot
/// and publishes with one CAS; if the reader moved the next-write field in
/// the meantime, the writer adopts the reader's choice with a plain store.
/// The reader CAS-loops to steer the next write away from the pair holding
/// the latest value before reading it; each failed iteration means the
/// writer published a newer value, so the system always makes progress,
/// but the reader alone is not wait-free.
///
/// # Examples
///
/// ```
/// use swsr::register::{FourSlotRegister, Register};
///
/// let register: FourSlotRegister<u32> = FourSlotRegister::new(&0);
/// let (mut writer, mut reader) = register.split();
///
/// writer.write(&7, 1);
/// writer.write(&8, 2);
///
/// let mut out = 0;
/// assert_eq!(reader.read(&mut out), 2);
/// assert_eq!(out, 8);
/// ```
pub struct FourSlotRegister<T, V: ValueOps<T> = TrivialOps> {
    ops: V,
    slots: [UnsafeCell<Slot<T>>; 4],
    /// Bits 0-1: slot for the next write. Bits 2-3: slot with the latest
    /// value.
    control: AtomicU8,
}

// SAFETY: slot access is mediated by the control-word protocol under the
// sole-writer/sole-reader contract of the raw operations.
unsafe impl<T: Send, V: ValueOps<T> + Sync> Sync for FourSlotRegister<T, V> {}

impl<T: Copy> FourSlotRegister<T, TrivialOps> {
    /// Creates a register prefilled with `sentinel` and no timestamp.
    pub fn new(sentinel: &T) -> Self {
        Self::with_ops(sentinel, TrivialOps)
    }
}

impl<T, V: ValueOps<T>> FourSlotRegister<T, V> {
    /// Creates a register with custom value management.
    pub fn with_ops(sentinel: &T, ops: V) -> Self {
        let slots = from_fn(|_| UnsafeCell::new(Slot::new(ops.copy(sentinel))));
        Self {
            ops,
            slots,
            // Latest in slot 0, first write into slot 1.
            control: AtomicU8::new(1),
        }
    }
}

impl<T, V: ValueOps<T>> Register for FourSlotRegister<T, V> {
    type Value = T;

    unsafe fn write(&self, value: &T, ts: Timestamp) {
        let fresh = self.ops.copy(value);

        let snapshot = self.control.load(Ordering::SeqCst);
        let write_slot = snapshot & NEXT_WRITE_MASK;

        // SAFETY: the control word never names the latest slot or the
        // reader's slot as the next write, so the writer has exclusive
        // access here.
        let slot = &mut *self.slots[write_slot as usize].get();
        let old = slot.install(fresh, ts);
        self.ops.free(old);

        // Publish the slot just written and step to its paired slot.
        let desired = (write_slot << 2) | (write_slot ^ 0b10);
        if let Err(observed) = self
            .control
            .compare_exchange(snapshot, desired, Ordering::SeqCst, Ordering::SeqCst)
        {
            // The reader moved the next write to the other pair; publish
            // with the reader's choice intact.
            self.control
                .store((write_slot << 2) | (observed & NEXT_WRITE_MASK), Ordering::SeqCst);
        }
    }

    unsafe fn read(&self, dest: &mut T) -> Timestamp {
        let mut snapshot = self.control.load(Ordering::SeqCst);
        loop {
            match self.control.compare_exchange_weak(
                snapshot,
                steer_next_write(snapshot),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => snapshot = observed,
            }
        }
        let read_slot = snapshot >> 2;

        // SAFETY: the transition just performed keeps the writer on the
        // other pair until it observes a newer control value, and the slot
        // was fully written before it became the latest.
        let slot = &*self.slots[read_slot as usize].get();
        slot.read_into(&self.ops, dest)
    }
}

impl<T, V: ValueOps<T>> Drop for FourSlotRegister<T, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `&mut self` means no operation is in flight, and each
            // slot value is taken exactly once.
            self.ops.free(unsafe { slot.get_mut().take() });
        }
    }
}
