//! A four-slot register that is wait-free for both endpoints.
use std::array::from_fn;
use std::cell::UnsafeCell;

use crate::sync::{AtomicU8, Ordering};
use crate::value::{TrivialOps, ValueOps};

use super::{Register, Slot, Timestamp};

/// Bits 0-1 of the control word: slot holding the most recent value.
const LATEST_MASK: u8 = 0b011;
/// Bit 2 of the control word: set while the reader is using that slot.
const CLAIM_BIT: u8 = 0b100;

/// Re-aims `next_write` away from the slot the reader is observing.
///
/// `control` is a snapshot whose low bits name the latest slot. The result
/// keeps the writer's pair bit and takes the complement of the latest
/// slot's low bit, so it can never name the slot under the reader.
fn pair_switch(next_write: u8, control: u8) -> u8 {
    (next_write & 0b10) | (!control & 0b01)
}

/// A four-slot register, wait-free for writer and reader.
///
/// The four slots form two pairs, {0, 1} and {2, 3}. A three-bit control
/// word names the slot holding the latest value and carries a claim bit the
/// reader sets when it captures that slot. The writer clears the claim bit
/// on every write; if the reader had claimed the latest slot, the writer
/// switches to the other pair so the claimed slot stays untouched. The
/// writer publishes with at most two CAS attempts, and the reader claims
/// with a single `fetch_or`, so both operations complete in a bounded
/// number of steps regardless of scheduling.
///
/// # Examples
///
/// ```
/// use swsr::register::{Register, WaitFreeRegister};
///
/// let register: WaitFreeRegister<u32> = WaitFreeRegister::new(&0);
/// let (mut writer, mut reader) = register.split();
///
/// writer.write(&7, 1);
///
/// let mut out = 0;
/// assert_eq!(reader.read(&mut out), 1);
/// assert_eq!(out, 7);
/// ```
pub struct WaitFreeRegister<T, V: ValueOps<T> = TrivialOps> {
    ops: V,
    slots: [UnsafeCell<Slot<T>>; 4],
    /// Latest-slot index plus the reader's claim bit.
    control: AtomicU8,
    /// Slot the next write will target. Only the writer touches this.
    next_write: UnsafeCell<u8>,
}

// SAFETY: slot and `next_write` access is mediated by the control-word
// protocol under the sole-writer/sole-reader contract of the raw
// operations; values move between threads, hence `T: Send`, and both
// threads call the shared ops, hence `V: Sync`.
unsafe impl<T: Send, V: ValueOps<T> + Sync> Sync for WaitFreeRegister<T, V> {}

impl<T: Copy> WaitFreeRegister<T, TrivialOps> {
    /// Creates a register prefilled with `sentinel` and no timestamp.
    pub fn new(sentinel: &T) -> Self {
        Self::with_ops(sentinel, TrivialOps)
    }
}

impl<T, V: ValueOps<T>> WaitFreeRegister<T, V> {
    /// Creates a register with custom value management.
    pub fn with_ops(sentinel: &T, ops: V) -> Self {
        let slots = from_fn(|_| UnsafeCell::new(Slot::new(ops.copy(sentinel))));
        Self {
            ops,
            slots,
            control: AtomicU8::new(0),
            next_write: UnsafeCell::new(1),
        }
    }
}

impl<T, V: ValueOps<T>> Register for WaitFreeRegister<T, V> {
    type Value = T;

    unsafe fn write(&self, value: &T, ts: Timestamp) {
        let fresh = self.ops.copy(value);

        // Clear the claim bit; its previous value says whether the reader
        // has captured the current latest slot.
        let snapshot = self.control.fetch_and(LATEST_MASK, Ordering::SeqCst);
        // SAFETY: only the writer accesses `next_write`.
        let next_write = &mut *self.next_write.get();
        if snapshot & CLAIM_BIT != 0 {
            *next_write = pair_switch(*next_write, snapshot);
        }
        let write_slot = *next_write;

        // SAFETY: `write_slot` is neither the latest slot nor the slot the
        // reader has claimed, so the writer has exclusive slot access.
        let slot = &mut *self.slots[write_slot as usize].get();
        let old = slot.install(fresh, ts);
        self.ops.free(old);

        // Advertise the new latest slot and step to its paired slot.
        *next_write = write_slot ^ 0b10;
        let expected = snapshot & LATEST_MASK;
        if let Err(observed) = self
            .control
            .compare_exchange(expected, write_slot, Ordering::SeqCst, Ordering::SeqCst)
        {
            // The reader claimed the previous latest slot after our
            // snapshot. It makes no further control transitions during its
            // read, so the retry takes.
            *next_write = pair_switch(*next_write, observed);
            let _ = self
                .control
                .compare_exchange(observed, write_slot, Ordering::SeqCst, Ordering::SeqCst);
        }
    }

    unsafe fn read(&self, dest: &mut T) -> Timestamp {
        let snapshot = self.control.fetch_or(CLAIM_BIT, Ordering::SeqCst);
        let read_slot = snapshot & LATEST_MASK;

        // SAFETY: the claim bit keeps the writer out of this slot until the
        // next write completes, and the slot was fully written before it
        // became the latest.
        let slot = &*self.slots[read_slot as usize].get();
        slot.read_into(&self.ops, dest)
    }
}

impl<T, V: ValueOps<T>> Drop for WaitFreeRegister<T, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            // SAFETY: `&mut self` means no operation is in flight, and each
            // slot value is taken exactly once.
            self.ops.free(unsafe { slot.get_mut().take() });
        }
    }
}
