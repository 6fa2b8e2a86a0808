//! Timestamped single-writer single-reader registers.
//!
//! Each register stores one value of an arbitrary user type together with a
//! signed 64-bit timestamp, and guarantees that a read returns a complete
//! value written by some prior write and that the timestamps a reader
//! observes never decrease. Five implementations cover different points of
//! the blocking/progress design space:
//!
//! - [`MutexRegister`] blocks both sides on a mutex. It is the reference
//!   baseline and the semantic oracle the other variants are tested against.
//! - [`WaitFreeRegister`] uses four slots and a three-bit control word;
//!   both operations are wait-free.
//! - [`FourSlotRegister`] uses four slots and a four-bit control word; the
//!   writer is wait-free and the reader is lock-free.
//! - [`ChenBurnsRegister`] is the classic three-slot protocol of Chen and
//!   Burns; wait-free writer, lock-free reader, two atomic control bytes.
//! - [`ThreeSlotRegister`] packs a three-slot protocol into a single
//!   four-bit control word; wait-free writer, lock-free reader.
//!
//! A register is converted into its two endpoint handles with
//! [`Register::split`]; the handles enforce the single-writer
//! single-reader precondition that every protocol here relies on.
mod cb_97;
pub use self::cb_97::ChenBurnsRegister;
mod four_slot;
pub use self::four_slot::FourSlotRegister;
mod mutex;
pub use self::mutex::MutexRegister;
mod three_slot;
pub use self::three_slot::ThreeSlotRegister;
mod wait_free;
pub use self::wait_free::WaitFreeRegister;

use std::mem::{self, ManuallyDrop};
use std::sync::Arc;

use crate::value::ValueOps;

/// A timestamp attached to a stored value.
///
/// Writers must supply strictly increasing timestamps; the reserved value
/// [`NO_VALUE_TS`] marks a register that has never been written.
pub type Timestamp = i64;

/// Timestamp reported while a register has never been written.
pub const NO_VALUE_TS: Timestamp = -1;

/// One buffer slot: a stored value and its timestamp.
///
/// The value sits in [`ManuallyDrop`] so that release always flows through
/// the register's [`ValueOps::free`], never through an implicit drop.
pub(crate) struct Slot<T> {
    obj: ManuallyDrop<T>,
    ts: Timestamp,
}

impl<T> Slot<T> {
    pub(crate) fn new(obj: T) -> Self {
        Self {
            obj: ManuallyDrop::new(obj),
            ts: NO_VALUE_TS,
        }
    }

    /// Installs a fresh copy and timestamp, returning the displaced value.
    pub(crate) fn install(&mut self, obj: T, ts: Timestamp) -> T {
        self.ts = ts;
        mem::replace(&mut *self.obj, obj)
    }

    /// Reads the stored value into `dest` and returns its timestamp.
    pub(crate) fn read_into<V: ValueOps<T>>(&self, ops: &V, dest: &mut T) -> Timestamp {
        ops.get(&self.obj, dest);
        self.ts
    }

    /// Takes the stored value out for release.
    ///
    /// # Safety
    ///
    /// Must be called at most once per slot, and the slot must not be used
    /// afterwards.
    pub(crate) unsafe fn take(&mut self) -> T {
        ManuallyDrop::take(&mut self.obj)
    }
}

/// A single-writer single-reader timestamped register.
///
/// The raw operations are `unsafe` because every implementation relies on
/// there being at most one concurrent writer and at most one concurrent
/// reader; [`split`](Register::split) converts a register into a
/// [`Writer`]/[`Reader`] handle pair that upholds the contract statically.
pub trait Register {
    /// The type of value exchanged through the register.
    type Value;

    /// Stores a copy of `value` with timestamp `ts`.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread writing to this register for the
    /// duration of the call.
    unsafe fn write(&self, value: &Self::Value, ts: Timestamp);

    /// Fills `dest` with the latest stored value and returns its timestamp.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread reading from this register for
    /// the duration of the call.
    unsafe fn read(&self, dest: &mut Self::Value) -> Timestamp;

    /// Consumes the register and returns its writer and reader halves.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::thread;
    /// use swsr::register::{Register, ThreeSlotRegister};
    ///
    /// let register: ThreeSlotRegister<u64> = ThreeSlotRegister::new(&0);
    /// let (mut writer, mut reader) = register.split();
    ///
    /// let handle = thread::spawn(move || {
    ///     for ts in 1..=100 {
    ///         writer.write(&(ts as u64 * 2), ts);
    ///     }
    /// });
    ///
    /// let mut value = 0;
    /// let mut previous = -1;
    /// for _ in 0..100 {
    ///     let ts = reader.read(&mut value);
    ///     assert!(ts >= previous);
    ///     if ts >= 0 {
    ///         assert_eq!(value, ts as u64 * 2);
    ///     }
    ///     previous = ts;
    /// }
    /// handle.join().unwrap();
    /// ```
    fn split(self) -> (Writer<Self>, Reader<Self>)
    where
        Self: Sized,
    {
        let register = Arc::new(self);
        (
            Writer {
                register: Arc::clone(&register),
            },
            Reader { register },
        )
    }
}

/// The writing half of a register.
///
/// The handle is not [`Clone`] and its operation takes `&mut self`, so at
/// most one write is in flight at any time.
pub struct Writer<R: Register> {
    register: Arc<R>,
}

impl<R: Register> Writer<R> {
    /// Stores a copy of `value` with timestamp `ts`.
    ///
    /// Timestamps must be strictly increasing across the writes performed
    /// through this handle; the reader's monotonicity guarantee depends
    /// on it.
    pub fn write(&mut self, value: &R::Value, ts: Timestamp) {
        // SAFETY: this handle is the sole writer by construction.
        unsafe { self.register.write(value, ts) }
    }
}

/// The reading half of a register.
pub struct Reader<R: Register> {
    register: Arc<R>,
}

impl<R: Register> Reader<R> {
    /// Fills `dest` with the latest stored value and returns its timestamp.
    ///
    /// Before the first write completes this yields the sentinel contents
    /// and [`NO_VALUE_TS`].
    pub fn read(&mut self, dest: &mut R::Value) -> Timestamp {
        // SAFETY: this handle is the sole reader by construction.
        unsafe { self.register.read(dest) }
    }
}
