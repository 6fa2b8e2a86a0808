//! A blocking register backed by a [`Mutex`].
use crate::sync::Mutex;
use crate::value::{TrivialOps, ValueOps};

use super::{Register, Slot, Timestamp};

/// A blocking register guarded by a mutex.
///
/// Both operations take the lock, so neither side is non-blocking. The
/// variant exists as a reference baseline and as the semantic oracle for
/// testing the non-blocking registers.
///
/// # Examples
///
/// ```
/// use swsr::register::{MutexRegister, Register};
/// use swsr::value::CloneOps;
///
/// let sentinel: Vec<u8> = Vec::new();
/// let register = MutexRegister::with_ops(&sentinel, CloneOps);
/// let (mut writer, mut reader) = register.split();
///
/// writer.write(&vec![1, 2, 3], 1);
///
/// let mut out = Vec::new();
/// assert_eq!(reader.read(&mut out), 1);
/// assert_eq!(out, [1, 2, 3]);
/// ```
pub struct MutexRegister<T, V: ValueOps<T> = TrivialOps> {
    ops: V,
    cell: Mutex<Slot<T>>,
}

impl<T: Copy> MutexRegister<T, TrivialOps> {
    /// Creates a register prefilled with `sentinel` and no timestamp.
    pub fn new(sentinel: &T) -> Self {
        Self::with_ops(sentinel, TrivialOps)
    }
}

impl<T, V: ValueOps<T>> MutexRegister<T, V> {
    /// Creates a register with custom value management.
    pub fn with_ops(sentinel: &T, ops: V) -> Self {
        let cell = Mutex::new(Slot::new(ops.copy(sentinel)));
        Self { ops, cell }
    }
}

impl<T, V: ValueOps<T>> Register for MutexRegister<T, V> {
    type Value = T;

    unsafe fn write(&self, value: &T, ts: Timestamp) {
        let fresh = self.ops.copy(value);
        let mut slot = self.cell.lock().unwrap();
        let old = slot.install(fresh, ts);
        self.ops.free(old);
    }

    unsafe fn read(&self, dest: &mut T) -> Timestamp {
        let slot = self.cell.lock().unwrap();
        slot.read_into(&self.ops, dest)
    }
}

impl<T, V: ValueOps<T>> Drop for MutexRegister<T, V> {
    fn drop(&mut self) {
        let mut slot = self.cell.lock().unwrap();
        // SAFETY: the slot is not used after the value is taken.
        self.ops.free(unsafe { slot.take() });
    }
}
