//! A sequential specification of a timestamped register.
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use super::Specification;

/// A timestamp attached to a register value.
///
/// The reserved value `-1` means the register has never been written.
pub type Timestamp = i64;

/// An operation on a timestamped register.
#[derive(Clone, Copy, Debug)]
pub enum RegisterOperation<T> {
    /// Store `T` with the given timestamp.
    Write(T, Timestamp),
    /// Return the latest value and its timestamp.
    ///
    /// While the return value of the operation is not yet known, this is
    /// represented as `Read(None)`.
    Read(Option<(T, Timestamp)>),
}

use RegisterOperation::{Read, Write};

/// A sequential specification of a timestamped register.
///
/// The register starts out holding the default value of `T` with timestamp
/// `-1`. A write always applies and replaces both value and timestamp; a
/// read is valid exactly when it returns the pair currently stored.
pub struct TimestampedRegisterSpecification<T> {
    value_type: PhantomData<T>,
}

impl<T: Clone + Debug + Default + Eq + Hash> Specification
    for TimestampedRegisterSpecification<T>
{
    type State = (T, Timestamp);
    type Operation = RegisterOperation<T>;

    fn init() -> Self::State {
        (T::default(), -1)
    }

    fn apply(operation: &Self::Operation, state: &Self::State) -> (bool, Self::State) {
        match operation {
            Write(value, ts) => (true, (value.clone(), *ts)),
            Read(observed) => {
                let observed = observed
                    .as_ref()
                    .expect("cannot apply a read with an unknown return value");
                (observed == state, state.clone())
            }
        }
    }
}
