#[cfg(feature = "shuttle")]
pub(crate) use shuttle::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex,
};
#[cfg(not(feature = "shuttle"))]
pub(crate) use std::sync::{
    atomic::{AtomicU8, Ordering},
    Mutex,
};
