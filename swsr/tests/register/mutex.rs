use super::common;

use swsr::register::MutexRegister;

#[cfg(not(feature = "shuttle"))]
mod sequential {
    use super::*;

    #[test]
    fn fresh_register_reads_sentinel() {
        common::assert_fresh_register_reads_sentinel(MutexRegister::new(&0));
    }

    #[test]
    fn single_write_is_read() {
        common::assert_single_write_is_read(MutexRegister::new(&0));
    }

    #[test]
    fn last_write_wins() {
        common::assert_last_write_wins(MutexRegister::new(&0));
    }

    #[test]
    fn read_is_idempotent() {
        common::assert_read_is_idempotent(MutexRegister::new(&0));
    }
}

#[cfg(not(feature = "shuttle"))]
mod concurrent {
    use super::*;
    use swsr::value::CloneOps;

    #[test]
    fn timestamps_are_monotonic() {
        common::assert_monotonic_timestamps(|| MutexRegister::new(&0), common::STRESS_WRITES);
    }

    #[test]
    fn array_payloads_do_not_tear() {
        common::assert_array_payloads_do_not_tear(
            || MutexRegister::with_ops(&None, CloneOps),
            common::PAYLOAD_WRITES,
        );
    }

    #[test]
    fn copies_and_frees_balance() {
        common::assert_copies_and_frees_balance(
            |ops| MutexRegister::with_ops(&None, ops),
            common::STRESS_WRITES / 10,
        );
    }
}

#[cfg(feature = "shuttle")]
mod shuttle_checks {
    use super::*;
    use super::common::linearizability::{self, NUM_ITERATIONS, NUM_PREEMPTIONS};

    #[test]
    fn random_histories_are_linearizable() {
        shuttle::check_pct(
            || {
                linearizability::assert_random_history_is_linearizable(|| {
                    MutexRegister::new(&0)
                });
            },
            NUM_ITERATIONS,
            NUM_PREEMPTIONS,
        );
    }
}
