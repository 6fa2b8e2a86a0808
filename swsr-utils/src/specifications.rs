//! Sequential specifications of shared objects.
use std::fmt::Debug;
use std::hash::Hash;

pub mod register;

/// A sequential specification of a shared object.
///
/// The specification describes how each operation transforms the object's
/// state and whether an operation's observed return value is valid in a
/// given state. Checkers use it to decide whether a concurrent history
/// could have been produced by some sequential execution.
///
/// # Examples
///
/// A counter that can be incremented and read:
///
/// ```
/// use swsr_utils::Specification;
///
/// #[derive(Copy, Clone, Debug)]
/// enum CounterOperation {
///     Increment,
///     Read(u32),
/// }
///
/// struct CounterSpecification;
///
/// impl Specification for CounterSpecification {
///     type State = u32;
///     type Operation = CounterOperation;
///
///     fn init() -> Self::State {
///         0
///     }
///
///     fn apply(operation: &Self::Operation, state: &Self::State) -> (bool, Self::State) {
///         match operation {
///             CounterOperation::Increment => (true, state + 1),
///             CounterOperation::Read(value) => (value == state, *state),
///         }
///     }
/// }
///
/// let state = CounterSpecification::init();
/// let (is_valid, state) = CounterSpecification::apply(&CounterOperation::Increment, &state);
/// assert!(is_valid);
///
/// let (is_valid, _) = CounterSpecification::apply(&CounterOperation::Read(1), &state);
/// assert!(is_valid);
/// ```
pub trait Specification {
    type State: Clone + Eq + Hash + Debug;
    type Operation: Clone + Debug;

    /// Returns the initial state of the object.
    fn init() -> Self::State;

    /// Returns whether applying `operation` in `state` is valid, and the
    /// state the object is in afterwards.
    ///
    /// An invalid operation must leave the state unchanged.
    fn apply(operation: &Self::Operation, state: &Self::State) -> (bool, Self::State);
}
