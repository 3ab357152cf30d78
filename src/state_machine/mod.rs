// Task lifecycle state machine
//
// `pending -> in_progress -> {completed | failed}` expressed as an enum, an event enum
// and an explicit transition table. Guards cover the two preconditions of promotion:
// completed dependencies and free concurrency budget.

pub mod errors;
pub mod events;
pub mod guards;
pub mod states;
pub mod task_state_machine;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use guards::{ConcurrencyGuard, DependenciesCompleteGuard, StateGuard};
pub use states::TaskState;
pub use task_state_machine::{TaskStateMachine, ALLOWED_TRANSITIONS};
