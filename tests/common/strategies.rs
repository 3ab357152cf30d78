#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::Just;
use tms_autonomy::models::{DomainType, Priority};
use tms_autonomy::state_machine::{TaskEvent, TaskState};

pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

pub fn domain_strategy() -> impl Strategy<Value = DomainType> {
    prop::sample::select(DomainType::ALL.to_vec())
}

pub fn task_state_strategy() -> impl Strategy<Value = TaskState> {
    prop_oneof![
        Just(TaskState::Pending),
        Just(TaskState::InProgress),
        Just(TaskState::Completed),
        Just(TaskState::Failed),
    ]
}

pub fn task_event_strategy() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        Just(TaskEvent::Start),
        Just(TaskEvent::Complete),
        "[a-z ]{1,24}".prop_map(TaskEvent::Fail),
    ]
}

/// Raw confidences, including values well outside `[0, 1]`
pub fn confidence_strategy() -> impl Strategy<Value = f64> {
    -2.0f64..3.0
}

/// Probe response times spanning every severity band
pub fn response_time_strategy() -> impl Strategy<Value = u64> {
    0u64..30_000
}

/// A batch of tasks to enqueue: (priority, domain, estimated hours)
pub fn task_batch_strategy() -> impl Strategy<Value = Vec<(Priority, DomainType, f64)>> {
    prop::collection::vec(
        (priority_strategy(), domain_strategy(), prop_oneof![Just(0.0), 1.0f64..48.0]),
        1..25,
    )
}

/// Latency series in milliseconds for the p95 computation
pub fn latency_series_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..20_000.0, 1..200)
}
