//! # Decision Engine
//!
//! Operational decisions (shipment, customer service, financial, analytics). Each input is
//! validated, analyzed against a bounded context, scored across a fixed set of candidate
//! actions and written to the audit trail. Failures never surface to callers; they come
//! back as an `escalate_to_human` result.

pub mod candidates;
pub mod context;
pub mod engine;

pub use candidates::Candidate;
pub use context::{Analysis, DecisionContext, Level};
pub use engine::{adjust_confidence, score_candidate, validate, DecisionEngine, DecisionFailure};
