//! # Decision Engine
//!
//! Scores the fixed candidate actions for a decision, adjusts the winner's confidence by
//! priority and decides whether a human must review it. `decide` never fails: invalid
//! input or internal errors produce an `escalate_to_human` fallback.

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::candidates::{generate, Candidate};
use super::context::{analyze, DecisionContext};
use crate::config::DecisionConfig;
use crate::models::{
    DecisionInput, DecisionPayload, DecisionRecord, DecisionResult, DecisionType, Priority,
};
use crate::store::SharedStore;

/// Reasons a decision falls back to human review
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionFailure {
    #[error("payload kind {payload} does not match decision type {declared}")]
    PayloadMismatch {
        declared: DecisionType,
        payload: DecisionType,
    },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("no candidate actions for {0}")]
    NoCandidates(DecisionType),
}

impl DecisionFailure {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), DecisionFailure> {
    if value.trim().is_empty() {
        return Err(DecisionFailure::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn require_amount(field: &'static str, value: f64) -> Result<(), DecisionFailure> {
    if !value.is_finite() || value < 0.0 {
        return Err(DecisionFailure::invalid(
            field,
            format!("{value} is not a finite non-negative number"),
        ));
    }
    Ok(())
}

pub fn validate(input: &DecisionInput) -> Result<(), DecisionFailure> {
    let payload_type = input.payload.decision_type();
    if payload_type != input.decision_type {
        return Err(DecisionFailure::PayloadMismatch {
            declared: input.decision_type,
            payload: payload_type,
        });
    }

    match &input.payload {
        DecisionPayload::Shipment(shipment) => {
            require_text("shipment_id", &shipment.shipment_id)?;
            require_text("origin", &shipment.origin)?;
            require_text("destination", &shipment.destination)?;
            require_amount("weight_kg", shipment.weight_kg)
        }
        DecisionPayload::CustomerService(ticket) => {
            require_text("ticket_id", &ticket.ticket_id)?;
            require_text("customer_id", &ticket.customer_id)
        }
        DecisionPayload::Financial(financial) => {
            require_text("reference", &financial.reference)?;
            require_text("currency", &financial.currency)?;
            require_amount("amount", financial.amount)
        }
        DecisionPayload::Analytics(analytics) => {
            require_text("report", &analytics.report)?;
            if analytics.window_days == 0 {
                return Err(DecisionFailure::invalid("window_days", "must be at least 1"));
            }
            Ok(())
        }
    }
}

pub fn priority_multiplier(priority: Priority) -> f64 {
    match priority {
        Priority::Critical => 1.2,
        Priority::High => 1.1,
        Priority::Medium | Priority::Low => 1.0,
    }
}

pub fn score_candidate(candidate: &Candidate, decision_type: DecisionType, priority: Priority) -> f64 {
    let mut score = candidate.base_confidence * priority_multiplier(priority);
    if decision_type == DecisionType::Shipment && candidate.requires_human_review {
        score *= 0.8;
    }
    score
}

/// Priority-based confidence adjustment, capped at 0.95
pub fn adjust_confidence(confidence: f64, priority: Priority) -> f64 {
    let adjusted = match priority {
        Priority::Critical => (confidence * 0.9).min(0.95),
        Priority::High => (confidence * 0.95).min(0.9),
        Priority::Medium | Priority::Low => confidence,
    };
    adjusted.clamp(0.0, 0.95)
}

/// First candidate wins ties
fn select(
    candidates: &[Candidate],
    decision_type: DecisionType,
    priority: Priority,
) -> Option<(&Candidate, f64)> {
    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        let score = score_candidate(candidate, decision_type, priority);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best
}

#[derive(Debug)]
struct LearningState {
    history: VecDeque<DecisionRecord>,
    learning_rate: f64,
}

/// Scores candidate actions for operational decisions and audits every outcome.
///
/// `decide` never fails: anything that goes wrong while deciding produces the
/// `escalate_to_human` fallback instead.
#[derive(Debug)]
pub struct DecisionEngine {
    config: DecisionConfig,
    store: SharedStore,
    context: Mutex<DecisionContext>,
    learning: Mutex<LearningState>,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig, store: SharedStore) -> Self {
        Self {
            context: Mutex::new(DecisionContext::new(config.context_history)),
            learning: Mutex::new(LearningState {
                history: VecDeque::with_capacity(config.history_capacity),
                learning_rate: config.initial_learning_rate,
            }),
            config,
            store,
        }
    }

    pub fn register_counterparty(&self, name: impl Into<String>, reliability: f64) {
        self.context
            .lock()
            .set_counterparty_performance(name, reliability);
    }

    pub fn register_lane_cost(
        &self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        cost_per_kg: f64,
    ) {
        self.context
            .lock()
            .set_lane_cost(origin, destination, cost_per_kg);
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning.lock().learning_rate
    }

    pub fn history_len(&self) -> usize {
        self.learning.lock().history.len()
    }

    /// Most recent decisions, newest last
    pub fn recent_decisions(&self, limit: usize) -> Vec<DecisionRecord> {
        let learning = self.learning.lock();
        let skip = learning.history.len().saturating_sub(limit);
        learning.history.iter().skip(skip).cloned().collect()
    }

    #[instrument(skip(self, input), fields(decision_type = %input.decision_type, priority = %input.priority))]
    pub async fn decide(&self, input: DecisionInput) -> DecisionResult {
        let result = match self.evaluate(&input) {
            Ok(result) => result,
            Err(failure) => {
                warn!(error = %failure, "Decision failed, escalating to human review");
                let fallback = DecisionResult::escalate_to_human(failure.to_string());
                self.persist(&DecisionRecord::new(&input, &fallback, Utc::now()))
                    .await;
                return fallback;
            }
        };

        let record = DecisionRecord::new(&input, &result, Utc::now());
        self.persist(&record).await;
        self.remember(record);

        debug!(
            action = %result.action,
            confidence = result.confidence,
            requires_human_review = result.requires_human_review,
            "Decision made"
        );
        result
    }

    fn evaluate(&self, input: &DecisionInput) -> Result<DecisionResult, DecisionFailure> {
        validate(input)?;
        let learning_rate = self.learning_rate();

        let mut context = self.context.lock();
        let analysis = analyze(input, &context);
        let candidates = generate(input, &analysis, &context);
        let (chosen, score) = select(&candidates, input.decision_type, input.priority)
            .ok_or(DecisionFailure::NoCandidates(input.decision_type))?;

        let alternatives: Vec<_> = candidates
            .iter()
            .filter(|c| c.action != chosen.action)
            .map(|c| {
                json!({
                    "action": c.action,
                    "score": score_candidate(c, input.decision_type, input.priority),
                })
            })
            .collect();
        let metadata = json!({
            "score": score,
            "base_confidence": chosen.base_confidence,
            "analysis": analysis,
            "alternatives": alternatives,
            "learning_rate": learning_rate,
            "recent_decisions": context.recent_count(input.decision_type),
            "recent_share": context.recent_share(input.decision_type, chosen.action),
        });
        context.observe(input.decision_type, chosen.action);

        let confidence = adjust_confidence(chosen.base_confidence, input.priority);
        Ok(DecisionResult {
            action: chosen.action.to_string(),
            confidence,
            reasoning: chosen.reasoning.clone(),
            estimated_impact: chosen.estimated_impact,
            requires_human_review: confidence < 0.7 || input.priority == Priority::Critical,
            metadata: Some(metadata),
        })
    }

    async fn persist(&self, record: &DecisionRecord) {
        if let Err(err) = self.store.insert_decision(record).await {
            warn!(error = %err, decision_id = %record.id, "Failed to persist decision record");
        }
    }

    fn remember(&self, record: DecisionRecord) {
        let mut learning = self.learning.lock();
        learning.history.push_back(record);
        if learning.history.len() > self.config.history_capacity {
            let excess = learning.history.len() - self.config.history_trim_to;
            learning.history.drain(..excess);
        }

        let window = self.config.learning_window.min(learning.history.len());
        if window == 0 {
            return;
        }
        let mean = learning
            .history
            .iter()
            .rev()
            .take(window)
            .map(|r| r.confidence)
            .sum::<f64>()
            / window as f64;
        if mean > 0.8 {
            learning.learning_rate *= 0.95;
        } else if mean < 0.6 {
            learning.learning_rate *= 1.05;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{CustomerServicePayload, EstimatedImpact, ShipmentPayload};
    use crate::store::InMemoryStore;

    fn shipment_input(priority: Priority) -> DecisionInput {
        DecisionInput::new(
            DecisionPayload::Shipment(ShipmentPayload {
                shipment_id: "SHP-100".to_string(),
                origin: "CHI".to_string(),
                destination: "DAL".to_string(),
                weight_kg: 1200.0,
                preferred_carrier: None,
            }),
            priority,
        )
    }

    fn engine(config: DecisionConfig) -> (DecisionEngine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (DecisionEngine::new(config, store.clone()), store)
    }

    #[test]
    fn test_adjust_confidence_bands() {
        assert!((adjust_confidence(0.8, Priority::Critical) - 0.72).abs() < 1e-9);
        assert!((adjust_confidence(0.85, Priority::High) - 0.8075).abs() < 1e-9);
        assert_eq!(adjust_confidence(0.99, Priority::High), 0.9);
        assert_eq!(adjust_confidence(0.99, Priority::Low), 0.95);
        assert_eq!(adjust_confidence(0.75, Priority::Medium), 0.75);
    }

    #[test]
    fn test_review_penalty_applies_to_shipments_only() {
        let candidate = Candidate {
            action: "escalate_to_human",
            base_confidence: 0.5,
            reasoning: String::new(),
            estimated_impact: EstimatedImpact::High,
            requires_human_review: true,
        };
        assert!((score_candidate(&candidate, DecisionType::Shipment, Priority::Low) - 0.4).abs() < 1e-9);
        assert!((score_candidate(&candidate, DecisionType::Financial, Priority::Low) - 0.5).abs() < 1e-9);
        assert!((score_candidate(&candidate, DecisionType::Financial, Priority::Critical) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_mismatch_and_bad_fields() {
        let mut input = shipment_input(Priority::Low);
        input.decision_type = DecisionType::Financial;
        assert!(matches!(validate(&input), Err(DecisionFailure::PayloadMismatch { .. })));

        let mut input = shipment_input(Priority::Low);
        if let DecisionPayload::Shipment(ref mut s) = input.payload {
            s.weight_kg = f64::NAN;
        }
        assert!(matches!(
            validate(&input),
            Err(DecisionFailure::InvalidField { field: "weight_kg", .. })
        ));
    }

    #[tokio::test]
    async fn test_critical_shipment_assigns_carrier_with_review() {
        let (engine, store) = engine(DecisionConfig::default());
        let result = engine.decide(shipment_input(Priority::Critical)).await;

        assert_eq!(result.action, "auto_assign_carrier");
        assert!((result.confidence - 0.72).abs() < 1e-9);
        assert!(result.requires_human_review);
        assert_eq!(store.decisions().len(), 1);
        assert_eq!(engine.history_len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_falls_back() {
        let (engine, store) = engine(DecisionConfig::default());
        let input = DecisionInput::new(
            DecisionPayload::CustomerService(CustomerServicePayload {
                ticket_id: " ".to_string(),
                customer_id: "C-1".to_string(),
                category: "tracking".to_string(),
                message: "where is it".to_string(),
            }),
            Priority::Medium,
        );
        let result = engine.decide(input).await;
        assert!(result.is_fallback());
        assert_eq!(engine.history_len(), 0);
        assert_eq!(store.decisions().len(), 1);
    }

    #[tokio::test]
    async fn test_history_trims_and_learning_rate_decays() {
        let config = DecisionConfig {
            history_capacity: 10,
            history_trim_to: 5,
            learning_window: 3,
            ..DecisionConfig::default()
        };
        let (engine, _store) = engine(config);
        // Low-priority shipments decide at 0.8 confidence: mean stays at 0.8, no change
        engine.decide(shipment_input(Priority::Low)).await;
        assert!((engine.learning_rate() - 0.1).abs() < 1e-12);

        for _ in 0..10 {
            engine.decide(shipment_input(Priority::Low)).await;
        }
        assert_eq!(engine.history_len(), 5);
        assert_eq!(engine.recent_decisions(2).len(), 2);
    }
}
