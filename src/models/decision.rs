//! Decision inputs, results and audit records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::task::Priority;
use crate::constants::ESCALATE_TO_HUMAN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Shipment,
    CustomerService,
    Financial,
    Analytics,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipment => "shipment",
            Self::CustomerService => "customer_service",
            Self::Financial => "financial",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedImpact {
    Low,
    Medium,
    High,
}

impl EstimatedImpact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPayload {
    pub shipment_id: String,
    pub origin: String,
    pub destination: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub preferred_carrier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerServicePayload {
    pub ticket_id: String,
    pub customer_id: String,
    /// Free-form category such as `tracking`, `billing` or `complaint`
    pub category: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPayload {
    pub reference: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub counterparty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPayload {
    pub report: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    pub window_days: u32,
}

/// Decision payload, tagged by decision type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionPayload {
    Shipment(ShipmentPayload),
    CustomerService(CustomerServicePayload),
    Financial(FinancialPayload),
    Analytics(AnalyticsPayload),
}

impl DecisionPayload {
    pub fn decision_type(&self) -> DecisionType {
        match self {
            Self::Shipment(_) => DecisionType::Shipment,
            Self::CustomerService(_) => DecisionType::CustomerService,
            Self::Financial(_) => DecisionType::Financial,
            Self::Analytics(_) => DecisionType::Analytics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub decision_type: DecisionType,
    pub payload: DecisionPayload,
    pub priority: Priority,
}

impl DecisionInput {
    /// Build an input whose decision type follows the payload
    pub fn new(payload: DecisionPayload, priority: Priority) -> Self {
        Self {
            decision_type: payload.decision_type(),
            payload,
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub action: String,
    pub confidence: f64,
    pub reasoning: String,
    pub estimated_impact: EstimatedImpact,
    pub requires_human_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl DecisionResult {
    /// Fallback returned whenever a decision cannot be made
    pub fn escalate_to_human(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            action: ESCALATE_TO_HUMAN.to_string(),
            confidence: 0.0,
            reasoning: format!("Automated decision failed, escalating to human review: {reason}"),
            estimated_impact: EstimatedImpact::Medium,
            requires_human_review: true,
            metadata: Some(serde_json::json!({ "fallback": true, "error": reason })),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.action == ESCALATE_TO_HUMAN && self.confidence == 0.0
    }
}

/// Audit row written for every decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub decision_type: DecisionType,
    pub priority: Priority,
    pub action: String,
    pub confidence: f64,
    pub reasoning: String,
    pub estimated_impact: EstimatedImpact,
    pub requires_human_review: bool,
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(input: &DecisionInput, result: &DecisionResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            decision_type: input.decision_type,
            priority: input.priority,
            action: result.action.clone(),
            confidence: result.confidence,
            reasoning: result.reasoning.clone(),
            estimated_impact: result.estimated_impact,
            requires_human_review: result.requires_human_review,
            metadata: result.metadata.clone(),
            timestamp,
        }
    }
}
