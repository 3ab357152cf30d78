//! Bounded decision context and the static analysis rules.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::models::{DecisionInput, DecisionPayload, DecisionType, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

/// Coarse buckets derived from priority and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub risk_level: Level,
    pub cost_impact: Level,
    pub time_sensitivity: Level,
    pub complexity: Level,
}

/// Recent actions per decision type plus the counterparty and cost tables
#[derive(Debug)]
pub struct DecisionContext {
    capacity: usize,
    recent: HashMap<DecisionType, VecDeque<String>>,
    /// Reliability score in `[0, 1]` per carrier / counterparty
    counterparty_performance: HashMap<String, f64>,
    /// Cost per kg keyed by `(origin, destination)`
    lane_costs: HashMap<(String, String), f64>,
}

impl DecisionContext {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            recent: HashMap::new(),
            counterparty_performance: HashMap::new(),
            lane_costs: HashMap::new(),
        }
    }

    pub fn observe(&mut self, decision_type: DecisionType, action: &str) {
        let entries = self.recent.entry(decision_type).or_default();
        entries.push_back(action.to_string());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn recent_count(&self, decision_type: DecisionType) -> usize {
        self.recent.get(&decision_type).map_or(0, VecDeque::len)
    }

    /// How often `action` appears among the recent decisions of this type
    pub fn recent_share(&self, decision_type: DecisionType, action: &str) -> f64 {
        match self.recent.get(&decision_type) {
            Some(entries) if !entries.is_empty() => {
                entries.iter().filter(|a| a.as_str() == action).count() as f64
                    / entries.len() as f64
            }
            _ => 0.0,
        }
    }

    pub fn set_counterparty_performance(&mut self, name: impl Into<String>, score: f64) {
        self.counterparty_performance
            .insert(name.into(), score.clamp(0.0, 1.0));
    }

    pub fn counterparty_performance(&self, name: &str) -> Option<f64> {
        self.counterparty_performance.get(name).copied()
    }

    /// Highest-scoring counterparty; ties resolve by name
    pub fn best_counterparty(&self) -> Option<(&str, f64)> {
        self.counterparty_performance
            .iter()
            .map(|(name, score)| (name.as_str(), *score))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0)))
    }

    pub fn set_lane_cost(
        &mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        cost_per_kg: f64,
    ) {
        self.lane_costs
            .insert((origin.into(), destination.into()), cost_per_kg);
    }

    pub fn lane_cost(&self, origin: &str, destination: &str) -> Option<f64> {
        self.lane_costs
            .get(&(origin.to_string(), destination.to_string()))
            .copied()
    }
}

fn level_by_amount(amount: f64, medium_above: f64, high_above: f64) -> Level {
    if amount > high_above {
        Level::High
    } else if amount > medium_above {
        Level::Medium
    } else {
        Level::Low
    }
}

pub fn analyze(input: &DecisionInput, context: &DecisionContext) -> Analysis {
    let mut risk_level = match input.priority {
        Priority::Critical => Level::High,
        Priority::High => Level::Medium,
        Priority::Medium | Priority::Low => Level::Low,
    };
    let time_sensitivity = match input.priority {
        Priority::Critical | Priority::High => Level::High,
        Priority::Medium => Level::Medium,
        Priority::Low => Level::Low,
    };

    let (cost_impact, complexity) = match &input.payload {
        DecisionPayload::Shipment(shipment) => {
            match context.lane_cost(&shipment.origin, &shipment.destination) {
                Some(per_kg) => (
                    level_by_amount(per_kg * shipment.weight_kg, 1_000.0, 5_000.0),
                    Level::Low,
                ),
                None => (
                    level_by_amount(shipment.weight_kg, 1_000.0, 10_000.0),
                    Level::Medium,
                ),
            }
        }
        DecisionPayload::CustomerService(ticket) => {
            let complexity = match ticket.category.to_lowercase().as_str() {
                "complaint" | "claim" | "damage" => Level::High,
                "billing" => Level::Medium,
                _ => Level::Low,
            };
            if complexity == Level::High {
                risk_level = risk_level.max(Level::Medium);
            }
            (Level::Low, complexity)
        }
        DecisionPayload::Financial(financial) => {
            let cost = level_by_amount(financial.amount, 1_000.0, 10_000.0);
            if cost == Level::High {
                risk_level = Level::High;
            }
            let known = financial
                .counterparty
                .as_deref()
                .and_then(|c| context.counterparty_performance(c))
                .is_some();
            (cost, if known { Level::Low } else { Level::Medium })
        }
        DecisionPayload::Analytics(analytics) => {
            let complexity = if analytics.metrics.len() > 5 || analytics.window_days > 90 {
                Level::High
            } else {
                Level::Medium
            };
            (Level::Low, complexity)
        }
    };

    Analysis {
        risk_level,
        cost_impact,
        time_sensitivity,
        complexity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinancialPayload, ShipmentPayload};

    fn shipment(weight_kg: f64) -> DecisionInput {
        DecisionInput::new(
            DecisionPayload::Shipment(ShipmentPayload {
                shipment_id: "SHP-1".to_string(),
                origin: "CHI".to_string(),
                destination: "DAL".to_string(),
                weight_kg,
                preferred_carrier: None,
            }),
            Priority::Critical,
        )
    }

    #[test]
    fn test_observe_is_bounded() {
        let mut ctx = DecisionContext::new(3);
        for action in ["a", "b", "c", "d"] {
            ctx.observe(DecisionType::Shipment, action);
        }
        assert_eq!(ctx.recent_count(DecisionType::Shipment), 3);
        assert_eq!(ctx.recent_share(DecisionType::Shipment, "a"), 0.0);
        assert!((ctx.recent_share(DecisionType::Shipment, "d") - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_counterparty() {
        let mut ctx = DecisionContext::new(10);
        assert!(ctx.best_counterparty().is_none());
        ctx.set_counterparty_performance("acme", 0.91);
        ctx.set_counterparty_performance("swift", 0.97);
        ctx.set_counterparty_performance("zeta", 1.7);
        assert_eq!(ctx.best_counterparty(), Some(("zeta", 1.0)));
    }

    #[test]
    fn test_critical_shipment_analysis() {
        let mut ctx = DecisionContext::new(10);
        let analysis = analyze(&shipment(500.0), &ctx);
        assert_eq!(analysis.risk_level, Level::High);
        assert_eq!(analysis.time_sensitivity, Level::High);
        assert_eq!(analysis.complexity, Level::Medium);

        ctx.set_lane_cost("CHI", "DAL", 12.0);
        let analysis = analyze(&shipment(500.0), &ctx);
        assert_eq!(analysis.cost_impact, Level::High);
        assert_eq!(analysis.complexity, Level::Low);
    }

    #[test]
    fn test_large_payment_is_high_risk() {
        let ctx = DecisionContext::new(10);
        let input = DecisionInput::new(
            DecisionPayload::Financial(FinancialPayload {
                reference: "INV-9".to_string(),
                amount: 25_000.0,
                currency: "USD".to_string(),
                counterparty: None,
            }),
            Priority::Low,
        );
        let analysis = analyze(&input, &ctx);
        assert_eq!(analysis.risk_level, Level::High);
        assert_eq!(analysis.cost_impact, Level::High);
    }
}
