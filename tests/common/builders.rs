//! Configuration and payload builders shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use tms_autonomy::config::{AutonomyConfig, NotificationConfig, OrchestratorConfig};
use tms_autonomy::models::{
    AnalyticsPayload, CustomerServicePayload, DecisionInput, DecisionPayload, FinancialPayload,
    Priority, ShipmentPayload,
};
use tms_autonomy::{InMemoryStore, SharedStore};

/// Orchestrator settings with the quality gate and auto-deploy out of the way
pub fn quiet_orchestrator(max_concurrent_tasks: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrent_tasks,
        auto_deploy: false,
        quality_threshold: 0.0,
        ..OrchestratorConfig::default()
    }
}

/// Full config with no external endpoints and long loop periods, so tests drive every
/// tick themselves through `run_once`
pub fn test_config() -> AutonomyConfig {
    let mut config = AutonomyConfig::default();
    config.orchestrator = quiet_orchestrator(4);
    config.orchestrator.task_tick_interval_ms = 3_600_000;
    config.orchestrator.monitoring_interval_ms = 3_600_000;
    config.slo.check_interval_ms = 3_600_000;
    config.slo.portals = vec!["broker".to_string(), "carrier".to_string(), "shipper".to_string()];
    config.notifications = NotificationConfig::default();
    config.store.database_url = None;
    config
}

pub fn memory_store() -> (Arc<InMemoryStore>, SharedStore) {
    let store = Arc::new(InMemoryStore::new());
    let shared: SharedStore = store.clone();
    (store, shared)
}

pub struct ShipmentBuilder {
    payload: ShipmentPayload,
    priority: Priority,
}

impl ShipmentBuilder {
    pub fn new(shipment_id: &str) -> Self {
        Self {
            payload: ShipmentPayload {
                shipment_id: shipment_id.to_string(),
                origin: "CHI".to_string(),
                destination: "DAL".to_string(),
                weight_kg: 1_200.0,
                preferred_carrier: None,
            },
            priority: Priority::Medium,
        }
    }

    pub fn lane(mut self, origin: &str, destination: &str) -> Self {
        self.payload.origin = origin.to_string();
        self.payload.destination = destination.to_string();
        self
    }

    pub fn weight(mut self, weight_kg: f64) -> Self {
        self.payload.weight_kg = weight_kg;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> DecisionInput {
        DecisionInput::new(DecisionPayload::Shipment(self.payload), self.priority)
    }
}

pub fn ticket(category: &str, priority: Priority) -> DecisionInput {
    DecisionInput::new(
        DecisionPayload::CustomerService(CustomerServicePayload {
            ticket_id: "TCK-1".to_string(),
            customer_id: "CUS-9".to_string(),
            category: category.to_string(),
            message: "Where is my load?".to_string(),
        }),
        priority,
    )
}

pub fn invoice(amount: f64, counterparty: Option<&str>, priority: Priority) -> DecisionInput {
    DecisionInput::new(
        DecisionPayload::Financial(FinancialPayload {
            reference: "INV-77".to_string(),
            amount,
            currency: "USD".to_string(),
            counterparty: counterparty.map(String::from),
        }),
        priority,
    )
}

pub fn report(metrics: usize, window_days: u32, priority: Priority) -> DecisionInput {
    DecisionInput::new(
        DecisionPayload::Analytics(AnalyticsPayload {
            report: "lane-profitability".to_string(),
            metrics: (0..metrics).map(|i| format!("metric_{i}")).collect(),
            window_days,
        }),
        priority,
    )
}
