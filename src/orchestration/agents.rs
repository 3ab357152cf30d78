//! Agent roster: one agent per enabled domain.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::DomainToggles;
use crate::models::{AgentState, AgentStatus, DomainType};

/// Display name and capabilities of a domain's agent
pub fn agent_profile(domain: DomainType) -> (&'static str, &'static [&'static str]) {
    match domain {
        DomainType::Research => (
            "Research Agent",
            &["market_analysis", "technology_research", "competitor_analysis"],
        ),
        DomainType::Frontend => (
            "Frontend Development Agent",
            &["react_development", "ui_components", "responsive_design"],
        ),
        DomainType::Backend => (
            "Backend Development Agent",
            &["api_development", "database_design", "business_logic"],
        ),
        DomainType::Database => (
            "Database Agent",
            &["schema_design", "optimization", "migrations"],
        ),
        DomainType::Testing => (
            "Testing Agent",
            &["unit_testing", "integration_testing", "e2e_testing"],
        ),
        DomainType::Deployment => (
            "Deployment Agent",
            &["ci_cd", "infrastructure", "monitoring"],
        ),
        DomainType::Ui => (
            "UI/UX Design Agent",
            &["wireframing", "prototyping", "user_research"],
        ),
        DomainType::Portal => (
            "Portal Management Agent",
            &["user_management", "role_based_access", "dashboard_creation"],
        ),
        DomainType::Api => (
            "API Integration Agent",
            &["api_design", "integration", "documentation"],
        ),
        DomainType::Security => (
            "Security & Compliance Agent",
            &["security_audit", "compliance_check", "vulnerability_scan"],
        ),
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: BTreeMap<DomainType, AgentStatus>,
}

impl AgentRoster {
    /// Create a stopped agent for every enabled domain
    pub fn new(domains: &DomainToggles, now: DateTime<Utc>) -> Self {
        let agents = domains
            .enabled()
            .map(|domain| {
                let (name, capabilities) = agent_profile(domain);
                let status = AgentStatus {
                    id: domain.as_str().to_string(),
                    agent_type: domain,
                    name: name.to_string(),
                    capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
                    status: AgentState::Stopped,
                    last_heartbeat: now,
                    tasks_completed: 0,
                    errors: Vec::new(),
                };
                (domain, status)
            })
            .collect();
        Self { agents }
    }

    pub fn start_all(&mut self, now: DateTime<Utc>) {
        for agent in self.agents.values_mut() {
            agent.status = AgentState::Running;
            agent.last_heartbeat = now;
        }
        info!(agents = self.agents.len(), "Started development agents");
    }

    pub fn stop_all(&mut self) {
        for agent in self.agents.values_mut() {
            agent.status = AgentState::Stopped;
        }
        info!(agents = self.agents.len(), "Stopped development agents");
    }

    /// Refresh the heartbeat of every running agent
    pub fn heartbeat(&mut self, now: DateTime<Utc>) {
        for agent in self.agents.values_mut().filter(|a| a.is_running()) {
            agent.last_heartbeat = now;
        }
    }

    pub fn record_completion(&mut self, domain: DomainType) {
        if let Some(agent) = self.agents.get_mut(&domain) {
            agent.tasks_completed += 1;
        }
    }

    pub fn record_failure(&mut self, domain: DomainType, error: &str) {
        if let Some(agent) = self.agents.get_mut(&domain) {
            agent.errors.push(error.to_string());
        }
    }

    pub fn get(&self, domain: DomainType) -> Option<&AgentStatus> {
        self.agents.get(&domain)
    }

    pub fn active_agent_ids(&self) -> Vec<String> {
        self.agents
            .values()
            .filter(|a| a.is_running())
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<AgentStatus> {
        self.agents.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
