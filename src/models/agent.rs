use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::DomainType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Running,
    Stopped,
    Error,
}

/// Status of the single agent responsible for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,
    pub agent_type: DomainType,
    pub name: String,
    pub capabilities: Vec<String>,
    pub status: AgentState,
    pub last_heartbeat: DateTime<Utc>,
    pub tasks_completed: u64,
    pub errors: Vec<String>,
}

impl AgentStatus {
    pub fn is_running(&self) -> bool {
        self.status == AgentState::Running
    }
}
