//! # SLO Guard
//!
//! Per-portal monitoring against the error budget, system-wide SLO aggregation (uptime,
//! success rate, p95 latency) and the global emergency stop.

pub mod guard;
pub mod kill_switch;
pub mod mitigation;
pub mod portals;

pub use guard::{
    aggregate, evaluate, p95_nearest_rank, PortalSweep, SloBreach, SloGuard, SloKind, SloSnapshot,
};
pub use kill_switch::{KillSwitch, SwitchState};
pub use mitigation::{MitigationHooks, StoreMitigationHooks};
pub use portals::{HttpPortalProbe, PortalProbe, PortalRegistry, PortalSample};
