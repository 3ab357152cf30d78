//! Standard TMS build plan, enqueued when a fresh system starts on an empty board.

use crate::models::{DomainType, NewTask, Priority, TaskRequirements};

/// A plan entry. Dependencies refer to earlier entries by domain.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub task: NewTask,
    pub depends_on: &'static [DomainType],
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn standard_build_plan() -> Vec<PlannedTask> {
    use DomainType::*;

    vec![
        PlannedTask {
            task: NewTask::new(Research, Priority::High, "Research latest TMS technologies and market trends")
                .with_estimated_hours(168.0)
                .with_requirements(TaskRequirements::Research {
                    scope: "market_analysis".to_string(),
                    timeframe: "1_week".to_string(),
                }),
            depends_on: &[],
        },
        PlannedTask {
            task: NewTask::new(Database, Priority::Critical, "Design comprehensive TMS database schema")
                .with_estimated_hours(48.0)
                .with_requirements(TaskRequirements::Schema {
                    entities: strings(&["users", "shipments", "carriers", "customers", "financials"]),
                }),
            depends_on: &[],
        },
        PlannedTask {
            task: NewTask::new(Backend, Priority::High, "Develop core TMS API endpoints")
                .with_estimated_hours(72.0)
                .with_requirements(TaskRequirements::Endpoints {
                    endpoints: strings(&["shipments", "users", "carriers", "analytics"]),
                }),
            depends_on: &[Database],
        },
        PlannedTask {
            task: NewTask::new(Frontend, Priority::High, "Build responsive TMS dashboard")
                .with_estimated_hours(96.0)
                .with_requirements(TaskRequirements::Interface {
                    components: strings(&["dashboard", "shipment_tracking", "analytics"]),
                }),
            depends_on: &[Backend],
        },
        PlannedTask {
            task: NewTask::new(Ui, Priority::Medium, "Design user-friendly TMS interface")
                .with_estimated_hours(60.0)
                .with_requirements(TaskRequirements::Interface {
                    components: strings(&["design_system", "accessibility", "mobile_first"]),
                }),
            depends_on: &[],
        },
        PlannedTask {
            task: NewTask::new(Portal, Priority::Medium, "Implement portal management system")
                .with_estimated_hours(84.0)
                .with_requirements(TaskRequirements::Interface {
                    components: strings(&["user_management", "permissions"]),
                }),
            depends_on: &[Backend, Frontend],
        },
        PlannedTask {
            task: NewTask::new(Api, Priority::Medium, "Create API integration hub")
                .with_estimated_hours(72.0)
                .with_requirements(TaskRequirements::Endpoints {
                    endpoints: strings(&["carriers", "tracking", "payment", "notification"]),
                }),
            depends_on: &[Backend],
        },
        PlannedTask {
            task: NewTask::new(Security, Priority::Critical, "Implement security and compliance measures")
                .with_estimated_hours(96.0)
                .with_requirements(TaskRequirements::Compliance {
                    standards: strings(&["GDPR", "SOC2", "PCI"]),
                    features: strings(&["encryption", "audit_logs", "access_control"]),
                }),
            depends_on: &[Backend, Database],
        },
        PlannedTask {
            task: NewTask::new(Testing, Priority::High, "Comprehensive testing suite")
                .with_estimated_hours(60.0)
                .with_requirements(TaskRequirements::TestSuite {
                    coverage_percent: 90,
                    types: strings(&["unit", "integration", "e2e", "performance"]),
                }),
            depends_on: &[Frontend, Backend],
        },
        PlannedTask {
            task: NewTask::new(Deployment, Priority::High, "Automated deployment pipeline")
                .with_estimated_hours(48.0)
                .with_requirements(TaskRequirements::Deployment {
                    environment: "staging".to_string(),
                    auto_rollback: false,
                }),
            depends_on: &[Testing],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plan_dependencies_point_backwards() {
        let plan = standard_build_plan();
        let mut seen = HashSet::new();
        for entry in &plan {
            for dep in entry.depends_on {
                assert!(seen.contains(dep), "{:?} depends on later {:?}", entry.task.domain, dep);
            }
            seen.insert(entry.task.domain);
        }
        assert_eq!(plan.len(), 10);
    }
}
