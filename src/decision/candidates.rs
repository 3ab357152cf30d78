//! Candidate actions per decision type. Base confidences are fixed; only the reasoning
//! text and impact estimates depend on the payload and analysis.

use super::context::{Analysis, DecisionContext, Level};
use crate::constants::ESCALATE_TO_HUMAN;
use crate::models::{DecisionInput, DecisionPayload, EstimatedImpact};

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub action: &'static str,
    pub base_confidence: f64,
    pub reasoning: String,
    pub estimated_impact: EstimatedImpact,
    pub requires_human_review: bool,
}

impl Candidate {
    fn new(
        action: &'static str,
        base_confidence: f64,
        reasoning: String,
        estimated_impact: EstimatedImpact,
    ) -> Self {
        Self {
            action,
            base_confidence,
            reasoning,
            estimated_impact,
            requires_human_review: false,
        }
    }

    fn escalation(base_confidence: f64, reasoning: String) -> Self {
        Self {
            action: ESCALATE_TO_HUMAN,
            base_confidence,
            reasoning,
            estimated_impact: EstimatedImpact::High,
            requires_human_review: true,
        }
    }
}

fn impact_of(level: Level) -> EstimatedImpact {
    match level {
        Level::Low => EstimatedImpact::Low,
        Level::Medium => EstimatedImpact::Medium,
        Level::High => EstimatedImpact::High,
    }
}

pub fn generate(
    input: &DecisionInput,
    analysis: &Analysis,
    context: &DecisionContext,
) -> Vec<Candidate> {
    match &input.payload {
        DecisionPayload::Shipment(shipment) => {
            let carrier = match shipment.preferred_carrier.as_deref() {
                Some(preferred) => match context.counterparty_performance(preferred) {
                    Some(score) => format!("preferred carrier {preferred} (reliability {:.0}%)", score * 100.0),
                    None => format!("preferred carrier {preferred}"),
                },
                None => match context.best_counterparty() {
                    Some((name, score)) => format!("{name} (reliability {:.0}%)", score * 100.0),
                    None => "best available carrier".to_string(),
                },
            };
            vec![
                Candidate::new(
                    "auto_assign_carrier",
                    0.8,
                    format!(
                        "Assign {carrier} to shipment {} from {} to {}",
                        shipment.shipment_id, shipment.origin, shipment.destination
                    ),
                    EstimatedImpact::Medium,
                ),
                Candidate::new(
                    "optimize_route",
                    0.7,
                    format!(
                        "Re-optimize the {} to {} route for {:.0}kg; cost impact {:?}",
                        shipment.origin, shipment.destination, shipment.weight_kg, analysis.cost_impact
                    ),
                    impact_of(analysis.cost_impact),
                ),
                Candidate::escalation(
                    0.3,
                    format!(
                        "Shipment {} carries {:?} risk; a dispatcher should confirm",
                        shipment.shipment_id, analysis.risk_level
                    ),
                ),
            ]
        }
        DecisionPayload::CustomerService(ticket) => vec![
            Candidate::new(
                "auto_respond",
                0.75,
                format!(
                    "Send templated {} response on ticket {}",
                    ticket.category, ticket.ticket_id
                ),
                EstimatedImpact::Low,
            ),
            Candidate::new(
                "route_to_specialist",
                0.65,
                format!(
                    "Route ticket {} to a {} specialist; complexity {:?}",
                    ticket.ticket_id, ticket.category, analysis.complexity
                ),
                EstimatedImpact::Medium,
            ),
            Candidate::escalation(
                0.4,
                format!(
                    "Customer {} needs a human agent on ticket {}",
                    ticket.customer_id, ticket.ticket_id
                ),
            ),
        ],
        DecisionPayload::Financial(financial) => {
            let mut flag = Candidate::new(
                "flag_for_review",
                0.6,
                format!(
                    "Flag {} ({:.2} {}) for finance review",
                    financial.reference, financial.amount, financial.currency
                ),
                impact_of(analysis.cost_impact),
            );
            flag.requires_human_review = true;
            vec![
                Candidate::new(
                    "auto_approve",
                    0.7,
                    format!(
                        "Approve {} for {:.2} {}; cost impact {:?}",
                        financial.reference, financial.amount, financial.currency, analysis.cost_impact
                    ),
                    impact_of(analysis.cost_impact),
                ),
                flag,
                Candidate::escalation(
                    0.35,
                    format!(
                        "{} carries {:?} financial risk; a controller should sign off",
                        financial.reference, analysis.risk_level
                    ),
                ),
            ]
        }
        DecisionPayload::Analytics(analytics) => vec![
            Candidate::new(
                "generate_report",
                0.85,
                format!(
                    "Generate {} over the last {} days",
                    analytics.report, analytics.window_days
                ),
                EstimatedImpact::Low,
            ),
            Candidate::new(
                "schedule_deep_analysis",
                0.6,
                format!(
                    "Schedule deep analysis of {} ({} metrics); complexity {:?}",
                    analytics.report,
                    analytics.metrics.len(),
                    analysis.complexity
                ),
                EstimatedImpact::Medium,
            ),
        ],
    }
}
