use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{
    ActionType, PreviewEntry, RecommendedAction, RiskClient, UnpaidClient,
};

/// Turns aggregate risk and ledger state into ranked, batched interventions.
#[derive(Debug, Clone)]
pub struct ActionRecommender {
    preview_limit: usize,
}

impl Default for ActionRecommender {
    fn default() -> Self {
        Self { preview_limit: 3 }
    }
}

impl ActionRecommender {
    pub fn new(preview_limit: usize) -> Self {
        Self {
            preview_limit: preview_limit.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.actions.preview_limit)
    }

    pub fn recommend(
        &self,
        risk_clients: &[RiskClient],
        unpaid_clients: &[UnpaidClient],
        expiring_count: usize,
    ) -> Vec<RecommendedAction> {
        let mut actions = Vec::new();

        let mut at_risk: Vec<&RiskClient> = risk_clients.iter().collect();
        at_risk.sort_by(|a, b| b.risk_percent.cmp(&a.risk_percent));
        if !at_risk.is_empty() {
            let count = at_risk.len();
            actions.push(self.member_action(
                ActionType::SendReminder,
                format!("Send renewal reminders to {}", members(count)),
                Some("Expiring soon or showing cancellation risk".to_string()),
                at_risk
                    .iter()
                    .map(|client| (client.id, client.full_name.as_str(), client.risk_percent)),
            ));
        }

        if !unpaid_clients.is_empty() {
            let count = unpaid_clients.len();
            actions.push(self.member_action(
                ActionType::FollowUpPayment,
                format!("Follow up on {} outstanding {}", count, plural(count, "balance", "balances")),
                Some("Members with pending payments".to_string()),
                unpaid_clients
                    .iter()
                    .map(|client| (client.id, client.full_name.as_str(), None)),
            ));
        }

        if expiring_count > 0 {
            actions.push(RecommendedAction {
                id: ActionType::OfferDiscount.as_str().to_string(),
                action_type: ActionType::OfferDiscount,
                label: "Offer a renewal discount".to_string(),
                sublabel: Some(format!(
                    "{} expiring soon",
                    plural(expiring_count, "1 membership", &format!("{expiring_count} memberships"))
                )),
                count: expiring_count,
                client_ids: Vec::new(),
                preview: Vec::new(),
            });
        }

        actions.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.action_type.priority().cmp(&b.action_type.priority()))
        });

        debug!(
            actions = actions.len(),
            at_risk = risk_clients.len(),
            unpaid = unpaid_clients.len(),
            expiring_count,
            "recommended actions"
        );
        actions
    }

    fn member_action<'a>(
        &self,
        action_type: ActionType,
        label: String,
        sublabel: Option<String>,
        members: impl Iterator<Item = (Uuid, &'a str, Option<u8>)>,
    ) -> RecommendedAction {
        let mut client_ids = Vec::new();
        let mut preview = Vec::new();

        for (id, name, risk_percent) in members {
            client_ids.push(id);
            if preview.len() < self.preview_limit {
                preview.push(PreviewEntry {
                    name: name.to_string(),
                    meta: risk_percent.map(|percent| format!("{percent}% risk")),
                });
            }
        }

        RecommendedAction {
            id: action_type.as_str().to_string(),
            action_type,
            label,
            sublabel,
            count: client_ids.len(),
            client_ids,
            preview,
        }
    }
}

pub fn recommend_actions(
    risk_clients: &[RiskClient],
    unpaid_clients: &[UnpaidClient],
    expiring_count: usize,
) -> Vec<RecommendedAction> {
    ActionRecommender::default().recommend(risk_clients, unpaid_clients, expiring_count)
}

fn members(count: usize) -> String {
    plural(count, "1 at-risk member", &format!("{count} at-risk members"))
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        one.to_string()
    } else {
        many.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn risk_client(name: &str, percent: u8) -> RiskClient {
        RiskClient {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            risk_percent: Some(percent),
        }
    }

    fn unpaid_client(name: &str) -> UnpaidClient {
        UnpaidClient {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
        }
    }

    #[test]
    fn nothing_to_do_yields_no_actions() {
        assert!(recommend_actions(&[], &[], 0).is_empty());
    }

    #[test]
    fn five_risk_clients_make_one_reminder_with_three_previews() {
        let clients: Vec<RiskClient> = [40, 90, 55, 72, 31]
            .iter()
            .enumerate()
            .map(|(i, percent)| risk_client(&format!("Member {i}"), *percent))
            .collect();

        let actions = recommend_actions(&clients, &[], 0);
        assert_eq!(actions.len(), 1);
        let action = &actions[0];
        assert_eq!(action.action_type, ActionType::SendReminder);
        assert_eq!(action.count, 5);
        assert_eq!(action.preview.len(), 3);
        assert_eq!(action.remaining(), 2);
        assert_eq!(action.label, "Send renewal reminders to 5 at-risk members");

        let names: Vec<&str> = action.preview.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Member 1", "Member 3", "Member 2"]);
        assert_eq!(action.preview[0].meta.as_deref(), Some("90% risk"));
        assert_eq!(action.client_ids[0], clients[1].id);
        assert_eq!(action.client_ids[4], clients[4].id);
    }

    #[test]
    fn equal_risk_keeps_insertion_order() {
        let clients = vec![
            risk_client("First", 50),
            risk_client("Second", 50),
            risk_client("Third", 80),
        ];
        let actions = recommend_actions(&clients, &[], 0);
        let ids = &actions[0].client_ids;
        assert_eq!(ids, &vec![clients[2].id, clients[0].id, clients[1].id]);
    }

    #[test]
    fn actions_rank_by_count_then_type_priority() {
        let risk = vec![risk_client("A", 80), risk_client("B", 40)];
        let unpaid = vec![unpaid_client("C"), unpaid_client("D"), unpaid_client("E")];

        let actions = recommend_actions(&risk, &unpaid, 2);
        let order: Vec<ActionType> = actions.iter().map(|a| a.action_type).collect();
        assert_eq!(
            order,
            vec![
                ActionType::FollowUpPayment,
                ActionType::SendReminder,
                ActionType::OfferDiscount,
            ]
        );

        let actions = recommend_actions(&risk, &unpaid[..2], 2);
        let order: Vec<ActionType> = actions.iter().map(|a| a.action_type).collect();
        assert_eq!(
            order,
            vec![
                ActionType::SendReminder,
                ActionType::FollowUpPayment,
                ActionType::OfferDiscount,
            ]
        );
    }

    #[test]
    fn unpaid_preview_has_no_risk_meta() {
        let unpaid = vec![unpaid_client("C")];
        let actions = recommend_actions(&[], &unpaid, 0);
        assert_eq!(actions.len(), 1);
        assert_eq!(
            actions[0].preview,
            vec![PreviewEntry {
                name: "C".to_string(),
                meta: None,
            }]
        );
        assert_eq!(actions[0].label, "Follow up on 1 outstanding balance");
    }

    #[test]
    fn discount_is_count_only() {
        let actions = recommend_actions(&[], &[], 4);
        assert_eq!(actions.len(), 1);
        let action = &actions[0];
        assert_eq!(action.action_type, ActionType::OfferDiscount);
        assert_eq!(action.count, 4);
        assert!(action.preview.is_empty());
        assert!(action.client_ids.is_empty());
        assert_eq!(action.sublabel.as_deref(), Some("4 memberships expiring soon"));
    }

    #[test]
    fn preview_limit_is_configurable() {
        let clients: Vec<RiskClient> = (0..4).map(|i| risk_client("M", 40 + i)).collect();
        let actions = ActionRecommender::new(1).recommend(&clients, &[], 0);
        assert_eq!(actions[0].preview.len(), 1);
        assert_eq!(actions[0].remaining(), 3);
    }
}
