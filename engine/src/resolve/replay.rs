//! Replay ordering for a round's Action Log.
//!
//! Rows are first put in submission order, then split into three groups:
//! fortify, attack, movement. Each group keeps submission order. Attacks are
//! further bucketed by target, buckets in order of first appearance.

use std::collections::HashSet;

use crate::board::{ActionKind, PendingAction, PlanetId, PlayerId};
use crate::protocol::ActionLogEntry;

/// A log row in domain form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub order: u64,
    pub player: PlayerId,
    pub action: PendingAction,
}

/// All attacks logged against one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    pub target: PlanetId,
    pub attacks: Vec<PlannedAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayPlan {
    pub fortify: Vec<PlannedAction>,
    pub attacks: Vec<TargetGroup>,
    pub movements: Vec<PlannedAction>,
}

impl ReplayPlan {
    /// Builds a plan from log rows in any order.
    pub fn build(entries: &[ActionLogEntry]) -> Self {
        let mut rows: Vec<&ActionLogEntry> = entries.iter().collect();
        rows.sort_by_key(|e| e.submitted_order);

        let mut plan = ReplayPlan::default();
        for row in rows {
            let planned = PlannedAction {
                order: row.submitted_order,
                player: row.player_id.clone(),
                action: row.pending(),
            };
            match planned.action.kind() {
                ActionKind::Fortify => plan.fortify.push(planned),
                ActionKind::Movement => plan.movements.push(planned),
                ActionKind::Attack => {
                    let target = planned.action.to().clone();
                    match plan.attacks.iter_mut().find(|g| g.target == target) {
                        Some(group) => group.attacks.push(planned),
                        None => plan.attacks.push(TargetGroup {
                            target,
                            attacks: vec![planned],
                        }),
                    }
                }
            }
        }
        plan
    }

    /// Every planet that was the target of a logged attack.
    pub fn attacked_targets(&self) -> HashSet<PlanetId> {
        self.attacks.iter().map(|g| g.target.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fortify.len()
            + self.movements.len()
            + self.attacks.iter().map(|g| g.attacks.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NewAction;

    fn row(order: u64, player: &str, action: PendingAction) -> ActionLogEntry {
        ActionLogEntry::from_new(NewAction::new("g", 1, PlayerId::from(player), &action), order)
    }

    fn fortify(to: &str) -> PendingAction {
        PendingAction::Fortify {
            to: PlanetId::from(to),
            troops: 1,
        }
    }

    fn attack(from: &str, to: &str) -> PendingAction {
        PendingAction::Attack {
            from: PlanetId::from(from),
            to: PlanetId::from(to),
            troops: 1,
        }
    }

    fn movement(from: &str, to: &str) -> PendingAction {
        PendingAction::Movement {
            from: PlanetId::from(from),
            to: PlanetId::from(to),
            troops: 1,
        }
    }

    #[test]
    fn groups_keep_submission_order() {
        let entries = vec![
            row(5, "b", movement("x", "y")),
            row(1, "a", attack("a1", "t1")),
            row(0, "a", fortify("a1")),
            row(3, "b", fortify("b1")),
            row(2, "b", attack("b1", "t2")),
            row(4, "a", attack("a2", "t1")),
        ];
        let plan = ReplayPlan::build(&entries);

        let fortify_orders: Vec<u64> = plan.fortify.iter().map(|p| p.order).collect();
        assert_eq!(fortify_orders, vec![0, 3]);

        let targets: Vec<&str> = plan.attacks.iter().map(|g| g.target.as_str()).collect();
        assert_eq!(targets, vec!["t1", "t2"]);
        let t1: Vec<u64> = plan.attacks[0].attacks.iter().map(|p| p.order).collect();
        assert_eq!(t1, vec![1, 4]);

        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn attacked_targets_collects_every_target() {
        let entries = vec![row(0, "a", attack("a1", "t1")), row(1, "b", attack("b1", "t2"))];
        let targets = ReplayPlan::build(&entries).attacked_targets();
        assert!(targets.contains(&PlanetId::from("t1")));
        assert!(targets.contains(&PlanetId::from("t2")));
        assert!(!targets.contains(&PlanetId::from("a1")));
    }

    #[test]
    fn empty_log() {
        assert!(ReplayPlan::build(&[]).is_empty());
    }
}
