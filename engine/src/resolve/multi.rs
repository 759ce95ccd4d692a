//! Simultaneous attacks on one target.
//!
//! When more than one attack lands on the same planet in a round, the
//! interference model is not used. The committed forces are summed and
//! subtracted from the garrison.

use serde::{Deserialize, Serialize};

use super::entanglement::{apply_entanglement, EntanglementShift};
use crate::board::{Galaxy, PlanetId, PlayerId, MAX_TROOPS_PER_PLANET};

/// One attacker's share of a contested target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub attacker: PlayerId,
    pub color: String,
    pub from: PlanetId,
    pub troops: u8,
}

/// How a contested target ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MultiOutcome {
    /// The defender keeps the planet with the remainder.
    Held { remaining: u8 },
    /// The forces cancelled out exactly.
    Neutralized,
    /// The strongest contributor takes the planet with its committed force.
    Captured { by: PlayerId, troops: u8 },
}

/// Resolves the sum of `attacks` against `target_troops`.
///
/// Ties between equal contributions go to the earliest one. An empty attack
/// list leaves the defender holding.
pub fn resolve_multiple_attacks(target_troops: u8, attacks: &[Contribution]) -> MultiOutcome {
    let total: i32 = attacks.iter().map(|a| i32::from(a.troops)).sum();
    let remainder = i32::from(target_troops) - total;

    if remainder > 0 {
        return MultiOutcome::Held {
            remaining: remainder as u8,
        };
    }
    if remainder == 0 {
        return MultiOutcome::Neutralized;
    }

    let mut strongest: Option<&Contribution> = None;
    for attack in attacks {
        match strongest {
            Some(best) if attack.troops <= best.troops => {}
            _ => strongest = Some(attack),
        }
    }
    match strongest {
        Some(best) => MultiOutcome::Captured {
            by: best.attacker.clone(),
            troops: best.troops.min(MAX_TROOPS_PER_PLANET),
        },
        None => MultiOutcome::Neutralized,
    }
}

/// Everything that happened at one contested target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAttackReport {
    pub target: PlanetId,
    pub planet_name: String,
    pub defender: Option<PlayerId>,
    pub defender_troops: u8,
    pub total_attacking: u32,
    pub contributions: Vec<Contribution>,
    pub outcome: MultiOutcome,
    pub final_troops: u8,
    pub entanglement: Vec<EntanglementShift>,
}

/// Applies a multi-attack to `galaxy`.
///
/// Each source planet is debited by its committed force. The target's
/// partners resonate positively when it ends with an owner and negatively
/// when neutralized; the sources' partners resonate positively only on
/// capture. Troops are re-clamped afterwards. Returns `None` if the target
/// does not exist.
pub fn apply_multiple_attacks(
    galaxy: &mut Galaxy,
    target: &PlanetId,
    attacks: &[Contribution],
) -> Option<MultiAttackReport> {
    let planet = galaxy.get(target)?;
    let defender_troops = planet.troops;
    let defender = planet.owner().cloned();
    let planet_name = planet.name.clone();

    for attack in attacks {
        if let Some(source) = galaxy.get_mut(&attack.from) {
            source.troops = source.troops.saturating_sub(attack.troops);
        }
    }

    let outcome = resolve_multiple_attacks(defender_troops, attacks);
    if let Some(planet) = galaxy.get_mut(target) {
        match &outcome {
            MultiOutcome::Held { remaining } => planet.troops = *remaining,
            MultiOutcome::Neutralized => planet.neutralize(),
            MultiOutcome::Captured { by, troops } => {
                let color = attacks
                    .iter()
                    .find(|a| &a.attacker == by)
                    .map(|a| a.color.as_str())
                    .unwrap_or_default();
                planet.set_owner(by.clone(), color);
                planet.troops = *troops;
            }
        }
    }

    let target_positive = !matches!(outcome, MultiOutcome::Neutralized);
    let sources_positive = matches!(outcome, MultiOutcome::Captured { .. });
    let mut entanglement = apply_entanglement(galaxy, target, target_positive);
    let mut seen: Vec<&PlanetId> = Vec::new();
    for attack in attacks {
        if seen.contains(&&attack.from) {
            continue;
        }
        seen.push(&attack.from);
        entanglement.extend(apply_entanglement(galaxy, &attack.from, sources_positive));
    }

    galaxy.clamp_troops();
    let final_troops = galaxy.get(target).map(|p| p.troops).unwrap_or(0);

    tracing::debug!(
        %target,
        attackers = attacks.len(),
        defender_troops,
        ?outcome,
        "multi-attack resolved"
    );

    Some(MultiAttackReport {
        target: target.clone(),
        planet_name,
        defender,
        defender_troops,
        total_attacking: attacks.iter().map(|a| u32::from(a.troops)).sum(),
        contributions: attacks.to_vec(),
        outcome,
        final_troops,
        entanglement,
    })
}
