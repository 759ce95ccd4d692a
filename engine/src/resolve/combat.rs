//! Quantum combat resolution for a single attacker.
//!
//! `resolve_attack` is the pure outcome calculation. `apply_attack` runs it
//! against a galaxy: it debits the attacking planet, updates the defender,
//! fires entanglement on both sides, and hands the planet over on capture.

use serde::{Deserialize, Serialize};

use super::entanglement::{apply_entanglement, EntanglementShift};
use super::quantum::{interference, qft, quantum_state, QuantumState, Salt};
use crate::board::{Galaxy, PlanetId, Player, PlayerId, MAX_TROOPS_PER_PLANET};

/// Interference sum above which the attacker is favored.
pub const CONSTRUCTIVE_THRESHOLD: f64 = 0.5;

/// Errors from attack preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CombatError {
    #[error("must attack with at least 1 troop")]
    NoTroopsCommitted,

    #[error("must leave at least 1 troop on the attacking planet ({committed} committed, {available} available)")]
    MustLeaveTroop { committed: u8, available: u8 },

    #[error("unknown planet '{0}'")]
    UnknownPlanet(PlanetId),
}

/// Intermediate vectors of one combat, kept for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumTrace {
    pub attacker_state: QuantumState,
    pub attacker_qft: QuantumState,
    pub defender_qft: QuantumState,
    pub interference: QuantumState,
    pub interference_sum: f64,
}

/// Result of one attack, before it is applied to any planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub constructive_interference: bool,
    pub defender_troops_after: u8,
    /// Troops left on the attacking planet.
    pub attacker_troops_after: u8,
    pub captured: bool,
    pub trace: QuantumTrace,
}

/// Computes the outcome of `attacking_troops` from a planet holding
/// `attacker_planet_troops` against a planet holding `defender_troops`.
///
/// Constructive interference: the defender keeps `floor(70%)`; the attacking
/// planet loses `floor(80%)` of the committed force. Destructive: the defender
/// grows to `ceil(130%)` capped at the troop limit and the whole committed
/// force is lost. A defender left at zero means capture.
///
/// Fails without side effects unless `0 < attacking_troops < attacker_planet_troops`.
pub fn resolve_attack(
    defender_troops: u8,
    attacker_planet_troops: u8,
    attacking_troops: u8,
    seed: u32,
    salt: Salt,
) -> Result<CombatOutcome, CombatError> {
    if attacking_troops == 0 {
        return Err(CombatError::NoTroopsCommitted);
    }
    if attacking_troops >= attacker_planet_troops {
        return Err(CombatError::MustLeaveTroop {
            committed: attacking_troops,
            available: attacker_planet_troops,
        });
    }

    let attacker_state = quantum_state(attacking_troops, seed, salt.attacker);
    let defender_state = quantum_state(defender_troops, seed, salt.defender);
    let attacker_qft = qft(&attacker_state);
    let defender_qft = qft(&defender_state);
    let mixed = interference(&attacker_qft, &defender_qft);
    let interference_sum: f64 = mixed.iter().sum();
    let constructive = interference_sum > CONSTRUCTIVE_THRESHOLD;

    let (defender_after, attacker_after) = casualties(
        constructive,
        defender_troops,
        attacker_planet_troops,
        attacking_troops,
    );

    Ok(CombatOutcome {
        constructive_interference: constructive,
        defender_troops_after: defender_after,
        attacker_troops_after: attacker_after,
        captured: defender_after == 0,
        trace: QuantumTrace {
            attacker_state,
            attacker_qft,
            defender_qft,
            interference: mixed,
            interference_sum,
        },
    })
}

/// Troop counts after combat for a given interference class:
/// `(defender_after, attacker_planet_after)`.
///
/// Requires `attacking_troops < attacker_planet_troops`.
pub fn casualties(
    constructive: bool,
    defender_troops: u8,
    attacker_planet_troops: u8,
    attacking_troops: u8,
) -> (u8, u8) {
    let defender = u32::from(defender_troops);
    let committed = u32::from(attacking_troops);
    let (defender_after, attacker_losses) = if constructive {
        (defender * 7 / 10, committed * 8 / 10)
    } else {
        let grown = (defender * 13).div_ceil(10);
        (grown.min(u32::from(MAX_TROOPS_PER_PLANET)), committed)
    };

    let defender_after = defender_after.min(u32::from(u8::MAX)) as u8;
    let attacker_after = u32::from(attacker_planet_troops).saturating_sub(attacker_losses) as u8;
    (defender_after, attacker_after)
}

/// Everything that happened in one applied attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    pub attacker: PlayerId,
    pub attacker_name: String,
    pub from: PlanetId,
    pub to: PlanetId,
    pub planet_name: String,
    /// Previous owner of the target; `None` for a neutral planet.
    pub defender: Option<PlayerId>,
    pub attacking_troops: u8,
    pub defender_troops: u8,
    pub final_attacker_troops: u8,
    pub final_defender_troops: u8,
    pub constructive_interference: bool,
    pub captured: bool,
    pub outcome: String,
    pub entanglement: Vec<EntanglementShift>,
    pub trace: QuantumTrace,
}

/// Resolves an attack from `from` to `to` and writes the result into `galaxy`.
///
/// Entanglement fires on the attacking planet's partners with the attacker's
/// polarity and on the defender's partners with the opposite polarity. On
/// capture the target switches to the attacker with the committed force as
/// its garrison. Every planet is clamped back to the troop cap afterwards.
pub fn apply_attack(
    galaxy: &mut Galaxy,
    attacker: &Player,
    from: &PlanetId,
    to: &PlanetId,
    attacking_troops: u8,
    seed: u32,
    salt: Salt,
) -> Result<AttackReport, CombatError> {
    let source_troops = galaxy
        .get(from)
        .map(|p| p.troops)
        .ok_or_else(|| CombatError::UnknownPlanet(from.clone()))?;
    let target = galaxy
        .get(to)
        .ok_or_else(|| CombatError::UnknownPlanet(to.clone()))?;
    let defender_troops = target.troops;
    let defender = target.owner().cloned();
    let planet_name = target.name.clone();

    let outcome = resolve_attack(defender_troops, source_troops, attacking_troops, seed, salt)?;
    let constructive = outcome.constructive_interference;

    if let Some(source) = galaxy.get_mut(from) {
        source.troops = outcome.attacker_troops_after;
    }
    if let Some(target) = galaxy.get_mut(to) {
        target.troops = outcome.defender_troops_after;
    }

    let mut entanglement = apply_entanglement(galaxy, from, constructive);
    entanglement.extend(apply_entanglement(galaxy, to, !constructive));

    let outcome_text = if outcome.captured {
        if let Some(target) = galaxy.get_mut(to) {
            target.set_owner(attacker.id.clone(), &attacker.color);
            target.troops = attacking_troops.min(MAX_TROOPS_PER_PLANET);
        }
        format!(
            "Total defender collapse: {} captures {}",
            attacker.name, planet_name
        )
    } else if constructive {
        format!(
            "Constructive interference favored the attacker: defender lost {} troops",
            u32::from(defender_troops) * 3 / 10
        )
    } else {
        format!(
            "Destructive interference favored the defender: defender gained {} troops",
            (u32::from(defender_troops) * 3).div_ceil(10)
        )
    };

    galaxy.clamp_troops();

    let final_defender_troops = galaxy.get(to).map(|p| p.troops).unwrap_or(0);
    let final_attacker_troops = galaxy.get(from).map(|p| p.troops).unwrap_or(0);

    tracing::debug!(
        attacker = %attacker.id,
        %from,
        %to,
        attacking_troops,
        defender_troops,
        constructive,
        captured = outcome.captured,
        "attack resolved"
    );

    Ok(AttackReport {
        attacker: attacker.id.clone(),
        attacker_name: attacker.name.clone(),
        from: from.clone(),
        to: to.clone(),
        planet_name,
        defender,
        attacking_troops,
        defender_troops,
        final_attacker_troops,
        final_defender_troops,
        constructive_interference: constructive,
        captured: outcome.captured,
        outcome: outcome_text,
        entanglement,
        trace: outcome.trace,
    })
}
