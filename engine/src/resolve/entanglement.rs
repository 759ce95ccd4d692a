//! Entanglement side effects.
//!
//! When a planet takes part in combat, every planet on its entanglement list
//! gains or loses troops in proportion to its own garrison. The applier does
//! not re-apply the troop cap after a positive shift; callers clamp.

use serde::{Deserialize, Serialize};

use crate::board::{EntanglementEffect, Galaxy, Interference, PlanetId};

/// Upper bound on the resonance factor, in tenths.
const MAX_RESONANCE_TENTHS: u32 = 3;

/// One partner planet's troop change caused by an entanglement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntanglementShift {
    pub planet: PlanetId,
    pub source: PlanetId,
    pub kind: Interference,
    pub magnitude: u8,
    pub troops_before: u8,
    pub troops_after: u8,
}

/// Resonance factor `min(0.3, 0.1 * partners)`, expressed in tenths so the
/// delta below stays in exact integer arithmetic.
pub fn resonance_tenths(partners: usize) -> u32 {
    (partners as u32).min(MAX_RESONANCE_TENTHS)
}

/// Troop change for a partner holding `target_troops`:
/// `max(1, floor(target_troops * resonance))`.
pub fn entanglement_delta(target_troops: u8, partners: usize) -> u8 {
    let scaled = u32::from(target_troops) * resonance_tenths(partners) / 10;
    scaled.max(1).min(u32::from(u8::MAX)) as u8
}

/// Applies the resonance of `source` to each of its entangled partners.
///
/// Positive polarity adds the delta, negative subtracts it, floored at zero.
/// Partners missing from the galaxy are ignored but still count toward the
/// resonance factor. Each touched planet gets an [`EntanglementEffect`]
/// descriptor. Returns the shifts in map order; empty when the source is
/// unknown or has no partners.
pub fn apply_entanglement(
    galaxy: &mut Galaxy,
    source: &PlanetId,
    positive: bool,
) -> Vec<EntanglementShift> {
    let partners = match galaxy.get(source) {
        Some(planet) if planet.is_entangled() => planet.entangled_with.clone(),
        _ => return Vec::new(),
    };

    let kind = Interference::from_positive(positive);
    let mut shifts = Vec::new();

    for planet in galaxy.iter_mut() {
        if !partners.contains(&planet.id) {
            continue;
        }
        let delta = entanglement_delta(planet.troops, partners.len());
        let before = planet.troops;
        planet.troops = if positive {
            before.saturating_add(delta)
        } else {
            before.saturating_sub(delta)
        };
        planet.entanglement_effect = Some(EntanglementEffect {
            kind,
            magnitude: delta,
            source: source.clone(),
        });

        tracing::debug!(
            planet = %planet.id,
            source = %source,
            ?kind,
            delta,
            before,
            after = planet.troops,
            "entanglement shift"
        );

        shifts.push(EntanglementShift {
            planet: planet.id.clone(),
            source: source.clone(),
            kind,
            magnitude: delta,
            troops_before: before,
            troops_after: planet.troops,
        });
    }

    shifts
}
