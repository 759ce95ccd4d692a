//! Round resolution.
//!
//! Pure, deterministic pieces: the quantum combat model, entanglement side
//! effects, simultaneous multi-attacks, Action Log replay ordering, the round
//! executor, and phase sequencing.

pub mod combat;
pub mod entanglement;
pub mod multi;
pub mod phase;
pub mod quantum;
pub mod replay;
pub mod round;

pub use combat::{apply_attack, casualties, resolve_attack, AttackReport, CombatError, CombatOutcome};
pub use entanglement::{apply_entanglement, entanglement_delta, EntanglementShift};
pub use multi::{
    apply_multiple_attacks, resolve_multiple_attacks, Contribution, MultiAttackReport, MultiOutcome,
};
pub use phase::{troop_budget, PhaseMachine, PlayerTurn, RoundAdvance};
pub use quantum::{inverse_qft, pseudo_random, qft, quantum_state, QuantumState, Salt};
pub use replay::ReplayPlan;
pub use round::{execute_round, RoundEvent, RoundResolution, SkipReason, SkippedAction};
