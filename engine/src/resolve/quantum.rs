//! Seeded pseudo-quantum mixing used by combat resolution.
//!
//! None of this is cryptographic. The only requirement is that every function
//! is a pure function of its inputs, bit-for-bit, on every platform: all
//! clients and the round executor must agree on each combat outcome.

use crate::board::MAX_TROOPS_PER_PLANET;

/// Dimension of a quantum state vector.
pub const QUANTUM_DIM: usize = 8;

/// A troop count encoded as a real-valued state vector.
pub type QuantumState = [f64; QUANTUM_DIM];

/// Salt offsets into the pseudo-random stream for each side of a battle.
///
/// The two ranges must not overlap, so equal troop counts still produce
/// different vectors for attacker and defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt {
    pub attacker: u32,
    pub defender: u32,
}

impl Default for Salt {
    fn default() -> Self {
        Salt {
            attacker: 0,
            defender: QUANTUM_DIM as u32,
        }
    }
}

/// Integer hash of `(seed, index)` mapped to `[0, 1)`.
///
/// All arithmetic wraps in 32-bit signed integers.
pub fn pseudo_random(seed: u32, index: u32) -> f64 {
    let x = (seed as i32).wrapping_add(index as i32);
    let a = (x << 13) ^ x;
    let b = a
        .wrapping_mul(a.wrapping_mul(a).wrapping_mul(15_731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589);
    f64::from(b & 0x7fff_ffff) / 2_147_483_648.0
}

/// Encodes a troop count as an L2-normalized state vector.
///
/// Component `i` is `troops / MAX * pseudo_random(seed, offset + i)` before
/// normalization. A zero vector (no troops) stays zero.
pub fn quantum_state(troops: u8, seed: u32, offset: u32) -> QuantumState {
    let normalized = f64::from(troops) / f64::from(MAX_TROOPS_PER_PLANET);
    let mut state = [0.0; QUANTUM_DIM];
    for (i, component) in state.iter_mut().enumerate() {
        *component = normalized * pseudo_random(seed, offset.wrapping_add(i as u32));
    }

    let norm = state.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for component in &mut state {
            *component /= norm;
        }
    }
    state
}

/// Magnitude of a discrete Fourier transform, scaled by `1/sqrt(N)`.
///
/// Phase is discarded, so this is a nonlinear mixing step and not invertible.
pub fn qft(state: &QuantumState) -> QuantumState {
    dft_magnitude(state, -1.0)
}

/// Inverse-direction counterpart of [`qft`] with the same magnitude shape.
/// Only used for traces.
pub fn inverse_qft(state: &QuantumState) -> QuantumState {
    dft_magnitude(state, 1.0)
}

fn dft_magnitude(state: &QuantumState, imag_sign: f64) -> QuantumState {
    let n = QUANTUM_DIM as f64;
    let mut out = [0.0; QUANTUM_DIM];
    for (k, slot) in out.iter_mut().enumerate() {
        let mut real = 0.0;
        let mut imag = 0.0;
        for (j, value) in state.iter().enumerate() {
            let angle = 2.0 * std::f64::consts::PI * (k as f64) * (j as f64) / n;
            real += value * angle.cos();
            imag += imag_sign * value * angle.sin();
        }
        *slot = (real * real + imag * imag).sqrt() / n.sqrt();
    }
    out
}

/// Elementwise `|a[i] * b[i]|`.
pub fn interference(a: &QuantumState, b: &QuantumState) -> QuantumState {
    let mut out = [0.0; QUANTUM_DIM];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = (a[i] * b[i]).abs();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_random_in_unit_interval() {
        for seed in [0u32, 1, 42, 12345, u32::MAX] {
            for index in 0..64 {
                let r = pseudo_random(seed, index);
                assert!((0.0..1.0).contains(&r), "seed {seed} index {index}: {r}");
            }
        }
    }

    #[test]
    fn pseudo_random_is_pure() {
        assert_eq!(pseudo_random(99, 3).to_bits(), pseudo_random(99, 3).to_bits());
        assert_ne!(pseudo_random(99, 3).to_bits(), pseudo_random(99, 4).to_bits());
    }

    #[test]
    fn state_is_unit_length() {
        let s = quantum_state(5, 1234, 0);
        let norm: f64 = s.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_troops_give_zero_state() {
        let s = quantum_state(0, 1234, 8);
        assert!(s.iter().all(|v| *v == 0.0));
        assert!(qft(&s).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn offsets_separate_sides() {
        let salt = Salt::default();
        let a = quantum_state(4, 777, salt.attacker);
        let d = quantum_state(4, 777, salt.defender);
        assert_ne!(a, d);
    }

    #[test]
    fn qft_preserves_energy() {
        // Parseval: magnitudes scaled by 1/sqrt(N) keep the L2 norm.
        let s = quantum_state(6, 2024, 0);
        let out = qft(&s);
        let norm: f64 = out.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_has_same_magnitudes_for_real_input() {
        let s = quantum_state(3, 55, 0);
        let f = qft(&s);
        let i = inverse_qft(&s);
        for k in 0..QUANTUM_DIM {
            assert!((f[k] - i[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn dc_component_of_constant_vector() {
        let s = [1.0; QUANTUM_DIM];
        let out = qft(&s);
        assert!((out[0] - (QUANTUM_DIM as f64).sqrt()).abs() < 1e-9);
        for v in &out[1..] {
            assert!(v.abs() < 1e-9);
        }
    }

    #[test]
    fn interference_is_nonnegative() {
        let a = qft(&quantum_state(2, 10, 0));
        let b = qft(&quantum_state(7, 10, 8));
        let i = interference(&a, &b);
        assert!(i.iter().all(|v| *v >= 0.0));
    }
}
