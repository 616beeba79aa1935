//! Light-client data-availability sampling.
//!
//! A light client that samples `m` random erasure-coded shares and
//! finds all of them present gains confidence that at least `k` of the
//! `n` shares are available (and so the original blob is
//! reconstructible), without downloading the whole blob. The required
//! sample count for a target failure probability follows directly from
//! the erasure profile:
//!
//! `m = ceil(log_{n/(n-k+1)}(1 / p_fail))`
//!
//! This is a light client's own sampling-depth choice, not a
//! consensus-critical quantity validators re-derive bit-for-bit, so it
//! is the one place in the DA subsystem that uses ordinary floating
//! point.

use rand::seq::SliceRandom;
use rand::Rng;

use super::error::DaError;
use super::nmt::{self, LeafProof, NmtNode, NmtTree};

/// Computes the minimum number of samples needed to reach `p_fail =
/// target_failure_numerator / target_failure_denominator` confidence
/// of detecting unavailability, for an `(k, n)` erasure profile.
pub fn required_sample_count(
    k: u32,
    n: u32,
    target_failure_numerator: u64,
    target_failure_denominator: u64,
) -> usize {
    if k == 0 || n == 0 || k > n {
        return 0;
    }
    if k == n {
        // No redundancy: any single missing share makes the blob
        // unreconstructible, so a single sample already tells the
        // whole story at any confidence level.
        return 1;
    }

    let ratio = n as f64 / (n - k + 1) as f64;
    let p_fail = target_failure_numerator as f64 / target_failure_denominator.max(1) as f64;
    if p_fail <= 0.0 || p_fail >= 1.0 || ratio <= 1.0 {
        return n as usize;
    }

    let samples = (-p_fail.ln() / ratio.ln()).ceil();
    if samples.is_finite() && samples > 0.0 {
        (samples as usize).min(n as usize)
    } else {
        n as usize
    }
}

/// A single sample result: the queried index and its inclusion proof.
pub struct Sample {
    pub index: usize,
    pub proof: LeafProof,
}

/// Drives light-client sampling against a committed NMT root.
pub struct LightClientSampler {
    k: u32,
    n: u32,
    target_failure_numerator: u64,
    target_failure_denominator: u64,
}

impl LightClientSampler {
    pub fn new(k: u32, n: u32, target_failure_numerator: u64, target_failure_denominator: u64) -> Self {
        Self {
            k,
            n,
            target_failure_numerator,
            target_failure_denominator,
        }
    }

    pub fn sample_count(&self) -> usize {
        required_sample_count(
            self.k,
            self.n,
            self.target_failure_numerator,
            self.target_failure_denominator,
        )
    }

    /// Picks `sample_count()` distinct indices (without replacement,
    /// bounded by `padded_leaf_count`) and produces an inclusion proof
    /// for each, as a prover/full-node would in response to a light
    /// client's sampling request.
    pub fn draw_samples(&self, tree: &NmtTree, rng: &mut impl Rng) -> Vec<Sample> {
        let total = tree.padded_leaf_count();
        let count = self.sample_count().min(total);
        let mut indices: Vec<usize> = (0..total).collect();
        indices.shuffle(rng);
        indices
            .into_iter()
            .take(count)
            .map(|index| Sample {
                index,
                proof: tree
                    .prove_leaf(index)
                    .expect("index drawn from tree's own padded range"),
            })
            .collect()
    }

    /// Verifies every drawn sample against the committed root. A light
    /// client accepts availability only if every sample verifies; a
    /// single failure means the corresponding share was withheld.
    pub fn verify_samples(
        &self,
        root: &NmtNode,
        padded_leaf_count: usize,
        samples: &[Sample],
    ) -> Result<(), DaError> {
        for sample in samples {
            if sample.proof.start_index != sample.index {
                return Err(DaError::SampleFailed {
                    index: sample.index,
                });
            }
            if !nmt::verify_leaf_proof(root, padded_leaf_count, &sample.proof) {
                return Err(DaError::SampleFailed {
                    index: sample.index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::da::nmt::{NmtLeaf, NmtTree};
    use crate::types::Hash256;
    use rand::SeedableRng;

    #[test]
    fn sample_count_grows_with_stricter_failure_target() {
        let loose = required_sample_count(4, 8, 1, 100);
        let strict = required_sample_count(4, 8, 1, 1_000_000);
        assert!(strict >= loose);
    }

    #[test]
    fn sample_count_is_one_with_no_redundancy() {
        assert_eq!(required_sample_count(8, 8, 1, 1_000_000), 1);
    }

    #[test]
    fn valid_samples_verify_against_root() {
        let leaves: Vec<NmtLeaf> = (0..16)
            .map(|i| NmtLeaf {
                namespace: 1,
                data_hash: Hash256::compute(&[i as u8]),
            })
            .collect();
        let tree = NmtTree::build(leaves);
        let root = tree.root();
        let padded = tree.padded_leaf_count();

        let sampler = LightClientSampler::new(4, 8, 1, 1_000_000);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let samples = sampler.draw_samples(&tree, &mut rng);

        assert!(!samples.is_empty());
        assert!(sampler.verify_samples(&root, padded, &samples).is_ok());
    }

    #[test]
    fn tampered_sample_proof_fails_verification() {
        let leaves: Vec<NmtLeaf> = (0..16)
            .map(|i| NmtLeaf {
                namespace: 1,
                data_hash: Hash256::compute(&[i as u8]),
            })
            .collect();
        let tree = NmtTree::build(leaves);
        let padded = tree.padded_leaf_count();

        let sampler = LightClientSampler::new(4, 8, 1, 1_000_000);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut samples = sampler.draw_samples(&tree, &mut rng);
        samples[0].proof.leaves[0].data_hash = Hash256::compute(b"tampered");

        let other_root = tree.root();
        let result = sampler.verify_samples(&other_root, padded, &samples);
        assert!(result.is_err());
    }
}
