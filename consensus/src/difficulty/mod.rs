//! EMA-based difficulty (acceptance threshold) retargeting.
//!
//! Θ is retargeted once per epoch as a pure function of canonical chain
//! history — the observed mean inter-block interval over the epoch just
//! closed — never of wall-clock time at evaluation time, so that replay
//! from stored headers always reproduces the same Θ sequence a live
//! node would have computed.

pub mod error;

pub use error::DifficultyError;

use crate::types::ParameterBundle;

/// Tracks the live acceptance threshold Θ and retargets it at epoch
/// boundaries from an EMA of observed inter-block intervals.
#[derive(Clone, Debug)]
pub struct DifficultyController {
    theta: u64,
    ema_interval_micros: u64,
    bundle: ParameterBundle,
}

impl DifficultyController {
    /// Creates a controller starting from the bundle's genesis Θ and an
    /// EMA seeded at the target interval (so the first epoch doesn't
    /// retarget off a cold, zero-valued EMA).
    pub fn new(bundle: ParameterBundle) -> Self {
        let theta = bundle.theta_genesis;
        let ema_interval_micros = bundle.lambda_target_secs * 1_000_000;
        Self {
            theta,
            ema_interval_micros,
            bundle,
        }
    }

    pub fn theta(&self) -> u64 {
        self.theta
    }

    /// Swaps in a newly-activated parameter bundle. Only the retargeting
    /// coefficients (`ema_alpha_*`, `lambda_target_secs`, `clamp_*`) take
    /// effect from this call; `theta` and the running EMA are left
    /// untouched so an activation never causes a discontinuous jump in
    /// either — the new bundle's coefficients just shape the next
    /// `retarget()`.
    pub fn set_bundle(&mut self, bundle: ParameterBundle) {
        self.bundle = bundle;
    }

    pub fn bundle(&self) -> &ParameterBundle {
        &self.bundle
    }

    /// Folds one observed inter-block interval (seconds) into the
    /// running EMA. Called once per accepted block.
    pub fn observe_interval(&mut self, interval_secs: u64) {
        let sample_micros = interval_secs.saturating_mul(1_000_000);
        let alpha_num = self.bundle.ema_alpha_numerator as u128;
        let alpha_den = self.bundle.ema_alpha_denominator.max(1) as u128;

        let prev = self.ema_interval_micros as u128;
        let sample = sample_micros as u128;

        // ema' = alpha*prev + (1-alpha)*sample
        let blended = (alpha_num * prev + (alpha_den - alpha_num) * sample) / alpha_den;
        self.ema_interval_micros = blended as u64;
    }

    /// Retargets Θ at an epoch boundary: `Θ' = clamp(Θ * (λ_target /
    /// λ_observed), Θ*(1-clamp_down), Θ*(1+clamp_up))`, i.e. `Θ * f`
    /// where `f` is the observed-to-target *rate* ratio expressed as an
    /// interval ratio (`target_interval / observed_interval`).
    ///
    /// A shorter-than-target observed interval (blocks arriving faster
    /// than wanted, i.e. `λ_observed > λ_target`) raises Θ, making
    /// acceptance harder and slowing block production back down; a
    /// longer-than-target interval (blocks arriving too slowly) lowers
    /// Θ, making acceptance easier. This mirrors a classic
    /// retarget-and-compare controller, generalized from one fixed
    /// per-epoch ratio to an EMA-smoothed one so a single outlier block
    /// cannot swing Θ on its own.
    pub fn retarget(&mut self) -> Result<u64, DifficultyError> {
        let target_micros = self.bundle.lambda_target_secs.saturating_mul(1_000_000) as u128;
        if target_micros == 0 {
            return Err(DifficultyError::ZeroTargetInterval);
        }

        let observed = self.ema_interval_micros.max(1) as u128;
        let theta = self.theta as u128;

        let raw_new_theta = (theta * target_micros) / observed;

        let clamp_down_num = self.bundle.clamp_down_numerator as u128;
        let clamp_down_den = self.bundle.clamp_down_denominator.max(1) as u128;
        let clamp_up_num = self.bundle.clamp_up_numerator as u128;
        let clamp_up_den = self.bundle.clamp_up_denominator.max(1) as u128;

        let floor = theta - (theta * clamp_down_num) / clamp_down_den;
        let ceiling = theta + (theta * clamp_up_num) / clamp_up_den;

        let clamped = raw_new_theta.clamp(floor, ceiling);
        self.theta = clamped as u64;
        Ok(self.theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bundle(theta_genesis: u64, target_secs: u64) -> ParameterBundle {
        ParameterBundle {
            theta_genesis,
            gamma_total_cap: 1000,
            per_type_caps: BTreeMap::new(),
            escort_q_numerator: 0,
            escort_q_denominator: 1,
            policy_table: BTreeMap::new(),
            ema_alpha_numerator: 8,
            ema_alpha_denominator: 10,
            lambda_target_secs: target_secs,
            epoch_length: 10,
            clamp_down_numerator: 20,
            clamp_down_denominator: 100,
            clamp_up_numerator: 20,
            clamp_up_denominator: 100,
            nullifier_ttl_blocks: 200,
            reorg_limit: 100,
            activation_timelock: 1000,
            fee_ema_alpha_numerator: 1,
            fee_ema_alpha_denominator: 8,
            fee_surge_utilization_bp: 8000,
            fee_surge_multiplier_bp: 20000,
            rbf_bump_pct: 10,
            da_k: 4,
            da_n: 8,
            blob_size_cap_bytes: 1 << 20,
            das_target_failure_numerator: 1,
            das_target_failure_denominator: 1_000_000,
        }
    }

    #[test]
    fn slower_than_target_interval_lowers_theta() {
        let mut ctl = DifficultyController::new(bundle(1000, 10));
        for _ in 0..20 {
            ctl.observe_interval(20); // 2x slower than target
        }
        let new_theta = ctl.retarget().unwrap();
        assert!(new_theta < 1000);
    }

    #[test]
    fn faster_than_target_interval_raises_theta() {
        let mut ctl = DifficultyController::new(bundle(1000, 10));
        for _ in 0..20 {
            ctl.observe_interval(5); // 2x faster than target
        }
        let new_theta = ctl.retarget().unwrap();
        assert!(new_theta > 1000);
    }

    #[test]
    fn retarget_never_exceeds_clamp() {
        let mut ctl = DifficultyController::new(bundle(1000, 10));
        for _ in 0..50 {
            ctl.observe_interval(1); // wildly faster
        }
        let new_theta = ctl.retarget().unwrap();
        assert!(new_theta <= 1200); // clamp_up = 20%
    }

    #[test]
    fn retarget_never_goes_below_clamp() {
        let mut ctl = DifficultyController::new(bundle(1000, 10));
        for _ in 0..50 {
            ctl.observe_interval(1000); // wildly slower
        }
        let new_theta = ctl.retarget().unwrap();
        assert!(new_theta >= 800); // clamp_down = 20%
    }

    #[test]
    fn clamp_up_matches_scenario_six() {
        // Scenario 6: observed interval drops to 10% of target for one
        // epoch with clamp_up=+15% -> next theta = prior * 1.15 exactly
        // (the raw ratio of 10x would otherwise overshoot it).
        let mut b = bundle(1000, 10);
        b.clamp_up_numerator = 15;
        b.clamp_up_denominator = 100;
        let mut ctl = DifficultyController::new(b);
        for _ in 0..50 {
            ctl.observe_interval(1); // 10% of the 10s target
        }
        let new_theta = ctl.retarget().unwrap();
        assert_eq!(new_theta, 1150);
    }

    #[test]
    fn steady_target_interval_leaves_theta_unchanged() {
        let mut ctl = DifficultyController::new(bundle(1000, 10));
        for _ in 0..20 {
            ctl.observe_interval(10);
        }
        let new_theta = ctl.retarget().unwrap();
        assert_eq!(new_theta, 1000);
    }
}
