//! Delay Scheduler - politeness delays for a batch of fetch tasks
//!
//! Produces one wait (seconds) per task. The first task never waits; later
//! tasks follow a CONSTANT, LINEAR or SIGMOID curve capped at `max_duration`,
//! optionally floored at `min_duration` and randomized around the curve.

use crate::domain::{DelayAlgorithm, DelayPolicy, DomainError};
use rand::Rng;
use std::time::Duration;

/// Number of leading tasks that get the constant-curve ramp-up
const CONSTANT_RAMP_LEN: usize = 8;

/// Ramp step for the constant curve (and slope of the linear curve)
const RAMP_INCREMENT: f64 = 0.2;

/// Below this maximum the constant ramp is scaled down to stay positive
const SMALL_DELAY_THRESHOLD: f64 = 1.5;

/// Compute `n` delays (seconds) for `policy`.
///
/// Fails fast on an invalid policy, before any request is made.
pub fn compute_delays(n: usize, policy: &DelayPolicy) -> Result<Vec<f64>, DomainError> {
    compute_delays_with_rng(n, policy, &mut rand::thread_rng())
}

/// Same as [`compute_delays`] with an explicit random source
pub fn compute_delays_with_rng<R: Rng + ?Sized>(
    n: usize,
    policy: &DelayPolicy,
    rng: &mut R,
) -> Result<Vec<f64>, DomainError> {
    policy.validate()?;
    if n == 0 {
        return Ok(Vec::new());
    }

    let max = policy.max_duration;
    let min = policy.min_duration;

    let mut delays = match policy.algorithm {
        DelayAlgorithm::Constant => constant_curve(n, max),
        DelayAlgorithm::Linear => linear_curve(n, max),
        DelayAlgorithm::Sigmoid => sigmoid_curve(n, max),
    };

    for delay in delays.iter_mut() {
        *delay = delay.max(0.0);
        if min > 0.0 && *delay < min {
            *delay = min;
        }
        if policy.random {
            *delay = if policy.converge {
                rng.gen_range(*delay..=max)
            } else {
                rng.gen_range(min..=*delay)
            };
        }
        *delay = (*delay * 1000.0).round() / 1000.0;
    }

    delays[0] = 0.0;
    Ok(delays)
}

/// Convert a computed delay to a sleep duration
pub fn as_duration(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds.max(0.0))
}

fn constant_curve(n: usize, max: f64) -> Vec<f64> {
    let mut delays = vec![max; n];
    let ramp = n.min(CONSTANT_RAMP_LEN);
    let increment = if max < SMALL_DELAY_THRESHOLD {
        max / CONSTANT_RAMP_LEN as f64
    } else {
        RAMP_INCREMENT
    };
    for (i, delay) in delays.iter_mut().take(ramp).enumerate() {
        *delay = max - (ramp - i) as f64 * increment;
    }
    delays
}

fn linear_curve(n: usize, max: f64) -> Vec<f64> {
    // y = 0.2x meets y = max at x = 5 * max
    let intersection = max / RAMP_INCREMENT;
    if intersection <= 1.0 {
        return constant_curve(n, max);
    }
    let cutoff = intersection.ceil() as usize;
    (0..n)
        .map(|i| {
            if i < cutoff {
                RAMP_INCREMENT * i as f64
            } else {
                max
            }
        })
        .collect()
}

fn sigmoid_curve(n: usize, max: f64) -> Vec<f64> {
    let growth = 4.0 * max.sqrt();
    let offset = (4.0 * max).ln();
    (0..n)
        .map(|i| max / (1.0 + (offset - i as f64 / growth).exp()))
        .collect()
}
