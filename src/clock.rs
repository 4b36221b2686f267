use crate::config::RunParams;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::LogNormal;

/// Source of wall-clock frame deltas for a headless run.
///
/// Stands in for an animation loop: deltas scatter around the nominal frame
/// time, a stalled frame is capped at the maximum frame time, and the run
/// ends exactly at the configured duration.
pub struct FrameClock {
    frame_secs: f64,
    max_frame_secs: f64,
    duration_secs: f64,
    remaining_secs: f64,
    jitter: Option<(LogNormal<f64>, ChaCha12Rng)>,
}

impl FrameClock {
    pub fn new(params: &RunParams) -> Result<Self> {
        let jitter = if params.frame_jitter > 0.0 {
            let rng = match params.seed {
                Some(seed) => ChaCha12Rng::seed_from_u64(seed),
                None => ChaCha12Rng::try_from_os_rng()?,
            };
            // Unit mean in linear space.
            let sigma = params.frame_jitter;
            let dist = LogNormal::new(-0.5 * sigma * sigma, sigma)
                .context("failed to construct jitter distribution")?;
            Some((dist, rng))
        } else {
            None
        };

        Ok(Self {
            frame_secs: params.frame_secs,
            max_frame_secs: params.max_frame_secs,
            duration_secs: params.duration_secs,
            remaining_secs: params.duration_secs,
            jitter,
        })
    }

    /// Real seconds handed out so far. Equals the duration once the clock is drained.
    pub fn elapsed_secs(&self) -> f64 {
        self.duration_secs - self.remaining_secs
    }
}

impl Iterator for FrameClock {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.remaining_secs <= 0.0 {
            return None;
        }

        let mut delta = self.frame_secs;
        if let Some((dist, rng)) = &mut self.jitter {
            delta *= dist.sample(rng);
        }
        delta = delta.min(self.max_frame_secs).min(self.remaining_secs);

        self.remaining_secs -= delta;
        Some(delta)
    }
}
