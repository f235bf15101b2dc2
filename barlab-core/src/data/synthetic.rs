//! Synthetic bar generation — seeded random walk.
//!
//! Produces realistic-looking series for demos and benchmarks: daily
//! log-ish returns with configurable drift and volatility, deterministic
//! per seed.

use crate::domain::Bar;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random-walk parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub start_price: f64,
    /// Per-bar drift (e.g. 0.0008 for roughly 20% annual on daily bars).
    pub drift: f64,
    /// Per-bar volatility (e.g. 0.012 for roughly 19% annual on daily bars).
    pub volatility: f64,
    pub seed: u64,
    pub start_date: NaiveDate,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 252,
            start_price: 100.0,
            drift: 0.0005,
            volatility: 0.012,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
        }
    }
}

/// Generate a bar series from the config.
pub fn generate(config: &SyntheticConfig) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut close = config.start_price;
    let mut bars = Vec::with_capacity(config.bars);

    for i in 0..config.bars {
        let open = close;
        let ret = config.drift + config.volatility * approx_normal(&mut rng);
        close = (open * (1.0 + ret)).max(0.01);

        let wick = config.volatility * open * rng.gen_range(0.2..1.0);
        let high = open.max(close) + wick;
        let low = (open.min(close) - wick).max(0.01);
        let volume = rng.gen_range(500_000.0..1_500_000.0_f64).round();

        bars.push(Bar::daily(
            i as u64,
            config.start_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        ));
    }
    bars
}

/// Approximately standard-normal via Irwin–Hall (sum of 12 uniforms).
fn approx_normal(rng: &mut StdRng) -> f64 {
    (0..12).map(|_| rng.gen_range(0.0..1.0)).sum::<f64>() - 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_count() {
        let bars = generate(&SyntheticConfig {
            bars: 30,
            ..Default::default()
        });
        assert_eq!(bars.len(), 30);
    }

    #[test]
    fn bars_are_sane_and_indexed() {
        let bars = generate(&SyntheticConfig::default());
        for (i, bar) in bars.iter().enumerate() {
            assert_eq!(bar.index, i as u64);
            assert!(bar.is_sane(), "bar {i} failed sanity");
        }
    }

    #[test]
    fn same_seed_same_series() {
        let a = generate(&SyntheticConfig::default());
        let b = generate(&SyntheticConfig::default());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.close, y.close);
        }
    }

    #[test]
    fn different_seed_different_series() {
        let a = generate(&SyntheticConfig::default());
        let b = generate(&SyntheticConfig {
            seed: 43,
            ..Default::default()
        });
        assert!(a.iter().zip(&b).any(|(x, y)| x.close != y.close));
    }

    #[test]
    fn consecutive_bars_open_at_prior_close() {
        let bars = generate(&SyntheticConfig {
            bars: 10,
            ..Default::default()
        });
        for pair in bars.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }
}
