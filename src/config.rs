//! Engine configuration (SPEC_FULL.md §2.1/§10).
//!
//! No CLI/env parsing crate is pulled in: the core ships no binary, so a
//! host application builds `EngineConfig` itself (optionally via
//! `serde_json`) and passes it to the engine constructors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub candles: CandleConfig,
    pub market_data: MarketDataConfig,
    pub ai_loop: AiLoopConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candles: CandleConfig::default(),
            market_data: MarketDataConfig::default(),
            ai_loop: AiLoopConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleConfig {
    /// Cap on synthetic flat candles emitted to fill a gap between sparse
    /// ticks (SPEC_FULL.md §4.8 / §9).
    pub max_gap_candles: u32,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self { max_gap_candles: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Duration of the recent-ticks ring buffer used for historical
    /// bootstrap (SPEC_FULL.md §4.9).
    #[serde(with = "humantime_serde_duration")]
    pub recent_ticks_window: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            recent_ticks_window: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiLoopConfig {
    #[serde(with = "humantime_serde_duration")]
    pub tick_interval: Duration,
    #[serde(with = "humantime_serde_duration")]
    pub online_recompute_interval: Duration,
    /// Maximum shift applied to buy probability based on cash reserve
    /// pressure (SPEC_FULL.md §4.10 step 4b).
    pub max_cash_bias: f64,
}

impl Default for AiLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            online_recompute_interval: Duration::from_secs(60),
            max_cash_bias: 0.40,
        }
    }
}

/// Minimal inline duration (de)serializer, avoiding a dependency on an
/// external humantime crate for a single field shape.
mod humantime_serde_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        value.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
