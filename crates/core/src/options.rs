//! Execution and strategy option types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ─── Execution options ───────────────────────────────────────────────

/// Gas pricing priority for a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Factor applied to the network gas price
    pub fn gas_price_factor(&self) -> f64 {
        match self {
            Priority::High => 1.5,
            Priority::Medium => 1.0,
            Priority::Low => 0.8,
        }
    }
}

/// Per-dispatch execution options.
///
/// A value object merged with per-strategy defaults at call time; the
/// caller's copy is never shared or mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionOptions {
    /// Multiplier applied to gas estimates
    pub gas_multiplier: f64,
    /// Retry attempts for a failed dispatch (0 = no retry)
    pub max_retries: u32,
    /// Confirmation depth to wait for
    pub confirmations: u64,
    pub priority: Priority,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            gas_multiplier: 1.2,
            max_retries: 3,
            confirmations: 1,
            priority: Priority::Medium,
        }
    }
}

// ─── Strategy status ─────────────────────────────────────────────────

/// Stage of a strategy's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStage {
    #[default]
    Idle,
    Initialized,
    Executing,
    Completed,
    Failed,
}

impl fmt::Display for StrategyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyStage::Idle => "idle",
            StrategyStage::Initialized => "initialized",
            StrategyStage::Executing => "executing",
            StrategyStage::Completed => "completed",
            StrategyStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Live snapshot of a strategy's progress.
///
/// One live status per strategy instance, overwritten on every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStatus {
    pub stage: StrategyStage,
    /// 0-100
    pub progress: u8,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StrategyStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn initialized(message: impl Into<String>) -> Self {
        Self {
            stage: StrategyStage::Initialized,
            progress: 10,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn executing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage: StrategyStage::Executing,
            progress,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            stage: StrategyStage::Completed,
            progress: 100,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage: StrategyStage::Failed,
            progress: 0,
            message: Some(message.into()),
            error: Some(error.into()),
        }
    }
}

// ─── Strategy options ────────────────────────────────────────────────

/// Anti-sniper countermeasure applied when the trigger threshold is hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Countermeasure {
    /// Proceed unchanged
    None,
    /// Wait before sending purchases
    Delay,
    /// Fail the launch outright; no purchases sent
    Abort,
    /// Liquidate into sniper demand (placeholder, not implemented)
    Dump,
}

impl fmt::Display for Countermeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Countermeasure::None => "none",
            Countermeasure::Delay => "delay",
            Countermeasure::Abort => "abort",
            Countermeasure::Dump => "dump",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Countermeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Countermeasure::None),
            "delay" => Ok(Countermeasure::Delay),
            "abort" => Ok(Countermeasure::Abort),
            "dump" => Ok(Countermeasure::Dump),
            other => Err(format!("unknown countermeasure: {other}")),
        }
    }
}

/// Options common to every strategy variant
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStrategyOptions {
    pub name: String,
    pub description: String,
    pub gas_multiplier: f64,
    pub max_retries: u32,
    pub confirmations: u64,
}

/// Bundle launch options
#[derive(Debug, Clone, PartialEq)]
pub struct BundleOptions {
    pub base: BaseStrategyOptions,
    /// Issue every purchase in one parallel batch
    pub execute_all_at_once: bool,
    pub max_concurrent_transactions: usize,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            base: BaseStrategyOptions {
                name: "Bundle Launch".into(),
                description: "Creates token and executes all buys in rapid succession".into(),
                // Competitive environment, pay up for inclusion
                gas_multiplier: 1.5,
                max_retries: 2,
                confirmations: 1,
            },
            execute_all_at_once: true,
            max_concurrent_transactions: 10,
        }
    }
}

/// Staggered launch options
#[derive(Debug, Clone, PartialEq)]
pub struct StaggeredOptions {
    pub base: BaseStrategyOptions,
    /// Sleep between consecutive purchase dispatches
    pub delay_between_transactions: Duration,
    /// Wait for each purchase to confirm before dispatching the next
    pub wait_for_confirmation: bool,
}

impl Default for StaggeredOptions {
    fn default() -> Self {
        Self {
            base: BaseStrategyOptions {
                name: "Staggered Launch".into(),
                description:
                    "Creates token with immediate dev wallet buy, followed by timed purchases"
                        .into(),
                gas_multiplier: 1.3,
                max_retries: 3,
                confirmations: 1,
            },
            delay_between_transactions: Duration::from_millis(1000),
            wait_for_confirmation: true,
        }
    }
}

/// Anti-sniper launch options
#[derive(Debug, Clone, PartialEq)]
pub struct AntiSniperOptions {
    pub base: BaseStrategyOptions,
    /// How long to watch for external buys after creation
    pub monitor_duration: Duration,
    /// Interval between Transfer-log polls while monitoring
    pub poll_interval: Duration,
    /// Distinct external buyers needed to trigger the countermeasure
    pub trigger_threshold: usize,
    pub countermeasure: Countermeasure,
    /// Pause applied by the `delay` countermeasure
    pub countermeasure_delay: Duration,
}

impl Default for AntiSniperOptions {
    fn default() -> Self {
        Self {
            base: BaseStrategyOptions {
                name: "Anti-Sniper".into(),
                description: "Monitors for sniper activity and implements countermeasures".into(),
                gas_multiplier: 1.4,
                max_retries: 3,
                confirmations: 1,
            },
            monitor_duration: Duration::from_millis(10_000),
            poll_interval: Duration::from_millis(2_000),
            trigger_threshold: 2,
            countermeasure: Countermeasure::Delay,
            countermeasure_delay: Duration::from_millis(5_000),
        }
    }
}

/// Variant-tagged strategy options accepted by `initialize`
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOptions {
    Bundle(BundleOptions),
    Staggered(StaggeredOptions),
    AntiSniper(AntiSniperOptions),
}

impl StrategyOptions {
    /// Variant name, matching the strategy type tags
    pub fn kind_name(&self) -> &'static str {
        match self {
            StrategyOptions::Bundle(_) => "bundle",
            StrategyOptions::Staggered(_) => "staggered",
            StrategyOptions::AntiSniper(_) => "anti-sniper",
        }
    }
}

// ─── Caller overrides ────────────────────────────────────────────────

/// Partial option bag supplied by the caller (CLI flags or config file).
///
/// Unset fields keep the variant's defaults; set fields win. Fields that
/// do not apply to the selected variant are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyOverrides {
    pub gas_multiplier: Option<f64>,
    pub max_retries: Option<u32>,
    pub confirmations: Option<u64>,

    // Bundle
    pub execute_all_at_once: Option<bool>,
    pub max_concurrent_transactions: Option<usize>,

    // Staggered
    pub delay_between_transactions_ms: Option<u64>,
    pub wait_for_confirmation: Option<bool>,

    // Anti-sniper
    pub monitor_duration_ms: Option<u64>,
    pub trigger_threshold: Option<usize>,
    pub countermeasure: Option<Countermeasure>,
}

impl StrategyOverrides {
    fn apply_base(&self, base: &mut BaseStrategyOptions) {
        if let Some(m) = self.gas_multiplier {
            base.gas_multiplier = m;
        }
        if let Some(r) = self.max_retries {
            base.max_retries = r;
        }
        if let Some(c) = self.confirmations {
            base.confirmations = c;
        }
    }

    pub fn apply_to_bundle(&self, options: &mut BundleOptions) {
        self.apply_base(&mut options.base);
        if let Some(v) = self.execute_all_at_once {
            options.execute_all_at_once = v;
        }
        if let Some(v) = self.max_concurrent_transactions {
            options.max_concurrent_transactions = v;
        }
    }

    pub fn apply_to_staggered(&self, options: &mut StaggeredOptions) {
        self.apply_base(&mut options.base);
        if let Some(ms) = self.delay_between_transactions_ms {
            options.delay_between_transactions = Duration::from_millis(ms);
        }
        if let Some(v) = self.wait_for_confirmation {
            options.wait_for_confirmation = v;
        }
    }

    pub fn apply_to_anti_sniper(&self, options: &mut AntiSniperOptions) {
        self.apply_base(&mut options.base);
        if let Some(ms) = self.monitor_duration_ms {
            options.monitor_duration = Duration::from_millis(ms);
        }
        if let Some(t) = self.trigger_threshold {
            options.trigger_threshold = t;
        }
        if let Some(c) = self.countermeasure {
            options.countermeasure = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_factors() {
        assert_eq!(Priority::High.gas_price_factor(), 1.5);
        assert_eq!(Priority::Medium.gas_price_factor(), 1.0);
        assert_eq!(Priority::Low.gas_price_factor(), 0.8);
    }

    #[test]
    fn execution_defaults() {
        let opts = ExecutionOptions::default();
        assert_eq!(opts.gas_multiplier, 1.2);
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.confirmations, 1);
        assert_eq!(opts.priority, Priority::Medium);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let overrides = StrategyOverrides {
            gas_multiplier: Some(2.0),
            delay_between_transactions_ms: Some(250),
            ..Default::default()
        };

        let mut staggered = StaggeredOptions::default();
        overrides.apply_to_staggered(&mut staggered);
        assert_eq!(staggered.base.gas_multiplier, 2.0);
        assert_eq!(
            staggered.delay_between_transactions,
            Duration::from_millis(250)
        );
        // Unset fields keep their defaults
        assert!(staggered.wait_for_confirmation);
        assert_eq!(staggered.base.max_retries, 3);
    }

    #[test]
    fn irrelevant_overrides_are_ignored() {
        let overrides = StrategyOverrides {
            monitor_duration_ms: Some(1),
            ..Default::default()
        };
        let mut bundle = BundleOptions::default();
        let before = bundle.clone();
        overrides.apply_to_bundle(&mut bundle);
        assert_eq!(bundle, before);
    }

    #[test]
    fn countermeasure_parsing() {
        assert_eq!("abort".parse::<Countermeasure>(), Ok(Countermeasure::Abort));
        assert!("yolo".parse::<Countermeasure>().is_err());
    }
}
