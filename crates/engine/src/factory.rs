//! Strategy factory
//!
//! Builds strategy instances bound to the shared wallet registry and batch
//! executor, applies variant default option sets before caller overrides,
//! and keeps an append-only catalogue of everything it created.

use crate::strategies::{
    AntiSniperStrategy, BundleLaunchStrategy, LaunchStrategy, StaggeredLaunchStrategy,
    StrategyKind,
};
use fourmeme_chain::{BatchExecutor, EvmRpc, WalletRegistry};
use fourmeme_core::{
    AntiSniperOptions, BundleOptions, LauncherConfig, Result, StaggeredOptions, StrategyOptions,
    StrategyOverrides,
};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct StrategyFactory {
    registry: Arc<WalletRegistry>,
    executor: Arc<BatchExecutor>,
    rpc: Arc<dyn EvmRpc>,
    config: Arc<LauncherConfig>,
    /// Append-only catalogue of created instances, keyed by generated id
    created: Mutex<Vec<(String, Arc<dyn LaunchStrategy>)>>,
}

impl StrategyFactory {
    pub fn new(
        registry: Arc<WalletRegistry>,
        executor: Arc<BatchExecutor>,
        rpc: Arc<dyn EvmRpc>,
        config: Arc<LauncherConfig>,
    ) -> Self {
        Self {
            registry,
            executor,
            rpc,
            config,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Build a strategy of the requested kind.
    ///
    /// With overrides, the variant's default option set is merged with the
    /// caller's values (overrides win) and the strategy is initialized;
    /// without, the instance stays idle on its built-in defaults.
    pub fn create_strategy(
        &self,
        kind: StrategyKind,
        overrides: Option<&StrategyOverrides>,
    ) -> Result<Arc<dyn LaunchStrategy>> {
        let strategy: Arc<dyn LaunchStrategy> = match kind {
            StrategyKind::Bundle => {
                let strategy = Arc::new(BundleLaunchStrategy::new(
                    self.registry.clone(),
                    self.executor.clone(),
                    self.config.clone(),
                ));
                if let Some(overrides) = overrides {
                    let mut options = BundleOptions::default();
                    overrides.apply_to_bundle(&mut options);
                    strategy.initialize(StrategyOptions::Bundle(options))?;
                }
                strategy
            }
            StrategyKind::Staggered => {
                let strategy = Arc::new(StaggeredLaunchStrategy::new(
                    self.registry.clone(),
                    self.executor.clone(),
                    self.config.clone(),
                ));
                if let Some(overrides) = overrides {
                    let mut options = StaggeredOptions::default();
                    overrides.apply_to_staggered(&mut options);
                    strategy.initialize(StrategyOptions::Staggered(options))?;
                }
                strategy
            }
            StrategyKind::AntiSniper => {
                let strategy = Arc::new(AntiSniperStrategy::new(
                    self.registry.clone(),
                    self.executor.clone(),
                    self.rpc.clone(),
                    self.config.clone(),
                ));
                if let Some(overrides) = overrides {
                    let mut options = AntiSniperOptions::default();
                    overrides.apply_to_anti_sniper(&mut options);
                    strategy.initialize(StrategyOptions::AntiSniper(options))?;
                }
                strategy
            }
        };

        let id = format!("{kind}-{}", chrono::Utc::now().timestamp_millis());
        debug!(%id, "strategy created");
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, strategy.clone()));

        Ok(strategy)
    }

    pub fn create_bundle_strategy(
        &self,
        overrides: Option<&StrategyOverrides>,
    ) -> Result<Arc<dyn LaunchStrategy>> {
        self.create_strategy(StrategyKind::Bundle, overrides)
    }

    pub fn create_staggered_strategy(
        &self,
        overrides: Option<&StrategyOverrides>,
    ) -> Result<Arc<dyn LaunchStrategy>> {
        self.create_strategy(StrategyKind::Staggered, overrides)
    }

    pub fn create_anti_sniper_strategy(
        &self,
        overrides: Option<&StrategyOverrides>,
    ) -> Result<Arc<dyn LaunchStrategy>> {
        self.create_strategy(StrategyKind::AntiSniper, overrides)
    }

    /// Look up a previously created strategy by id
    pub fn strategy(&self, id: &str) -> Option<Arc<dyn LaunchStrategy>> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, strategy)| strategy.clone())
    }

    /// Ids of every strategy created so far, in creation order
    pub fn strategy_ids(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::harness;
    use fourmeme_core::StrategyStage;

    async fn factory() -> StrategyFactory {
        let h = harness(2).await;
        StrategyFactory::new(h.registry, h.executor, h.rpc, h.config)
    }

    #[tokio::test]
    async fn creates_each_variant_and_catalogues_it() {
        let factory = factory().await;

        for kind in [
            StrategyKind::Bundle,
            StrategyKind::Staggered,
            StrategyKind::AntiSniper,
        ] {
            let strategy = factory.create_strategy(kind, None).unwrap();
            assert_eq!(strategy.kind(), kind);
            // No overrides: the instance stays idle on built-in defaults
            assert_eq!(strategy.status().stage, StrategyStage::Idle);
        }

        let ids = factory.strategy_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids[0].starts_with("bundle-"));
        assert!(ids[2].starts_with("anti-sniper-"));
        assert!(factory.strategy(&ids[1]).is_some());
        assert!(factory.strategy("nonsense").is_none());
    }

    #[tokio::test]
    async fn overrides_initialize_the_instance() {
        let factory = factory().await;
        let overrides = StrategyOverrides {
            gas_multiplier: Some(2.5),
            delay_between_transactions_ms: Some(42),
            ..Default::default()
        };

        let strategy = factory
            .create_staggered_strategy(Some(&overrides))
            .unwrap();
        let status = strategy.status();
        assert_eq!(status.stage, StrategyStage::Initialized);
        assert_eq!(status.progress, 10);
    }

    #[tokio::test]
    async fn typed_constructors_match_their_kind() {
        let factory = factory().await;
        assert_eq!(
            factory.create_bundle_strategy(None).unwrap().kind(),
            StrategyKind::Bundle
        );
        assert_eq!(
            factory.create_anti_sniper_strategy(None).unwrap().kind(),
            StrategyKind::AntiSniper
        );
    }
}
