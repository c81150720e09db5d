//! Bundle launch - create the token, then fire every purchase as one
//! parallel batch at high priority. Any purchase failure fails the launch.

use super::{
    purchase_targets, submit_token_creation, LaunchStrategy, StatusCell, StrategyKind,
};
use alloy::primitives::Address;
use async_trait::async_trait;
use fourmeme_chain::{BatchExecutor, WalletRegistry};
use fourmeme_core::{
    BundleOptions, Error, ExecutionOptions, LaunchContext, LauncherConfig, Priority, Result,
    StrategyOptions, StrategyStatus,
};
use std::sync::{Arc, RwLock};

pub struct BundleLaunchStrategy {
    registry: Arc<WalletRegistry>,
    executor: Arc<BatchExecutor>,
    config: Arc<LauncherConfig>,
    options: RwLock<BundleOptions>,
    status: StatusCell,
}

impl BundleLaunchStrategy {
    pub fn new(
        registry: Arc<WalletRegistry>,
        executor: Arc<BatchExecutor>,
        config: Arc<LauncherConfig>,
    ) -> Self {
        Self {
            registry,
            executor,
            config,
            options: RwLock::new(BundleOptions::default()),
            status: StatusCell::default(),
        }
    }

    fn options_snapshot(&self) -> BundleOptions {
        self.options.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn run(&self, context: &LaunchContext) -> Result<Address> {
        let options = self.options_snapshot();
        let execution = ExecutionOptions {
            gas_multiplier: options.base.gas_multiplier,
            max_retries: options.base.max_retries,
            confirmations: options.base.confirmations,
            priority: Priority::High,
        };

        let creator = self
            .registry
            .primary_address()
            .ok_or_else(|| Error::InvalidData("no wallets available for token creation".into()))?;

        self.status
            .set(StrategyStatus::executing(30, "Creating token contract..."));
        let creation =
            submit_token_creation(&self.executor, &self.config, context, creator, &execution)
                .await?;
        let token_address = creation.token_address;

        self.status.set(StrategyStatus::executing(
            50,
            format!("Token created at {token_address}. Preparing purchases..."),
        ));

        let (addresses, intents) =
            purchase_targets(&self.registry, token_address, context.buy.as_ref(), None);
        if addresses.is_empty() {
            self.status.set(StrategyStatus::completed(format!(
                "Token created successfully at {token_address}, but no wallets available for purchasing"
            )));
            return Ok(token_address);
        }

        self.status.set(StrategyStatus::executing(
            70,
            format!("Executing {} purchases...", addresses.len()),
        ));

        if options.execute_all_at_once {
            self.executor
                .execute_parallel(&addresses, &intents, &execution)
                .await?;
        } else {
            // Cap in-flight submissions by batching in chunks
            let chunk = options.max_concurrent_transactions.max(1);
            for (chunk_addresses, chunk_intents) in
                addresses.chunks(chunk).zip(intents.chunks(chunk))
            {
                self.executor
                    .execute_parallel(chunk_addresses, chunk_intents, &execution)
                    .await?;
            }
        }

        self.status.set(StrategyStatus::completed(format!(
            "Bundle launch completed. Token address: {token_address}"
        )));
        Ok(token_address)
    }
}

#[async_trait]
impl LaunchStrategy for BundleLaunchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bundle
    }

    fn name(&self) -> String {
        self.options_snapshot().base.name
    }

    fn description(&self) -> String {
        self.options_snapshot().base.description
    }

    fn initialize(&self, options: StrategyOptions) -> Result<()> {
        match options {
            StrategyOptions::Bundle(options) => {
                *self.options.write().unwrap_or_else(|e| e.into_inner()) = options;
                self.status.set(StrategyStatus::initialized(
                    "Strategy initialized with bundle launch options",
                ));
                Ok(())
            }
            other => Err(Error::UnsupportedStrategy(format!(
                "bundle strategy cannot take {} options",
                other.kind_name()
            ))),
        }
    }

    async fn execute(&self, context: &LaunchContext) -> Result<Address> {
        self.status
            .set(StrategyStatus::executing(20, "Preparing for bundle launch..."));

        match self.run(context).await {
            Ok(address) => Ok(address),
            Err(err) => {
                self.status
                    .set(StrategyStatus::failed("Bundle launch failed", err.to_string()));
                Err(err)
            }
        }
    }

    fn status(&self) -> StrategyStatus {
        self.status.get()
    }

    fn cleanup(&self) {
        // No strategy-local tracking state to release
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, harness};
    use super::*;
    use fourmeme_core::{StaggeredOptions, StrategyStage};

    #[tokio::test]
    async fn bare_execute_completes_with_defaults() {
        let h = harness(3).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);

        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());
        assert_eq!(strategy.status().stage, StrategyStage::Idle);

        let address = strategy.execute(&context("0.1")).await.unwrap();

        assert_eq!(address, token);
        let status = strategy.status();
        assert_eq!(status.stage, StrategyStage::Completed);
        assert_eq!(status.progress, 100);
        // One creation plus three purchases
        assert_eq!(h.rpc.submission_count(), 4);
    }

    #[tokio::test]
    async fn initialize_then_execute_completes() {
        let h = harness(2).await;
        h.rpc.set_pending_contract_address(Address::repeat_byte(0x70));

        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());
        strategy
            .initialize(StrategyOptions::Bundle(BundleOptions::default()))
            .unwrap();
        assert_eq!(strategy.status().stage, StrategyStage::Initialized);
        assert_eq!(strategy.status().progress, 10);

        strategy.execute(&context("0.1")).await.unwrap();
        assert_eq!(strategy.status().stage, StrategyStage::Completed);
    }

    #[tokio::test]
    async fn initialize_rejects_other_variants() {
        let h = harness(1).await;
        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());

        let err = strategy
            .initialize(StrategyOptions::Staggered(StaggeredOptions::default()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedStrategy(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn any_purchase_failure_fails_the_launch() {
        let h = harness(3).await;
        h.rpc.set_pending_contract_address(Address::repeat_byte(0x70));
        // Creation is attempt 0; fail one of the purchases with no retries
        h.rpc.fail_attempt(2);

        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());
        let mut options = BundleOptions::default();
        options.base.max_retries = 0;
        strategy.initialize(StrategyOptions::Bundle(options)).unwrap();

        let err = strategy.execute(&context("0.1")).await.unwrap_err();
        assert!(matches!(err, Error::Submission(_)));

        let status = strategy.status();
        assert_eq!(status.stage, StrategyStage::Failed);
        assert_eq!(status.progress, 0);
        assert!(status.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn creation_revert_fails_before_any_purchase() {
        let h = harness(3).await;
        h.rpc.revert_next_submission();

        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());
        let mut options = BundleOptions::default();
        options.base.max_retries = 0;
        strategy.initialize(StrategyOptions::Bundle(options)).unwrap();

        let err = strategy.execute(&context("0.1")).await.unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        assert_eq!(h.rpc.submission_count(), 1);
        assert_eq!(strategy.status().stage, StrategyStage::Failed);
    }

    #[tokio::test]
    async fn no_buy_config_still_creates_the_token() {
        let h = harness(2).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);

        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());
        let mut ctx = context("0.1");
        ctx.buy = None;

        let address = strategy.execute(&ctx).await.unwrap();
        assert_eq!(address, token);
        assert_eq!(h.rpc.submission_count(), 1);

        let status = strategy.status();
        assert_eq!(status.stage, StrategyStage::Completed);
        assert!(status
            .message
            .as_deref()
            .unwrap()
            .contains("no wallets available for purchasing"));
    }

    #[tokio::test]
    async fn failed_instance_can_be_reinitialized_and_reused() {
        let h = harness(1).await;
        let strategy =
            BundleLaunchStrategy::new(h.registry.clone(), h.executor.clone(), h.config.clone());

        // First run fails: missing creation parameters
        let mut ctx = context("0.1");
        ctx.create_arg = alloy::primitives::Bytes::new();
        assert!(strategy.execute(&ctx).await.is_err());
        assert_eq!(strategy.status().stage, StrategyStage::Failed);

        // Re-initialize and run clean
        strategy
            .initialize(StrategyOptions::Bundle(BundleOptions::default()))
            .unwrap();
        assert_eq!(strategy.status().stage, StrategyStage::Initialized);

        h.rpc.set_pending_contract_address(Address::repeat_byte(0x70));
        strategy.execute(&context("0.1")).await.unwrap();
        assert_eq!(strategy.status().stage, StrategyStage::Completed);
    }
}
