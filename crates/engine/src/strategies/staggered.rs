//! Staggered launch - create the token with the primary wallet, then buy
//! from the remaining wallets one at a time with a configurable delay.

use super::{
    purchase_targets, submit_token_creation, LaunchStrategy, StatusCell, StrategyKind,
};
use alloy::primitives::Address;
use async_trait::async_trait;
use fourmeme_chain::{BatchExecutor, WalletRegistry};
use fourmeme_core::{
    Error, ExecutionOptions, LaunchContext, LauncherConfig, Priority, Result, StaggeredOptions,
    StrategyOptions, StrategyStatus,
};
use std::sync::{Arc, RwLock};

pub struct StaggeredLaunchStrategy {
    registry: Arc<WalletRegistry>,
    executor: Arc<BatchExecutor>,
    config: Arc<LauncherConfig>,
    options: RwLock<StaggeredOptions>,
    status: StatusCell,
}

impl StaggeredLaunchStrategy {
    pub fn new(
        registry: Arc<WalletRegistry>,
        executor: Arc<BatchExecutor>,
        config: Arc<LauncherConfig>,
    ) -> Self {
        Self {
            registry,
            executor,
            config,
            options: RwLock::new(StaggeredOptions::default()),
            status: StatusCell::default(),
        }
    }

    fn options_snapshot(&self) -> StaggeredOptions {
        self.options.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn run(&self, context: &LaunchContext) -> Result<Address> {
        let options = self.options_snapshot();
        let execution = ExecutionOptions {
            gas_multiplier: options.base.gas_multiplier,
            max_retries: options.base.max_retries,
            confirmations: options.base.confirmations,
            priority: Priority::Medium,
        };

        // The dev wallet creates; the rest buy afterwards
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
            40,
            "Token created. Starting staggered purchases...",
        ));

        let (addresses, intents) = purchase_targets(
            &self.registry,
            token_address,
            context.buy.as_ref(),
            Some(creator),
        );
        if addresses.is_empty() {
            self.status.set(StrategyStatus::completed(format!(
                "Staggered launch completed. Token address: {token_address}. No additional purchases were made"
            )));
            return Ok(token_address);
        }

        self.status.set(StrategyStatus::executing(
            70,
            format!("Executing {} staggered purchases...", addresses.len()),
        ));

        self.executor
            .execute_sequential(
                &addresses,
                &intents,
                options.delay_between_transactions,
                options.wait_for_confirmation,
                &execution,
            )
            .await?;

        self.status.set(StrategyStatus::completed(format!(
            "Staggered launch completed. Token address: {token_address}"
        )));
        Ok(token_address)
    }
}

#[async_trait]
impl LaunchStrategy for StaggeredLaunchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Staggered
    }

    fn name(&self) -> String {
        self.options_snapshot().base.name
    }

    fn description(&self) -> String {
        self.options_snapshot().base.description
    }

    fn initialize(&self, options: StrategyOptions) -> Result<()> {
        match options {
            StrategyOptions::Staggered(options) => {
                *self.options.write().unwrap_or_else(|e| e.into_inner()) = options;
                self.status.set(StrategyStatus::initialized(
                    "Strategy initialized with staggered launch options",
                ));
                Ok(())
            }
            other => Err(Error::UnsupportedStrategy(format!(
                "staggered strategy cannot take {} options",
                other.kind_name()
            ))),
        }
    }

    async fn execute(&self, context: &LaunchContext) -> Result<Address> {
        self.status.set(StrategyStatus::executing(
            20,
            "Preparing for staggered launch...",
        ));

        match self.run(context).await {
            Ok(address) => Ok(address),
            Err(err) => {
                self.status.set(StrategyStatus::failed(
                    "Staggered launch failed",
                    err.to_string(),
                ));
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
