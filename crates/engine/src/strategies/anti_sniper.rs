//! Anti-sniper launch - create the token, watch the transfer log for
//! external buyers, and apply a countermeasure before buying when too
//! many show up.

use super::{
    purchase_targets, submit_token_creation, LaunchStrategy, StatusCell, StrategyKind,
};
use alloy::primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use fourmeme_chain::{BatchExecutor, EvmRpc, LogEntry, LogFilter, WalletRegistry};
use fourmeme_core::{
    AntiSniperOptions, Countermeasure, Error, ExecutionOptions, LaunchContext, LauncherConfig,
    Priority, Result, StrategyOptions, StrategyStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

fn transfer_topic() -> B256 {
    keccak256(TRANSFER_EVENT_SIGNATURE.as_bytes())
}

/// Recipient of an ERC-20 transfer, from the indexed `to` topic
fn transfer_recipient(log: &LogEntry) -> Option<Address> {
    log.topics.get(2).map(|topic| Address::from_word(*topic))
}

pub struct AntiSniperStrategy {
    registry: Arc<WalletRegistry>,
    executor: Arc<BatchExecutor>,
    rpc: Arc<dyn EvmRpc>,
    config: Arc<LauncherConfig>,
    options: RwLock<AntiSniperOptions>,
    status: StatusCell,
    /// Distinct non-managed buyers seen during monitoring
    external_buyers: Mutex<HashSet<Address>>,
}

impl AntiSniperStrategy {
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
            options: RwLock::new(AntiSniperOptions::default()),
            status: StatusCell::default(),
            external_buyers: Mutex::new(HashSet::new()),
        }
    }

    fn options_snapshot(&self) -> AntiSniperOptions {
        self.options.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of distinct external buyers detected so far
    pub fn external_buyer_count(&self) -> usize {
        self.external_buyers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn is_external(&self, buyer: Address, token_address: Address) -> bool {
        buyer != Address::ZERO
            && buyer != token_address
            && buyer != self.config.factory_address
            && !self.registry.contains(&buyer)
    }

    /// Poll the token's Transfer log for `monitor_duration`, recording
    /// distinct buyers that are not ours. Returns the detected count.
    async fn monitor_for_snipers(
        &self,
        token_address: Address,
        from_block: u64,
        options: &AntiSniperOptions,
    ) -> usize {
        self.status.set(StrategyStatus::executing(
            50,
            "Monitoring for sniper activity...",
        ));

        let filter = LogFilter {
            address: Some(token_address),
            topic0: Some(transfer_topic()),
            from_block: Some(from_block),
            to_block: None,
        };
        let deadline = tokio::time::Instant::now() + options.monitor_duration;

        loop {
            match self.rpc.logs(&filter).await {
                Ok(logs) => {
                    let mut buyers = self
                        .external_buyers
                        .lock()
                        .unwrap_or_else(|e| e.into_inner());
                    for log in &logs {
                        if let Some(buyer) = transfer_recipient(log) {
                            if self.is_external(buyer, token_address) && buyers.insert(buyer) {
                                info!(%buyer, "external buyer detected");
                            }
                        }
                    }
                }
                Err(e) => warn!("sniper monitor poll failed: {e}"),
            }

            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(options.poll_interval).await;
        }

        let detected = self.external_buyer_count();
        self.status.set(StrategyStatus::executing(
            70,
            format!("Monitoring complete. Detected {detected} external buyers."),
        ));
        detected
    }

    async fn apply_countermeasure(&self, options: &AntiSniperOptions) -> Result<()> {
        self.status.set(StrategyStatus::executing(
            80,
            format!("Executing {} countermeasures...", options.countermeasure),
        ));

        match options.countermeasure {
            Countermeasure::Delay => {
                // Let the snipers in first, then come in after them
                info!(
                    "delaying purchases by {:?} to outlast sniper entries",
                    options.countermeasure_delay
                );
                tokio::time::sleep(options.countermeasure_delay).await;
            }
            Countermeasure::Abort => return Err(Error::LaunchAborted),
            Countermeasure::Dump => {
                warn!("dump countermeasure is not implemented; proceeding without it");
            }
            Countermeasure::None => {}
        }

        Ok(())
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
            40,
            "Token created. Monitoring for sniper activity...",
        ));

        let detected = self
            .monitor_for_snipers(token_address, creation.receipt.block_number, &options)
            .await;

        if detected >= options.trigger_threshold {
            self.apply_countermeasure(&options).await?;
        }

        let (addresses, intents) =
            purchase_targets(&self.registry, token_address, context.buy.as_ref(), None);
        if addresses.is_empty() {
            self.status.set(StrategyStatus::completed(format!(
                "Token created successfully at {token_address}, but no wallets available for purchasing"
            )));
            return Ok(token_address);
        }

        self.status.set(StrategyStatus::executing(
            90,
            format!("Executing {} purchases...", addresses.len()),
        ));

        self.executor
            .execute_parallel(&addresses, &intents, &execution)
            .await?;

        self.status.set(StrategyStatus::completed(format!(
            "Anti-sniper launch completed. Token address: {token_address}"
        )));
        Ok(token_address)
    }
}

#[async_trait]
impl LaunchStrategy for AntiSniperStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AntiSniper
    }

    fn name(&self) -> String {
        self.options_snapshot().base.name
    }

    fn description(&self) -> String {
        self.options_snapshot().base.description
    }

    fn initialize(&self, options: StrategyOptions) -> Result<()> {
        match options {
            StrategyOptions::AntiSniper(options) => {
                *self.options.write().unwrap_or_else(|e| e.into_inner()) = options;
                self.status.set(StrategyStatus::initialized(
                    "Strategy initialized with anti-sniper options",
                ));
                Ok(())
            }
            other => Err(Error::UnsupportedStrategy(format!(
                "anti-sniper strategy cannot take {} options",
                other.kind_name()
            ))),
        }
    }

    async fn execute(&self, context: &LaunchContext) -> Result<Address> {
        self.status.set(StrategyStatus::executing(
            20,
            "Preparing for anti-sniper launch...",
        ));

        match self.run(context).await {
            Ok(address) => Ok(address),
            Err(err) => {
                self.status.set(StrategyStatus::failed(
                    "Anti-sniper launch failed",
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
        self.external_buyers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, harness, Harness};
    use super::*;
    use alloy::primitives::Bytes;
    use fourmeme_core::StrategyStage;
    use std::time::Duration;

    fn fast_options(countermeasure: Countermeasure, threshold: usize) -> AntiSniperOptions {
        let mut options = AntiSniperOptions::default();
        options.monitor_duration = Duration::from_millis(100);
        options.poll_interval = Duration::from_millis(20);
        options.countermeasure_delay = Duration::from_millis(50);
        options.trigger_threshold = threshold;
        options.countermeasure = countermeasure;
        options
    }

    fn strategy(h: &Harness) -> AntiSniperStrategy {
        AntiSniperStrategy::new(
            h.registry.clone(),
            h.executor.clone(),
            h.rpc.clone(),
            h.config.clone(),
        )
    }

    fn transfer_log(token: Address, recipient: Address, block: u64, salt: u8) -> LogEntry {
        LogEntry {
            address: token,
            topics: vec![transfer_topic(), B256::ZERO, recipient.into_word()],
            data: Bytes::new(),
            block_number: block,
            transaction_hash: B256::repeat_byte(salt),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abort_countermeasure_sends_no_purchases() {
        let h = harness(3).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);
        h.rpc
            .push_log(transfer_log(token, Address::repeat_byte(0x11), 1, 1));
        h.rpc
            .push_log(transfer_log(token, Address::repeat_byte(0x22), 1, 2));

        let strategy = strategy(&h);
        strategy
            .initialize(StrategyOptions::AntiSniper(fast_options(
                Countermeasure::Abort,
                2,
            )))
            .unwrap();

        let err = strategy.execute(&context("0.1")).await.unwrap_err();
        assert!(matches!(err, Error::LaunchAborted));
        // Only the creation transaction went out
        assert_eq!(h.rpc.submission_count(), 1);
        assert_eq!(strategy.status().stage, StrategyStage::Failed);
        assert_eq!(strategy.external_buyer_count(), 2);

        // Cleanup releases the tracked buyers and is idempotent
        strategy.cleanup();
        strategy.cleanup();
        assert_eq!(strategy.external_buyer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn below_threshold_proceeds_without_countermeasures() {
        let h = harness(3).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);
        h.rpc
            .push_log(transfer_log(token, Address::repeat_byte(0x11), 1, 1));

        let strategy = strategy(&h);
        strategy
            .initialize(StrategyOptions::AntiSniper(fast_options(
                Countermeasure::Abort,
                2,
            )))
            .unwrap();

        let address = strategy.execute(&context("0.1")).await.unwrap();
        assert_eq!(address, token);
        assert_eq!(strategy.external_buyer_count(), 1);
        // Creation plus three purchases
        assert_eq!(h.rpc.submission_count(), 4);
        assert_eq!(strategy.status().stage, StrategyStage::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn managed_wallets_are_not_counted_as_snipers() {
        let h = harness(2).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);
        // Transfers to our own wallets, the token, and the zero address
        h.rpc.push_log(transfer_log(token, h.wallets[1], 1, 1));
        h.rpc.push_log(transfer_log(token, token, 1, 2));
        h.rpc.push_log(transfer_log(token, Address::ZERO, 1, 3));

        let strategy = strategy(&h);
        strategy
            .initialize(StrategyOptions::AntiSniper(fast_options(
                Countermeasure::Abort,
                1,
            )))
            .unwrap();

        strategy.execute(&context("0.1")).await.unwrap();
        assert_eq!(strategy.external_buyer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_countermeasure_waits_then_buys() {
        let h = harness(2).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);
        h.rpc
            .push_log(transfer_log(token, Address::repeat_byte(0x11), 1, 1));

        let strategy = strategy(&h);
        strategy
            .initialize(StrategyOptions::AntiSniper(fast_options(
                Countermeasure::Delay,
                1,
            )))
            .unwrap();

        let started = tokio::time::Instant::now();
        strategy.execute(&context("0.1")).await.unwrap();

        // Monitoring window plus the countermeasure delay
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(h.rpc.submission_count(), 3);
        assert_eq!(strategy.status().stage, StrategyStage::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn dump_countermeasure_is_a_noop_placeholder() {
        let h = harness(2).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);
        h.rpc
            .push_log(transfer_log(token, Address::repeat_byte(0x11), 1, 1));

        let strategy = strategy(&h);
        strategy
            .initialize(StrategyOptions::AntiSniper(fast_options(
                Countermeasure::Dump,
                1,
            )))
            .unwrap();

        strategy.execute(&context("0.1")).await.unwrap();
        assert_eq!(h.rpc.submission_count(), 3);
        assert_eq!(strategy.status().stage, StrategyStage::Completed);
    }
}
