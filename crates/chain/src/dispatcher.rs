//! Transaction dispatcher
//!
//! Fills gas parameters, signs with the registry's wallet, submits, and
//! polls for confirmation. Retry policy lives one layer up in the batch
//! executor; a dispatch here is submitted at most once.

use crate::registry::WalletRegistry;
use crate::rpc::EvmRpc;
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, TxKind};
use alloy::signers::local::PrivateKeySigner;
use fourmeme_core::{Error, ExecutionOptions, Result, TransactionIntent, TxReceipt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed interval between receipt polls
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Prepares and submits transactions for registry wallets
pub struct TxDispatcher {
    rpc: Arc<dyn EvmRpc>,
    registry: Arc<WalletRegistry>,
    chain_id: u64,
    poll_interval: Duration,
    /// `None` keeps polling until a receipt confirms
    confirmation_timeout: Option<Duration>,
}

impl TxDispatcher {
    pub fn new(rpc: Arc<dyn EvmRpc>, registry: Arc<WalletRegistry>, chain_id: u64) -> Self {
        Self {
            rpc,
            registry,
            chain_id,
            poll_interval: RECEIPT_POLL_INTERVAL,
            confirmation_timeout: None,
        }
    }

    /// Bound confirmation polling; exceeding the bound yields
    /// [`Error::ConfirmationTimeout`] instead of polling forever.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }

    /// Override the receipt poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fill in missing gas parameters for `intent`.
    ///
    /// Returns a filled copy; the input is never mutated. An unset gas
    /// limit is estimated and scaled by the configured multiplier; when no
    /// fee field is set, the network gas price is read and scaled by the
    /// priority factor.
    pub async fn prepare(
        &self,
        from: Address,
        intent: &TransactionIntent,
        options: &ExecutionOptions,
    ) -> Result<TransactionIntent> {
        let mut filled = intent.clone();

        if filled.gas.is_none() {
            let estimate = self
                .rpc
                .estimate_gas(intent, from)
                .await
                .map_err(|e| Error::GasEstimation(e.to_string()))?;
            filled.gas = Some((estimate as f64 * options.gas_multiplier).floor() as u64);
        }

        if !filled.has_fee_fields() {
            let base = self
                .rpc
                .gas_price()
                .await
                .map_err(|e| Error::GasEstimation(e.to_string()))?;
            filled.gas_price =
                Some((base as f64 * options.priority.gas_price_factor()).floor() as u128);
        }

        Ok(filled)
    }

    /// Prepare, sign, and submit `intent` from the given wallet.
    ///
    /// Fails with [`Error::Submission`] when the wallet is unknown or the
    /// node rejects the transaction. No retry happens at this layer.
    pub async fn dispatch(
        &self,
        address: Address,
        intent: &TransactionIntent,
        options: &ExecutionOptions,
    ) -> Result<B256> {
        let signer = self
            .registry
            .signer(&address)
            .ok_or_else(|| Error::Submission(format!("unknown wallet: {address}")))?;

        let prepared = self.prepare(address, intent, options).await?;

        let nonce = match prepared.nonce {
            Some(nonce) => nonce,
            None => self
                .rpc
                .transaction_count(address)
                .await
                .map_err(|e| Error::Submission(format!("nonce lookup failed: {e}")))?,
        };

        let raw = sign_intent(&signer, &prepared, nonce, self.chain_id)?;

        let hash = self
            .rpc
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;

        debug!(%address, %hash, nonce, "transaction submitted");
        Ok(hash)
    }

    /// Whether code exists at `address` (a deployed contract)
    pub async fn is_contract_deployed(&self, address: Address) -> Result<bool> {
        let code = self.rpc.code_at(address).await?;
        Ok(!code.is_empty())
    }

    /// Poll until `hash` is mined with at least `confirmations` blocks on
    /// top of it (fixed 2s interval). Receipt-not-found keeps polling; only
    /// a configured timeout ends the wait early.
    pub async fn await_confirmation(&self, hash: B256, confirmations: u64) -> Result<TxReceipt> {
        let started = tokio::time::Instant::now();

        loop {
            if let Some(timeout) = self.confirmation_timeout {
                if started.elapsed() >= timeout {
                    return Err(Error::ConfirmationTimeout {
                        hash: hash.to_string(),
                    });
                }
            }

            match self.rpc.transaction_receipt(hash).await {
                Ok(Some(receipt)) => match self.rpc.block_number().await {
                    Ok(current) => {
                        let depth = current.saturating_sub(receipt.block_number) + 1;
                        if depth >= confirmations {
                            debug!(%hash, depth, "transaction confirmed");
                            return Ok(receipt);
                        }
                    }
                    Err(e) => warn!(%hash, "block number check failed: {e}"),
                },
                Ok(None) => {}
                Err(e) => warn!(%hash, "error checking receipt: {e}"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Sign a fully prepared intent into a raw transaction payload.
///
/// Intents carrying `max_fee_per_gas` become EIP-1559 transactions;
/// everything else is signed as a legacy transaction.
fn sign_intent(
    signer: &PrivateKeySigner,
    intent: &TransactionIntent,
    nonce: u64,
    chain_id: u64,
) -> Result<Vec<u8>> {
    let to = match intent.to {
        Some(address) => TxKind::Call(address),
        None => TxKind::Create,
    };
    let gas_limit = intent
        .gas
        .ok_or_else(|| Error::Submission("gas limit not set".into()))?;

    let envelope: TxEnvelope = if let Some(max_fee_per_gas) = intent.max_fee_per_gas {
        let mut tx = TxEip1559 {
            chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas: intent.max_priority_fee_per_gas.unwrap_or(max_fee_per_gas),
            to,
            value: intent.value,
            access_list: Default::default(),
            input: intent.data.clone(),
        };
        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::Submission(format!("signing failed: {e}")))?;
        tx.into_signed(signature).into()
    } else {
        let gas_price = intent
            .gas_price
            .ok_or_else(|| Error::Submission("gas price not set".into()))?;
        let mut tx = TxLegacy {
            chain_id: Some(chain_id),
            nonce,
            gas_price,
            gas_limit,
            to,
            value: intent.value,
            input: intent.data.clone(),
        };
        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::Submission(format!("signing failed: {e}")))?;
        tx.into_signed(signature).into()
    };

    let mut raw = Vec::new();
    envelope.encode_2718(&mut raw);
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRpc, TEST_KEYS};
    use alloy::primitives::U256;
    use fourmeme_core::Priority;

    async fn setup() -> (Arc<MockRpc>, Arc<WalletRegistry>, TxDispatcher, Address) {
        let rpc = Arc::new(MockRpc::new());
        let registry = Arc::new(WalletRegistry::new(rpc.clone()));
        let address = registry.add_account(TEST_KEYS[0], None).await.unwrap();
        let dispatcher = TxDispatcher::new(rpc.clone(), registry.clone(), 56)
            .with_poll_interval(Duration::from_millis(10));
        (rpc, registry, dispatcher, address)
    }

    fn intent() -> TransactionIntent {
        TransactionIntent::transfer(Address::repeat_byte(9), U256::from(100))
    }

    #[tokio::test]
    async fn prepare_fills_gas_and_price_without_mutating_input() {
        let (rpc, _registry, dispatcher, from) = setup().await;
        rpc.set_gas_estimate(100_000);
        rpc.set_gas_price(10_000_000_000);

        let original = intent();
        let options = ExecutionOptions {
            gas_multiplier: 1.2,
            priority: Priority::High,
            ..Default::default()
        };

        let filled = dispatcher.prepare(from, &original, &options).await.unwrap();

        assert_eq!(filled.gas, Some(120_000));
        assert_eq!(filled.gas_price, Some(15_000_000_000));
        // The caller's intent is untouched
        assert_eq!(original, intent());
    }

    #[tokio::test]
    async fn prepare_respects_explicit_fields() {
        let (rpc, _registry, dispatcher, from) = setup().await;
        rpc.fail_estimates(true);

        let mut explicit = intent();
        explicit.gas = Some(21_000);
        explicit.gas_price = Some(1);

        // No estimation or price lookup happens when both are set
        let filled = dispatcher
            .prepare(from, &explicit, &ExecutionOptions::default())
            .await
            .unwrap();
        assert_eq!(filled, explicit);
    }

    #[tokio::test]
    async fn prepare_maps_estimation_failures() {
        let (rpc, _registry, dispatcher, from) = setup().await;
        rpc.fail_estimates(true);

        let err = dispatcher
            .prepare(from, &intent(), &ExecutionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GasEstimation(_)));
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_wallets() {
        let (_rpc, _registry, dispatcher, _from) = setup().await;
        let stranger = Address::repeat_byte(0xAB);

        let err = dispatcher
            .dispatch(stranger, &intent(), &ExecutionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
    }

    #[tokio::test]
    async fn dispatch_submits_and_confirmation_returns_receipt() {
        let (rpc, _registry, dispatcher, from) = setup().await;

        let hash = dispatcher
            .dispatch(from, &intent(), &ExecutionOptions::default())
            .await
            .unwrap();
        assert_eq!(rpc.submission_count(), 1);

        let receipt = dispatcher.await_confirmation(hash, 1).await.unwrap();
        assert_eq!(receipt.transaction_hash, hash);
        assert!(receipt.status.is_success());
    }

    #[tokio::test]
    async fn contract_deployment_check_reads_code() {
        let (rpc, _registry, dispatcher, _from) = setup().await;
        let contract = Address::repeat_byte(0x70);

        assert!(!dispatcher.is_contract_deployed(contract).await.unwrap());
        rpc.set_code(contract, alloy::primitives::Bytes::from(vec![0x60, 0x80]));
        assert!(dispatcher.is_contract_deployed(contract).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_times_out_when_bounded() {
        let (rpc, registry, _dispatcher, from) = setup().await;
        let dispatcher = TxDispatcher::new(rpc.clone(), registry, 56)
            .with_poll_interval(Duration::from_millis(10))
            .with_confirmation_timeout(Duration::from_millis(50));

        // A hash that never gets a receipt
        let missing = B256::repeat_byte(7);
        let err = dispatcher.await_confirmation(missing, 1).await.unwrap_err();
        assert!(matches!(err, Error::ConfirmationTimeout { .. }));
        let _ = from;
    }
}
