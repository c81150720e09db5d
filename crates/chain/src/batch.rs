//! Batch and sequence execution
//!
//! Runs the dispatcher across many (wallet, intent) pairs. Parallel
//! batches are all-or-nothing: one failed dispatch fails the whole call.
//! Sequences run in array order with a fixed delay and abort on the first
//! failure. Retry policy (`max_retries`, exponential backoff) lives here,
//! wrapped around each individual dispatch.

use crate::dispatcher::TxDispatcher;
use alloy::primitives::{Address, B256};
use fourmeme_core::{Error, ExecutionOptions, Result, TransactionIntent};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Base delay before the first retry; doubles per attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Executes dispatches in parallel fan-outs or timed sequences
pub struct BatchExecutor {
    dispatcher: Arc<TxDispatcher>,
}

impl BatchExecutor {
    pub fn new(dispatcher: Arc<TxDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<TxDispatcher> {
        &self.dispatcher
    }

    /// Dispatch with up to `options.max_retries` retries on failure.
    ///
    /// Only a failed submission is retried; once the node accepts a
    /// transaction it is never re-submitted.
    pub async fn dispatch_with_retry(
        &self,
        address: Address,
        intent: &TransactionIntent,
        options: &ExecutionOptions,
    ) -> Result<B256> {
        let mut attempt: u32 = 0;
        loop {
            match self.dispatcher.dispatch(address, intent, options).await {
                Ok(hash) => return Ok(hash),
                Err(err) => {
                    if attempt >= options.max_retries {
                        return Err(err);
                    }
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        %address,
                        attempt = attempt + 1,
                        "dispatch failed: {err}; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Dispatch all pairs concurrently and join on every submission.
    ///
    /// All-or-nothing: any failed dispatch fails the call, and hashes for
    /// dispatches that did succeed are not surfaced. On success the hashes
    /// come back in input order.
    pub async fn execute_parallel(
        &self,
        addresses: &[Address],
        intents: &[TransactionIntent],
        options: &ExecutionOptions,
    ) -> Result<Vec<B256>> {
        if addresses.len() != intents.len() {
            return Err(Error::ArityMismatch {
                wallets: addresses.len(),
                transactions: intents.len(),
            });
        }

        let tasks = addresses.iter().zip(intents.iter()).map(|(address, intent)| {
            let address = *address;
            async move {
                self.dispatch_with_retry(address, intent, options)
                    .await
                    .map_err(|err| {
                        error!(%address, "parallel dispatch failed: {err}");
                        err
                    })
            }
        });

        try_join_all(tasks).await
    }

    /// Dispatch pairs one at a time in array order, sleeping `delay`
    /// between consecutive dispatches (none after the last).
    ///
    /// With `wait_for_confirmation`, each dispatch is confirmed to
    /// `options.confirmations` depth before the next one begins. The first
    /// failure aborts the remaining sequence.
    pub async fn execute_sequential(
        &self,
        addresses: &[Address],
        intents: &[TransactionIntent],
        delay: Duration,
        wait_for_confirmation: bool,
        options: &ExecutionOptions,
    ) -> Result<Vec<B256>> {
        if addresses.len() != intents.len() {
            return Err(Error::ArityMismatch {
                wallets: addresses.len(),
                transactions: intents.len(),
            });
        }

        let mut hashes = Vec::with_capacity(addresses.len());

        for (i, (address, intent)) in addresses.iter().zip(intents.iter()).enumerate() {
            let hash = self
                .dispatch_with_retry(*address, intent, options)
                .await
                .map_err(|err| {
                    error!(%address, index = i, "sequential dispatch failed: {err}");
                    err
                })?;
            hashes.push(hash);

            if wait_for_confirmation {
                self.dispatcher
                    .await_confirmation(hash, options.confirmations)
                    .await?;
            }

            if i + 1 < addresses.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockRpc, TEST_KEYS};
    use crate::registry::WalletRegistry;
    use alloy::primitives::U256;
    use std::collections::HashSet;

    async fn setup(wallets: usize) -> (Arc<MockRpc>, BatchExecutor, Vec<Address>) {
        let rpc = Arc::new(MockRpc::new());
        let registry = Arc::new(WalletRegistry::new(rpc.clone()));
        let mut addresses = Vec::new();
        for key in TEST_KEYS.iter().take(wallets) {
            addresses.push(registry.add_account(key, None).await.unwrap());
        }
        let dispatcher = Arc::new(
            TxDispatcher::new(rpc.clone(), registry, 56)
                .with_poll_interval(Duration::from_millis(10)),
        );
        (rpc, BatchExecutor::new(dispatcher), addresses)
    }

    fn intents(n: usize) -> Vec<TransactionIntent> {
        (0..n)
            .map(|i| {
                TransactionIntent::transfer(Address::repeat_byte(i as u8 + 1), U256::from(100))
            })
            .collect()
    }

    fn no_retry() -> ExecutionOptions {
        ExecutionOptions {
            max_retries: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn parallel_requires_matching_lengths() {
        let (_rpc, executor, addresses) = setup(1).await;

        let err = executor
            .execute_parallel(&addresses, &intents(2), &no_retry())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch {
                wallets: 1,
                transactions: 2
            }
        ));
    }

    #[tokio::test]
    async fn parallel_returns_hashes_in_input_order() {
        let (rpc, executor, addresses) = setup(3).await;

        let hashes = executor
            .execute_parallel(&addresses, &intents(3), &no_retry())
            .await
            .unwrap();

        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes.iter().collect::<HashSet<_>>().len(), 3);
        let accepted: HashSet<B256> = rpc.submissions().into_iter().collect();
        assert!(hashes.iter().all(|h| accepted.contains(h)));
    }

    #[tokio::test]
    async fn parallel_fails_loud_on_any_failure() {
        let (rpc, executor, addresses) = setup(3).await;
        rpc.fail_attempt(1);

        let err = executor
            .execute_parallel(&addresses, &intents(3), &no_retry())
            .await
            .unwrap_err();

        // No partial hash list comes back
        assert!(matches!(err, Error::Submission(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_submission_failure() {
        let (rpc, executor, addresses) = setup(1).await;
        rpc.fail_attempt(0);

        let options = ExecutionOptions {
            max_retries: 2,
            ..Default::default()
        };
        let hash = executor
            .dispatch_with_retry(addresses[0], &intents(1)[0], &options)
            .await
            .unwrap();

        assert_eq!(rpc.attempt_count(), 2);
        assert_eq!(rpc.submissions(), vec![hash]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_max_retries() {
        let (rpc, executor, addresses) = setup(1).await;
        rpc.fail_all_submissions(true);

        let options = ExecutionOptions {
            max_retries: 2,
            ..Default::default()
        };
        let err = executor
            .dispatch_with_retry(addresses[0], &intents(1)[0], &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Submission(_)));
        // Initial attempt plus two retries
        assert_eq!(rpc.attempt_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_sleeps_between_dispatches() {
        let (_rpc, executor, addresses) = setup(3).await;
        let delay = Duration::from_millis(100);

        let started = tokio::time::Instant::now();
        let hashes = executor
            .execute_sequential(&addresses, &intents(3), delay, false, &no_retry())
            .await
            .unwrap();

        assert_eq!(hashes.len(), 3);
        let elapsed = started.elapsed();
        // Two inter-dispatch delays, none after the last
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_aborts_on_first_failure() {
        let (rpc, executor, addresses) = setup(3).await;
        rpc.fail_attempt(1);

        let err = executor
            .execute_sequential(
                &addresses,
                &intents(3),
                Duration::from_millis(10),
                false,
                &no_retry(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Submission(_)));
        // Only the first dispatch was accepted; the third never ran
        assert_eq!(rpc.submission_count(), 1);
        assert_eq!(rpc.attempt_count(), 2);
    }

    #[tokio::test]
    async fn sequential_can_wait_for_each_confirmation() {
        let (_rpc, executor, addresses) = setup(2).await;

        let hashes = executor
            .execute_sequential(&addresses, &intents(2), Duration::ZERO, true, &no_retry())
            .await
            .unwrap();
        assert_eq!(hashes.len(), 2);
    }
}
