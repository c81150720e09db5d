//! Launch strategies
//!
//! Each strategy sequences "create token" then "execute purchases" under a
//! different timing policy. All variants share the lifecycle
//! idle → initialized → executing → completed | failed, expose a live
//! status snapshot, and have `cleanup` invoked once per execute attempt
//! (the engine guarantees this in all paths).

mod anti_sniper;
mod bundle;
mod staggered;

pub use anti_sniper::AntiSniperStrategy;
pub use bundle::BundleLaunchStrategy;
pub use staggered::StaggeredLaunchStrategy;

use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use fourmeme_chain::{BatchExecutor, WalletRegistry};
use fourmeme_core::{
    BuyOptions, Error, ExecutionOptions, LaunchContext, LauncherConfig, Result, StrategyOptions,
    StrategyStatus, TransactionIntent, TxReceipt,
};
use std::fmt;
use std::sync::RwLock;
use tracing::info;

// four.meme factory entrypoint
sol! {
    function createToken(bytes createArg, bytes signature) payable;
}

/// Strategy variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Bundle,
    Staggered,
    AntiSniper,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Bundle => "bundle",
            StrategyKind::Staggered => "staggered",
            StrategyKind::AntiSniper => "anti-sniper",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bundle" => Ok(StrategyKind::Bundle),
            "staggered" => Ok(StrategyKind::Staggered),
            "anti-sniper" => Ok(StrategyKind::AntiSniper),
            other => Err(Error::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// A launch strategy instance.
///
/// Implementations keep their own state behind interior locks so that
/// `status` can be read while `execute` runs.
#[async_trait]
pub trait LaunchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;
    fn name(&self) -> String;
    fn description(&self) -> String;

    /// Install the supplied options and move to `initialized`.
    ///
    /// Options for a different variant are rejected with
    /// [`Error::UnsupportedStrategy`].
    fn initialize(&self, options: StrategyOptions) -> Result<()>;

    /// Run the launch: create the token, confirm it, then execute the
    /// configured purchases. Ends in `completed` (carrying the token
    /// address) or `failed` (the error is recorded in the status before it
    /// propagates). Callable without `initialize`; built-in defaults apply.
    async fn execute(&self, context: &LaunchContext) -> Result<Address>;

    /// Latest status snapshot; safe to call concurrently with `execute`.
    fn status(&self) -> StrategyStatus;

    /// Release strategy-local tracking state. Idempotent.
    fn cleanup(&self);
}

/// Interior-locked status slot shared by the strategy implementations
#[derive(Default)]
pub(crate) struct StatusCell(RwLock<StrategyStatus>);

impl StatusCell {
    pub(crate) fn set(&self, status: StrategyStatus) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub(crate) fn get(&self) -> StrategyStatus {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Result of a confirmed token creation
#[derive(Debug)]
pub(crate) struct CreationOutcome {
    pub token_address: Address,
    pub receipt: TxReceipt,
}

/// ABI-encode the factory call from the API-provided argument and signature
pub(crate) fn encode_create_token(create_arg: &Bytes, signature: &Bytes) -> Bytes {
    createTokenCall {
        createArg: create_arg.clone(),
        signature: signature.clone(),
    }
    .abi_encode()
    .into()
}

/// Submit the token-creation transaction from `creator` and wait for it to
/// confirm. Resolves the deployed token address from the receipt, falling
/// back to the address the API reported.
pub(crate) async fn submit_token_creation(
    executor: &BatchExecutor,
    config: &LauncherConfig,
    context: &LaunchContext,
    creator: Address,
    options: &ExecutionOptions,
) -> Result<CreationOutcome> {
    if context.create_arg.is_empty() || context.signature.is_empty() {
        return Err(Error::InvalidData(
            "missing createArg or signature; cannot proceed with token creation".into(),
        ));
    }

    let data = encode_create_token(&context.create_arg, &context.signature);
    let intent = TransactionIntent::call(config.factory_address, data, config.create_token_fee);

    let hash = executor.dispatch_with_retry(creator, &intent, options).await?;
    info!(%hash, "token creation submitted");

    let receipt = executor
        .dispatcher()
        .await_confirmation(hash, options.confirmations)
        .await?;
    if !receipt.status.is_success() {
        return Err(Error::Submission(format!(
            "token creation reverted: {hash}"
        )));
    }

    let token_address = receipt
        .contract_address
        .or(context.token_address)
        .ok_or_else(|| Error::InvalidData("could not determine token contract address".into()))?;

    info!(%token_address, "token created");
    Ok(CreationOutcome {
        token_address,
        receipt,
    })
}

/// Collect the active wallets that should buy, with one purchase intent
/// per wallet, in priority order. `exclude` drops the creator wallet for
/// strategies that buy from the remaining accounts only.
pub(crate) fn purchase_targets(
    registry: &WalletRegistry,
    token_address: Address,
    buy: Option<&BuyOptions>,
    exclude: Option<Address>,
) -> (Vec<Address>, Vec<TransactionIntent>) {
    let Some(buy) = buy.filter(|b| b.enabled) else {
        return (Vec::new(), Vec::new());
    };

    let mut addresses = Vec::new();
    let mut intents = Vec::new();
    for address in registry.active_addresses() {
        if Some(address) == exclude {
            continue;
        }
        addresses.push(address);
        intents.push(TransactionIntent::transfer(token_address, buy.buy_amount));
    }
    (addresses, intents)
}


#[cfg(test)]
mod tests {
    use super::test_support::{context, harness};
    use super::*;
    use fourmeme_core::Priority;

    #[test]
    fn kind_round_trips() {
        for kind in [
            StrategyKind::Bundle,
            StrategyKind::Staggered,
            StrategyKind::AntiSniper,
        ] {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!(matches!(
            "warp-speed".parse::<StrategyKind>(),
            Err(Error::UnsupportedStrategy(_))
        ));
    }

    #[test]
    fn create_token_encoding_carries_selector_and_payloads() {
        let data = encode_create_token(
            &Bytes::from(vec![0xAA; 40]),
            &Bytes::from(vec![0xBB; 65]),
        );
        // 4-byte selector, two offsets, two length-prefixed byte arrays
        assert_eq!(&data[..4], createTokenCall::SELECTOR.as_slice());
        assert!(data.len() > 4 + 64 + 40 + 65);
    }

    #[tokio::test]
    async fn creation_requires_api_parameters() {
        let h = harness(1).await;
        let mut ctx = context("0.1");
        ctx.create_arg = Bytes::new();

        let err = submit_token_creation(
            &h.executor,
            &h.config,
            &ctx,
            h.wallets[0],
            &ExecutionOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(h.rpc.submission_count(), 0);
    }

    #[tokio::test]
    async fn creation_resolves_address_from_receipt() {
        let h = harness(1).await;
        let token = Address::repeat_byte(0x70);
        h.rpc.set_pending_contract_address(token);

        let outcome = submit_token_creation(
            &h.executor,
            &h.config,
            &context("0.1"),
            h.wallets[0],
            &ExecutionOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.token_address, token);
        assert!(outcome.receipt.status.is_success());
    }

    #[tokio::test]
    async fn creation_falls_back_to_api_address() {
        let h = harness(1).await;
        let hinted = Address::repeat_byte(0x71);
        let mut ctx = context("0.1");
        ctx.token_address = Some(hinted);

        let outcome = submit_token_creation(
            &h.executor,
            &h.config,
            &ctx,
            h.wallets[0],
            &ExecutionOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.token_address, hinted);
    }

    #[tokio::test]
    async fn creation_surfaces_reverts() {
        let h = harness(1).await;
        h.rpc.revert_next_submission();

        let err = submit_token_creation(
            &h.executor,
            &h.config,
            &context("0.1"),
            h.wallets[0],
            &ExecutionOptions {
                max_retries: 0,
                priority: Priority::High,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
    }

    #[tokio::test]
    async fn purchase_targets_respect_activity_and_exclusion() {
        let h = harness(3).await;
        let token = Address::repeat_byte(0x70);
        let buy = context("0.1").buy;

        let (all, intents) = purchase_targets(&h.registry, token, buy.as_ref(), None);
        assert_eq!(all, h.wallets);
        assert!(intents.iter().all(|i| i.to == Some(token)));

        let (rest, _) =
            purchase_targets(&h.registry, token, buy.as_ref(), Some(h.wallets[0]));
        assert_eq!(rest, h.wallets[1..].to_vec());

        h.registry.set_active(&h.wallets[1], false);
        let (active, _) = purchase_targets(&h.registry, token, buy.as_ref(), None);
        assert_eq!(active, vec![h.wallets[0], h.wallets[2]]);

        let (none, _) = purchase_targets(&h.registry, token, None, None);
        assert!(none.is_empty());
    }
}
