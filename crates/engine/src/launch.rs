//! Launch orchestration
//!
//! Ties the pieces together: authenticates with four.meme, uploads the
//! logo, creates the token record, and drives the selected strategy
//! against the wallet registry. Cleanup on the strategy runs in every
//! path, success or failure.

use crate::factory::StrategyFactory;
use crate::strategies::StrategyKind;
use alloy::primitives::{Address, Bytes};
use fourmeme_chain::{BatchExecutor, EvmRpc, HttpRpc, TxDispatcher, WalletRegistry};
use fourmeme_core::{
    BuyOptions, CreateTokenOptions, Error, ExecutionOptions, LaunchContext, LauncherConfig,
    Result, TokenCreateRequest, TransactionIntent,
};
use fourmeme_networking::MemeApiClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Top-level launcher engine
pub struct Engine {
    api: MemeApiClient,
    registry: Arc<WalletRegistry>,
    executor: Arc<BatchExecutor>,
    factory: StrategyFactory,
    config: Arc<LauncherConfig>,
}

impl Engine {
    pub fn new(config: LauncherConfig) -> Self {
        let config = Arc::new(config);
        let rpc: Arc<dyn EvmRpc> = Arc::new(HttpRpc::new(config.rpc_url.clone()));
        let registry = Arc::new(WalletRegistry::new(rpc.clone()));
        let mut dispatcher = TxDispatcher::new(rpc.clone(), registry.clone(), config.chain_id);
        if let Some(timeout) = config.confirmation_timeout {
            dispatcher = dispatcher.with_confirmation_timeout(timeout);
        }
        let executor = Arc::new(BatchExecutor::new(Arc::new(dispatcher)));
        let factory = StrategyFactory::new(
            registry.clone(),
            executor.clone(),
            rpc,
            config.clone(),
        );
        let api = MemeApiClient::new(config.api_base_url.clone());

        Self {
            api,
            registry,
            executor,
            factory,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<WalletRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &StrategyFactory {
        &self.factory
    }

    /// Register the configured wallets and authenticate with four.meme.
    ///
    /// The primary wallet is registered first (priority 0) and signs the
    /// login nonce; buyer wallets follow in configuration order.
    pub async fn initialize(&self) -> Result<()> {
        let primary = self
            .registry
            .add_account(&self.config.primary_wallet_key, Some("primary"))
            .await?;

        for (i, key) in self.config.buyer_wallet_keys.iter().enumerate() {
            let label = format!("buyer-{}", i + 1);
            self.registry.add_account(key, Some(&label)).await?;
        }

        let signer = self
            .registry
            .signer(&primary)
            .ok_or_else(|| Error::AccountInit(format!("no signer for {primary}")))?;
        self.api.login(&signer).await?;

        let user = self.api.user_info().await?;
        info!("Authenticated as: {}", user.address);
        Ok(())
    }

    /// Create a token on four.meme and run the configured launch strategy.
    ///
    /// Returns the deployed token contract address.
    pub async fn create_token(&self, options: CreateTokenOptions) -> Result<Address> {
        let logo_url = match &options.logo_url {
            Some(url) => url.clone(),
            None => {
                let path = options.image_path.as_deref().ok_or_else(|| {
                    Error::InvalidData("either a logo URL or an image path is required".into())
                })?;
                let url = self.api.upload_image(path).await?;
                info!("Image uploaded successfully: {url}");
                url
            }
        };

        let request = TokenCreateRequest {
            token_name: options.metadata.name.clone(),
            token_symbol: options.metadata.symbol.clone(),
            decimals: options.metadata.decimals,
            total_supply: options.metadata.total_supply.clone(),
            description: options.metadata.description.clone(),
            tg_link: options.metadata.telegram.clone(),
            x_link: options.metadata.twitter.clone(),
            website_link: options.metadata.website.clone(),
            logo_url,
        };

        let created = self.api.create_token(&request).await?;
        info!("Token created with ID: {}", created.token_id);

        let create_arg: Bytes = created
            .create_arg
            .parse()
            .map_err(|e| Error::InvalidData(format!("createArg: {e}")))?;
        let signature: Bytes = created
            .signature
            .parse()
            .map_err(|e| Error::InvalidData(format!("signature: {e}")))?;
        let token_address_hint = match &created.token_address {
            Some(raw) => Some(
                raw.parse::<Address>()
                    .map_err(|e| Error::InvalidData(format!("tokenAddress: {e}")))?,
            ),
            None => None,
        };

        let context = LaunchContext {
            metadata: options.metadata.clone(),
            create_arg,
            signature,
            token_address: token_address_hint,
            buy: options.buy.clone(),
        };

        // Preflight: the creator wallet must cover the creation fee
        if let Some(primary) = self.registry.primary_address() {
            let sufficient = self
                .registry
                .has_sufficient_balance(primary, self.config.create_token_fee)
                .await?;
            if !sufficient {
                return Err(Error::InsufficientBalance {
                    address: primary.to_string(),
                    required: self.config.create_token_fee.to_string(),
                    available: self
                        .registry
                        .account(&primary)
                        .map(|a| a.balance.to_string())
                        .unwrap_or_default(),
                });
            }
        }

        let token_address = match &options.strategy {
            Some(selection) => {
                let kind: StrategyKind = selection.kind.parse()?;
                let strategy = self
                    .factory
                    .create_strategy(kind, Some(&selection.overrides))?;

                let result = strategy.execute(&context).await;
                // Cleanup runs whether the launch succeeded or not
                strategy.cleanup();

                match result {
                    Ok(address) => address,
                    Err(err) => {
                        if let Some(hint) = context.token_address {
                            warn!("launch failed but the token was created at {hint}");
                        }
                        return Err(err);
                    }
                }
            }
            None => match context.token_address {
                Some(address) => address,
                None => {
                    info!("Waiting for token contract address...");
                    let raw = self.api.wait_for_token_address(created.token_id).await?;
                    raw.parse::<Address>()
                        .map_err(|e| Error::InvalidData(format!("tokenAddress: {e}")))?
                }
            },
        };

        info!("Token contract deployed at: {token_address}");
        Ok(token_address)
    }

    /// Direct multi-wallet buy path, outside any strategy.
    ///
    /// Failures are logged per wallet and do not abort the remaining
    /// purchases.
    pub async fn buy_tokens(&self, token_address: Address, buy: &BuyOptions) -> Result<()> {
        if !buy.enabled {
            info!("Buying disabled");
            return Ok(());
        }

        if !self
            .executor
            .dispatcher()
            .is_contract_deployed(token_address)
            .await?
        {
            return Err(Error::InvalidData(format!(
                "no contract deployed at {token_address}"
            )));
        }

        let primary = self.registry.primary_address();
        let buyers: Vec<Address> = self
            .registry
            .active_addresses()
            .into_iter()
            .filter(|address| Some(*address) != primary)
            .collect();

        if buyers.is_empty() {
            info!("No buyer wallets configured");
            return Ok(());
        }

        let options = ExecutionOptions {
            gas_multiplier: self.config.default_gas_multiplier,
            ..Default::default()
        };

        for address in buyers {
            let intent = TransactionIntent::transfer(token_address, buy.buy_amount);
            match self
                .executor
                .dispatch_with_retry(address, &intent, &options)
                .await
            {
                Ok(hash) => info!(%address, %hash, "bought tokens"),
                Err(e) => error!(%address, "failed to buy tokens: {e}"),
            }
        }

        Ok(())
    }
}
