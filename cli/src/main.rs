//! Four Meme CLI - Main entry point
//!
//! Creates tokens on four.meme and coordinates multi-wallet purchases
//! through one of the launch strategies.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use fourmeme_core::{
    config::parse_native_amount, BuyOptions, Countermeasure, CreateTokenOptions, LauncherConfig,
    StrategyOverrides, StrategySelection, TokenMetadata,
};
use fourmeme_engine::Engine;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fourmeme", version, about = "Create and buy tokens on four.meme")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a token and run the configured launch strategy
    CreateToken {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 18)]
        decimals: u8,
        #[arg(long, default_value = "1000000000")]
        total_supply: String,
        #[arg(long, default_value = "Created with Four Meme CLI")]
        description: String,
        #[arg(long)]
        telegram: Option<String>,
        #[arg(long)]
        twitter: Option<String>,
        #[arg(long)]
        website: Option<String>,
        /// Logo image to upload
        #[arg(long, conflicts_with = "logo_url")]
        image: Option<PathBuf>,
        /// Already-uploaded logo URL
        #[arg(long)]
        logo_url: Option<String>,
        /// Launch strategy: bundle, staggered, or anti-sniper
        #[arg(long)]
        strategy: Option<String>,
        /// Per-wallet buy amount in BNB
        #[arg(long, default_value = "0.1")]
        buy_amount: String,
        /// Skip wallet purchases entirely
        #[arg(long)]
        no_buy: bool,
        /// Gas multiplier override for the selected strategy
        #[arg(long)]
        gas_multiplier: Option<f64>,
        /// Retry attempts per failed dispatch
        #[arg(long)]
        max_retries: Option<u32>,
        /// Delay between staggered purchases, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Wait for each staggered purchase to confirm
        #[arg(long)]
        wait_for_confirmation: Option<bool>,
        /// Anti-sniper monitoring window, in milliseconds
        #[arg(long)]
        monitor_ms: Option<u64>,
        /// External buyers needed to trigger countermeasures
        #[arg(long)]
        trigger_threshold: Option<usize>,
        /// Countermeasure: none, delay, abort, or dump
        #[arg(long)]
        countermeasure: Option<Countermeasure>,
    },
    /// Buy an existing token from the configured buyer wallets
    BuyToken {
        /// Token contract address
        #[arg(long)]
        token: Address,
        /// Per-wallet buy amount in BNB
        #[arg(long, default_value = "0.1")]
        buy_amount: String,
    },
    /// Show the configured wallets and their balances
    Balances,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fourmeme_cli=info,fourmeme_engine=info,fourmeme_chain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = LauncherConfig::from_env()?;
    let engine = Engine::new(config);

    match cli.command {
        Commands::CreateToken {
            name,
            symbol,
            decimals,
            total_supply,
            description,
            telegram,
            twitter,
            website,
            image,
            logo_url,
            strategy,
            buy_amount,
            no_buy,
            gas_multiplier,
            max_retries,
            delay_ms,
            wait_for_confirmation,
            monitor_ms,
            trigger_threshold,
            countermeasure,
        } => {
            engine.initialize().await?;

            let buy = if no_buy {
                None
            } else {
                Some(BuyOptions {
                    enabled: true,
                    buy_amount: parse_native_amount(&buy_amount)?,
                })
            };

            let strategy = strategy.map(|kind| StrategySelection {
                kind,
                overrides: StrategyOverrides {
                    gas_multiplier,
                    max_retries,
                    delay_between_transactions_ms: delay_ms,
                    wait_for_confirmation,
                    monitor_duration_ms: monitor_ms,
                    trigger_threshold,
                    countermeasure,
                    ..Default::default()
                },
            });

            let options = CreateTokenOptions {
                metadata: TokenMetadata {
                    name,
                    symbol,
                    decimals,
                    total_supply,
                    description,
                    telegram,
                    twitter,
                    website,
                },
                image_path: image,
                logo_url,
                buy,
                strategy,
            };

            let address = engine.create_token(options).await?;
            println!("Token launched at {address}");
        }
        Commands::BuyToken { token, buy_amount } => {
            engine.initialize().await?;
            let buy = BuyOptions {
                enabled: true,
                buy_amount: parse_native_amount(&buy_amount)?,
            };
            engine.buy_tokens(token, &buy).await?;
            println!("Purchases dispatched for {token}");
        }
        Commands::Balances => {
            engine.initialize().await?;
            let balances = engine.registry().refresh_balances().await;
            for address in engine.registry().addresses() {
                let account = engine.registry().account(&address);
                let label = account.map(|a| a.label).unwrap_or_default();
                match balances.get(&address) {
                    Some(balance) => println!("{address}  {label}  {balance} wei"),
                    None => println!("{address}  {label}  (balance unavailable)"),
                }
            }
        }
    }

    Ok(())
}
