//! Tax Liquidator CLI
//!
//! Command-line interface for running the liquidation agent and for one-shot
//! inspection of the data it acts on.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tax_liquidator::clients::{
    BalanceSource, EtherscanBalanceClient, EtherscanClient, EtherscanGasClient, GasOracle,
    RequestPacer,
};
use tax_liquidator::swap::{RouteResolver, SlippageTolerance, UniswapV2RouteResolver};
use tax_liquidator::tokens::{format_units, parse_units};
use tax_liquidator::{Config, Credentials, LiquidationAgent, Result, RpcConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "liquidator")]
#[command(about = "Threshold-triggered token liquidation agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the liquidation loop until interrupted
    Run {
        /// Dry run - build and preflight swaps but never broadcast them
        #[arg(long)]
        dry_run: bool,
    },

    /// Query the watched account's token balance once
    Balance,

    /// Query the gas oracle once
    Gas,

    /// Resolve the swap route and quote the configured sell amount
    Quote,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(cli.json_logs.then(|| fmt::layer().json()))
        .with((!cli.json_logs).then(fmt::layer))
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { dry_run } => run_agent(config, dry_run).await?,
        Commands::Balance => run_balance(config).await?,
        Commands::Gas => run_gas(config).await?,
        Commands::Quote => run_quote(config).await?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

async fn run_agent(config: Config, dry_run: bool) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let rpc = RpcConfig::from_env(config.chain_id)?;

    tracing::info!(
        chain_id = config.chain_id,
        token = %config.assets.token,
        watched_account = %config.assets.watched_account,
        router = %config.dex.router,
        rpc_source = ?rpc.source(),
        dry_run = dry_run,
        "Starting liquidation agent"
    );

    let mut agent = LiquidationAgent::from_config(&config, &credentials, &rpc, dry_run)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, finishing current cycle");
            signal.cancel();
        }
    });

    agent.run(shutdown).await;
    Ok(())
}

fn etherscan(config: &Config, credentials: &Credentials) -> Result<Arc<EtherscanClient>> {
    Ok(Arc::new(EtherscanClient::new(
        config.etherscan_api_url.clone(),
        credentials.etherscan_api_key.clone(),
        config.chain_id,
        config.timing.http_timeout(),
        Arc::new(RequestPacer::disabled()),
    )?))
}

async fn run_balance(config: Config) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let client = EtherscanBalanceClient::new(
        etherscan(&config, &credentials)?,
        config.assets.token,
        config.assets.watched_account,
        config.assets.token_decimals,
    );

    let balance = client.fetch_balance().await?;
    let output = serde_json::json!({
        "account": config.assets.watched_account,
        "token": config.assets.token,
        "balance": balance,
        "threshold": config.threshold.trigger_amount,
        "at_or_above_threshold": balance >= config.threshold.trigger_amount,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_gas(config: Config) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let oracle = EtherscanGasClient::new(etherscan(&config, &credentials)?);

    let gas = oracle.suggested_gas_price().await?;
    let output = serde_json::json!({
        "suggested_price_gwei": gas.suggested_price_gwei,
        "suggested_price_wei": gas.price_wei()?.to_string(),
        "gas_limit": config.gas_limit,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_quote(config: Config) -> Result<()> {
    let rpc = RpcConfig::from_env(config.chain_id)?;
    let resolver =
        UniswapV2RouteResolver::new(rpc.url()?, config.dex.factory, config.timing.rpc_timeout());
    let route = resolver
        .resolve(config.assets.token, config.assets.output_token)
        .await?;

    let amount_in = parse_units(config.threshold.fixed_sell_amount, config.assets.token_decimals)?;
    let slippage = SlippageTolerance::from_bps(config.risk.slippage_bps)?;
    let quote = route.quote(amount_in, slippage)?;

    let output = serde_json::json!({
        "route": route,
        "quote": quote,
        "expected_out": format_units(quote.expected_out, config.assets.output_decimals as u32),
        "amount_out_minimum": format_units(
            quote.amount_out_minimum,
            config.assets.output_decimals as u32
        ),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
