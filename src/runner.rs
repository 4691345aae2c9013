//! Liquidation control loop
//!
//! One iteration (`run_cycle`) reads the balance and, at or above the
//! threshold, resolves a route, prices gas, builds, vets and submits a swap.
//! `next_delay` decides how long to wait before the following iteration, and
//! `run` drives the two until cancelled.
//!
//! The loop is strictly sequential: a swap is awaited to completion inside its
//! cycle, so a second attempt can never start while one is in flight, and the
//! balance reset after a confirmed swap happens before the next balance read.

use crate::clients::{
    BalanceSource, EtherscanBalanceClient, EtherscanClient, EtherscanGasClient, GasOracle,
    RequestPacer,
};
use crate::config::{Config, Credentials, RpcConfig};
use crate::interceptors::{
    AuditLogInterceptor, GasCeilingInterceptor, InterceptorDecision, SlippageGuardInterceptor,
    SwapContext, SwapInterceptor,
};
use crate::state::{AccountBalanceState, AgentState, Cooldown};
use crate::swap::{RouteResolver, SlippageTolerance, UniswapV2RouteResolver};
use crate::tokens::parse_units;
use crate::wallet::{
    ChainSubmitter, DryRunExecutor, SecureWallet, SwapExecutor, SwapReceipt,
    SwapTransactionBuilder, TransactionSimulator,
};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fixed parameters of the liquidation strategy
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub input_asset: Address,
    pub output_asset: Address,
    pub trigger_amount: Decimal,
    pub sell_amount: Decimal,
    /// `sell_amount` in raw token units
    pub sell_amount_raw: U256,
    pub slippage: SlippageTolerance,
    pub poll_interval: Duration,
    pub cooldown: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let sell_amount = config.threshold.fixed_sell_amount;
        Ok(Self {
            input_asset: config.assets.token,
            output_asset: config.assets.output_token,
            trigger_amount: config.threshold.trigger_amount,
            sell_amount,
            sell_amount_raw: parse_units(sell_amount, config.assets.token_decimals)?,
            slippage: SlippageTolerance::from_bps(config.risk.slippage_bps)?,
            poll_interval: config.timing.poll_interval(),
            cooldown: config.timing.cooldown(),
        })
    }
}

/// What a single iteration did
#[derive(Debug)]
pub enum CycleOutcome {
    /// Still inside the post-trade pause; nothing was queried
    CoolingDown { remaining: Duration },
    /// Balance could not be read; threshold check skipped
    BalanceUnavailable { reason: String },
    BelowThreshold { balance: Decimal },
    /// Attempt abandoned before anything was broadcast
    SwapAborted { balance: Decimal, reason: String },
    SwapFailed { balance: Decimal, reason: String },
    SwapConfirmed { balance: Decimal, receipt: SwapReceipt },
}

/// The threshold-triggered liquidation agent
pub struct LiquidationAgent {
    settings: AgentSettings,
    balance_source: Arc<dyn BalanceSource>,
    gas_oracle: Arc<dyn GasOracle>,
    route_resolver: Arc<dyn RouteResolver>,
    builder: SwapTransactionBuilder,
    executor: Arc<dyn SwapExecutor>,
    interceptors: Vec<Arc<dyn SwapInterceptor>>,
    balance: AccountBalanceState,
    state: AgentState,
    cooldown: Cooldown,
    swap_attempts: u64,
}

impl LiquidationAgent {
    pub fn new(
        settings: AgentSettings,
        balance_source: Arc<dyn BalanceSource>,
        gas_oracle: Arc<dyn GasOracle>,
        route_resolver: Arc<dyn RouteResolver>,
        builder: SwapTransactionBuilder,
        executor: Arc<dyn SwapExecutor>,
    ) -> Self {
        let cooldown = Cooldown::new(settings.cooldown);
        Self {
            settings,
            balance_source,
            gas_oracle,
            route_resolver,
            builder,
            executor,
            interceptors: Vec::new(),
            balance: AccountBalanceState::default(),
            state: AgentState::Idle,
            cooldown,
            swap_attempts: 0,
        }
    }

    /// Add a swap interceptor; interceptors run in insertion order
    pub fn with_interceptor(mut self, interceptor: Arc<dyn SwapInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Wire the agent to live services from configuration
    ///
    /// In dry-run mode the signing key is optional and nothing is broadcast.
    pub fn from_config(
        config: &Config,
        credentials: &Credentials,
        rpc: &RpcConfig,
        dry_run: bool,
    ) -> Result<Self> {
        let settings = AgentSettings::from_config(config)?;
        let rpc_url = rpc.url()?;

        let pacer = Arc::new(RequestPacer::new(config.timing.request_pacing()));
        debug!(
            min_spacing_ms = pacer.min_spacing().as_millis() as u64,
            "Pacing upstream API calls"
        );
        let api = Arc::new(EtherscanClient::new(
            config.etherscan_api_url.clone(),
            credentials.etherscan_api_key.clone(),
            config.chain_id,
            config.timing.http_timeout(),
            pacer,
        )?);

        let balance_source = Arc::new(EtherscanBalanceClient::new(
            api.clone(),
            config.assets.token,
            config.assets.watched_account,
            config.assets.token_decimals,
        ));
        let gas_oracle = Arc::new(EtherscanGasClient::new(api));
        let route_resolver = Arc::new(UniswapV2RouteResolver::new(
            rpc_url.clone(),
            config.dex.factory,
            config.timing.rpc_timeout(),
        ));

        let wallet = match &credentials.signing_key {
            Some(key) => Some(Arc::new(SecureWallet::from_secret(key)?)),
            None if dry_run => {
                warn!("No signing key set - dry run will use the watched account as recipient");
                None
            }
            None => {
                return Err(Error::Config(
                    "WALLET_PRIVATE_KEY is required unless running with --dry-run".into(),
                ))
            }
        };
        let sender = wallet
            .as_ref()
            .map(|w| w.address())
            .unwrap_or(config.assets.watched_account);

        let simulator = config
            .simulate_before_send
            .then(|| TransactionSimulator::new(rpc_url.clone(), config.timing.rpc_timeout()));

        let executor: Arc<dyn SwapExecutor> = match (dry_run, wallet) {
            (false, Some(wallet)) => {
                info!(address = %wallet.address(), "Loaded signing wallet");
                let mut submitter = ChainSubmitter::new(
                    rpc_url,
                    wallet,
                    config.timing.rpc_timeout(),
                    config.timing.confirmation_timeout(),
                );
                if let Some(simulator) = simulator {
                    submitter = submitter.with_simulator(simulator);
                }
                Arc::new(submitter)
            }
            _ => {
                let mut executor = DryRunExecutor::new(sender);
                if let Some(simulator) = simulator {
                    executor = executor.with_simulator(simulator);
                }
                Arc::new(executor)
            }
        };

        let mut builder = SwapTransactionBuilder::new(
            config.dex.router,
            sender,
            config.gas_limit,
            config.timing.deadline_window(),
            config.chain_id,
        );
        if !config.dex.receive_native {
            builder = builder.with_wrapped_output();
        }
        info!(
            recipient = %builder.recipient(),
            receive_native = config.dex.receive_native,
            dry_run,
            "Swap builder ready"
        );

        let mut agent = Self::new(
            settings,
            balance_source,
            gas_oracle,
            route_resolver,
            builder,
            executor,
        )
        .with_interceptor(Arc::new(SlippageGuardInterceptor::new(
            config.risk.max_slippage_bps,
        )));

        if let Some(ceiling) = config.risk.max_gas_price_gwei {
            agent = agent.with_interceptor(Arc::new(GasCeilingInterceptor::new(ceiling)));
            info!(max_gas_price_gwei = %ceiling, "Added gas ceiling interceptor");
        }
        if let Some(audit_path) = &config.audit_log_path {
            agent = agent.with_interceptor(Arc::new(AuditLogInterceptor::new(audit_path)));
            info!(audit_path = %audit_path, "Added audit log interceptor");
        }

        Ok(agent)
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn balance(&self) -> &AccountBalanceState {
        &self.balance
    }

    pub fn swap_attempts(&self) -> u64 {
        self.swap_attempts
    }

    /// Run one iteration of the loop
    ///
    /// Never returns an error: every failure is folded into the outcome so
    /// the caller can keep looping.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.state == AgentState::CoolingDown {
            if self.cooldown.is_active() {
                return CycleOutcome::CoolingDown {
                    remaining: self.cooldown.remaining(),
                };
            }
            self.state = AgentState::Idle;
        }

        let balance = match self.balance_source.fetch_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                // Unknown for this cycle: keep the previous reading, skip the check
                return CycleOutcome::BalanceUnavailable {
                    reason: e.to_string(),
                };
            }
        };
        self.balance.record(balance, Utc::now());

        if balance < self.settings.trigger_amount {
            return CycleOutcome::BelowThreshold { balance };
        }

        info!(
            balance = %balance,
            threshold = %self.settings.trigger_amount,
            sell_amount = %self.settings.sell_amount,
            "Balance reached threshold, attempting swap"
        );

        self.swap_attempts += 1;
        match self.attempt_swap().await {
            Ok(receipt) => {
                self.balance.reset(Utc::now());
                self.state = AgentState::CoolingDown;
                self.cooldown.start();
                CycleOutcome::SwapConfirmed { balance, receipt }
            }
            Err(Error::SwapFailed(reason)) => {
                self.state = AgentState::Idle;
                CycleOutcome::SwapFailed { balance, reason }
            }
            Err(e) => {
                self.state = AgentState::Idle;
                CycleOutcome::SwapAborted {
                    balance,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn attempt_swap(&mut self) -> Result<SwapReceipt> {
        let attempt_id = Uuid::new_v4();

        let route = self
            .route_resolver
            .resolve(self.settings.input_asset, self.settings.output_asset)
            .await?;
        let quote = route.quote(self.settings.sell_amount_raw, self.settings.slippage)?;
        let gas = self.gas_oracle.suggested_gas_price().await?;
        let transaction = self.builder.build(&route.path(), &quote, &gas, Utc::now())?;

        let context = SwapContext {
            attempt_id,
            gas,
            transaction,
        };

        for interceptor in &self.interceptors {
            if let InterceptorDecision::Block(reason) = interceptor.before_swap(&context).await? {
                return Err(Error::Blocked(reason));
            }
        }

        info!(
            attempt_id = %attempt_id,
            pair = %route.pair,
            amount_in = %quote.amount_in,
            expected_out = %quote.expected_out,
            amount_out_min = %quote.amount_out_minimum,
            gas_price_gwei = %gas.suggested_price_gwei,
            deadline = context.transaction.deadline,
            "Submitting swap"
        );

        self.state = AgentState::SwapPending;
        let outcome = self.executor.execute(&context.transaction).await;

        for interceptor in &self.interceptors {
            interceptor.on_swap_complete(&context, &outcome).await;
        }

        outcome
    }

    /// How long to wait after `outcome` before the next iteration
    pub fn next_delay(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::SwapConfirmed { .. } => self.cooldown.duration(),
            CycleOutcome::CoolingDown { remaining } => *remaining,
            _ => self.settings.poll_interval,
        }
    }

    /// Drive the loop until `shutdown` is cancelled
    ///
    /// Cancellation is observed between iterations and during the wait; a
    /// cycle that has already submitted a swap runs to completion first.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            threshold = %self.settings.trigger_amount,
            sell_amount = %self.settings.sell_amount,
            slippage_bps = self.settings.slippage.bps(),
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            cooldown_secs = self.settings.cooldown.as_secs(),
            "Starting liquidation loop"
        );

        while !shutdown.is_cancelled() {
            let outcome = self.run_cycle().await;
            log_outcome(&outcome);

            let delay = self.next_delay(&outcome);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(
            swap_attempts = self.swap_attempts,
            balance = %self.balance.amount(),
            "Liquidation loop stopped"
        );
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::CoolingDown { remaining } => {
            debug!(remaining_ms = remaining.as_millis() as u64, "Cooling down")
        }
        CycleOutcome::BalanceUnavailable { reason } => {
            warn!(reason = %reason, "Balance unavailable, skipping threshold check")
        }
        CycleOutcome::BelowThreshold { balance } => {
            debug!(balance = %balance, "Balance below threshold")
        }
        CycleOutcome::SwapAborted { balance, reason } => {
            warn!(balance = %balance, reason = %reason, "Swap attempt aborted")
        }
        CycleOutcome::SwapFailed { balance, reason } => {
            error!(balance = %balance, reason = %reason, "Swap failed, balance kept")
        }
        CycleOutcome::SwapConfirmed { balance, receipt } => info!(
            balance = %balance,
            tx_hash = %receipt.tx_hash,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            dry_run = receipt.dry_run,
            "Swap confirmed, balance reset"
        ),
    }
}
