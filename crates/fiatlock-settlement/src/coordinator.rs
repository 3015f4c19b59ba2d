//! # Settlement coordinator
//!
//! Orchestrates the order and trade lifecycle:
//!
//! ```text
//! create_order ──▶ Order (tokens pulled into pool custody)
//!                    │ fill_order: reserve token_amount + fee
//!                    ▼
//!                  Trade PENDING ──submit_proof (valid, in window)──▶ SETTLED
//!                    │                 tokens → buyer, fee → treasury
//!                    └──expire (window closed)──▶ EXPIRED
//!                                      full reservation → order
//! ```
//!
//! Every mutating operation runs as one [`Ledger::atomically`] transaction
//! in three steps: ledger writes, then the snapshot save, then the custody
//! transfer. A failure at any step rolls every ledger row back. A save that
//! fails means no tokens moved; a transfer that fails after the save puts
//! the prior snapshot back. An `Err` from a mutating operation means the
//! operation did not happen.
//!
//! The coordinator is single-threaded; share it as a [`SharedCoordinator`]
//! so concurrent callers are serialized and exactly one of two racing
//! `submit_proof` / `expire` calls sees the trade as PENDING.

use std::sync::{Arc, Mutex};

use fiatlock_fees::{FeeCalculator, StaticFeeCalculator, validate_fiat_amount};
use fiatlock_ledger::{Custody, Ledger, Txn};
use fiatlock_types::{
    AccountLinesHash, Address, EngineConfig, EngineEvent, FiatlockError, Order, OrderId,
    PaymentRail, Result, Trade, TradeId, TradeStatus, TxIdHash,
};

use crate::{
    Clock, FillQuote, GuardedOperation, PauseGuard, SupplyConservation, Verifier, VerifierRegistry,
    store::{EngineSnapshot, SNAPSHOT_VERSION, SnapshotStore},
};

/// A coordinator behind a mutex, for concurrent callers.
pub type SharedCoordinator = Arc<Mutex<SettlementCoordinator>>;

/// Parameters of a new sell order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub seller: Address,
    pub token: Address,
    /// Tokens to lock, in the token's smallest unit.
    pub total_amount: u128,
    /// Fiat cents per whole token.
    pub exchange_rate: u64,
    pub rail: PaymentRail,
    pub account_lines_hash: AccountLinesHash,
    pub is_public: bool,
}

/// A token movement through pool custody, with its supply accounting.
#[derive(Debug, Clone, Copy)]
enum Flow {
    Deposit {
        from: Address,
        token: Address,
        amount: u128,
    },
    SellerWithdrawal {
        to: Address,
        token: Address,
        amount: u128,
    },
    Payout {
        to: Address,
        token: Address,
        amount: u128,
    },
    FeeWithdrawal {
        to: Address,
        token: Address,
        amount: u128,
    },
}

impl Flow {
    fn record(self, supply: &mut SupplyConservation) {
        match self {
            Self::Deposit { token, amount, .. } => supply.record_deposit(token, amount),
            Self::SellerWithdrawal { token, amount, .. } => {
                supply.record_seller_withdrawal(token, amount);
            }
            Self::Payout { token, amount, .. } => supply.record_payout(token, amount),
            Self::FeeWithdrawal { token, amount, .. } => {
                supply.record_fee_withdrawal(token, amount);
            }
        }
    }

    fn execute(self, custody: &mut Custody) -> Result<()> {
        match self {
            Self::Deposit {
                from,
                token,
                amount,
            } => custody.transfer_in(&from, &token, amount),
            Self::SellerWithdrawal { to, token, amount }
            | Self::Payout { to, token, amount }
            | Self::FeeWithdrawal { to, token, amount } => custody.transfer_out(&to, &token, amount),
        }
    }
}

/// The settlement engine.
pub struct SettlementCoordinator {
    pub(crate) config: EngineConfig,
    pub(crate) ledger: Ledger,
    pub(crate) custody: Custody,
    pub(crate) verifiers: VerifierRegistry,
    pub(crate) fees: Arc<dyn FeeCalculator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) pause: PauseGuard,
    pub(crate) supply: SupplyConservation,
    pub(crate) events: Vec<EngineEvent>,
    pub(crate) store: Option<Box<dyn SnapshotStore>>,
}

impl SettlementCoordinator {
    /// Build an empty engine.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is inconsistent or its pool
    /// differs from the custody pool.
    pub fn new(config: EngineConfig, custody: Custody, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        if config.pool != custody.pool() {
            return Err(FiatlockError::Configuration(format!(
                "config pool {} does not match custody pool {}",
                config.pool,
                custody.pool()
            )));
        }
        Ok(Self {
            config,
            ledger: Ledger::new(),
            custody,
            verifiers: VerifierRegistry::new(),
            fees: Arc::new(StaticFeeCalculator::default()),
            clock,
            pause: PauseGuard::new(),
            supply: SupplyConservation::new(),
            events: Vec::new(),
            store: None,
        })
    }

    #[must_use]
    pub fn with_fee_calculator(mut self, fees: Arc<dyn FeeCalculator>) -> Self {
        self.fees = fees;
        self
    }

    #[must_use]
    pub fn with_verifier(mut self, rail: PaymentRail, verifier: Arc<dyn Verifier>) -> Self {
        self.verifiers.register(rail, verifier);
        self
    }

    /// Attach a snapshot store, restoring the engine from it if it holds a
    /// snapshot.
    ///
    /// # Errors
    /// Propagates load failures and snapshot consistency errors, and
    /// returns `Configuration` if the snapshot was taken for another pool.
    pub fn with_store(mut self, store: Box<dyn SnapshotStore>) -> Result<Self> {
        if let Some(snapshot) = store.load()? {
            if snapshot.config.pool != self.custody.pool() {
                return Err(FiatlockError::Configuration(format!(
                    "snapshot pool {} does not match custody pool {}",
                    snapshot.config.pool,
                    self.custody.pool()
                )));
            }
            self.ledger = Ledger::restore(snapshot.ledger)?;
            self.supply = snapshot.supply;
            self.pause.set_paused(snapshot.paused);
            self.config = snapshot.config;
            tracing::info!(
                orders = self.ledger.orders().len(),
                trades = self.ledger.trades().len(),
                sequence = self.ledger.sequence(),
                paused = snapshot.paused,
                "engine restored from snapshot"
            );
        }
        self.store = Some(store);
        Ok(self)
    }

    #[must_use]
    pub fn into_shared(self) -> SharedCoordinator {
        Arc::new(Mutex::new(self))
    }

    // =====================================================================
    // Orders
    // =====================================================================

    /// Lock `total_amount` tokens from the seller into a new order.
    ///
    /// # Errors
    /// - `Paused` while the engine is paused
    /// - `InvalidOrder` for a zero amount or rate
    /// - `InvalidCommitment` for a zero account commitment
    /// - `VerifierNotConfigured` if the rail has no verifier
    /// - `UnsupportedToken` if the token's decimals are unknown
    /// - `TransferFailed` if custody could not pull the tokens
    pub fn create_order(&mut self, req: NewOrder) -> Result<OrderId> {
        self.pause.check(GuardedOperation::CreateOrder)?;
        if req.total_amount == 0 {
            return Err(FiatlockError::InvalidOrder {
                reason: "total amount must be positive".into(),
            });
        }
        if req.exchange_rate == 0 {
            return Err(FiatlockError::InvalidOrder {
                reason: "exchange rate must be positive".into(),
            });
        }
        if req.account_lines_hash.is_zero() {
            return Err(FiatlockError::InvalidCommitment);
        }
        if !self.verifiers.contains(req.rail) {
            return Err(FiatlockError::VerifierNotConfigured(req.rail));
        }
        let token = self
            .config
            .token(&req.token)
            .cloned()
            .ok_or(FiatlockError::UnsupportedToken(req.token))?;
        token.unit()?;

        let now = self.clock.now();
        let order_id = self.transact(|tx| {
            let sequence = tx.next_sequence();
            let id = OrderId::derive(
                &req.seller,
                &token.address,
                req.total_amount,
                req.exchange_rate,
                now.timestamp(),
                sequence,
            );
            tx.insert_order(Order {
                id,
                seller: req.seller,
                token: token.clone(),
                total_amount: req.total_amount,
                remaining_amount: req.total_amount,
                exchange_rate: req.exchange_rate,
                rail: req.rail,
                account_lines_hash: req.account_lines_hash,
                is_public: req.is_public,
                private_code: (!req.is_public).then(|| Order::private_code_for(&id)),
                created_at: now,
            })?;
            let deposit = Flow::Deposit {
                from: req.seller,
                token: token.address,
                amount: req.total_amount,
            };
            Ok((id, Some(deposit)))
        })?;

        tracing::info!(
            order = %order_id,
            seller = %req.seller,
            token = %token,
            amount = req.total_amount,
            rate = req.exchange_rate,
            rail = %req.rail,
            public = req.is_public,
            "order created"
        );
        self.record(EngineEvent::OrderCreated {
            order_id,
            seller: req.seller,
            token: token.address,
            amount: req.total_amount,
            exchange_rate: req.exchange_rate,
            rail: req.rail,
            is_public: req.is_public,
        });
        Ok(order_id)
    }

    /// Return `amount` unreserved tokens to the seller.
    ///
    /// Never blocked by pause. Returns the order's new remaining amount.
    ///
    /// # Errors
    /// - `OrderNotFound`, `NotAuthorized` (caller is not the seller)
    /// - `InvalidOrder` for a zero amount
    /// - `InsufficientRemaining` if `amount` exceeds what is unreserved
    /// - `TransferFailed` if the payout is refused
    pub fn withdraw(&mut self, order_id: &OrderId, amount: u128, caller: &Address) -> Result<u128> {
        self.pause.check(GuardedOperation::Withdraw)?;
        let order = self.seller_owned(order_id, caller)?;
        if amount == 0 {
            return Err(FiatlockError::InvalidOrder {
                reason: "withdrawal amount must be positive".into(),
            });
        }
        let (seller, token) = (order.seller, order.token.address);

        let now = self.clock.now();
        let remaining = self.transact(|tx| {
            let remaining = tx.withdraw(order_id, amount, now)?;
            let payout = Flow::SellerWithdrawal {
                to: seller,
                token,
                amount,
            };
            Ok((remaining, Some(payout)))
        })?;

        tracing::info!(order = %order_id, amount, remaining, "seller withdrew from order");
        self.record(EngineEvent::OrderWithdrawn {
            order_id: *order_id,
            amount,
            remaining,
        });
        Ok(remaining)
    }

    /// Reprice future fills. Existing trades keep their amounts.
    ///
    /// # Errors
    /// `OrderNotFound`, `NotAuthorized`, or `InvalidOrder` for a zero rate.
    pub fn update_exchange_rate(
        &mut self,
        order_id: &OrderId,
        exchange_rate: u64,
        caller: &Address,
    ) -> Result<()> {
        self.seller_owned(order_id, caller)?;
        if exchange_rate == 0 {
            return Err(FiatlockError::InvalidOrder {
                reason: "exchange rate must be positive".into(),
            });
        }
        self.transact(|tx| {
            tx.update_order(order_id, |o| {
                o.exchange_rate = exchange_rate;
                Ok(())
            })?;
            Ok(((), None))
        })?;
        tracing::info!(order = %order_id, exchange_rate, "exchange rate updated");
        self.record(EngineEvent::ExchangeRateUpdated {
            order_id: *order_id,
            exchange_rate,
        });
        Ok(())
    }

    /// Point the order at a different seller payment account.
    ///
    /// # Errors
    /// `OrderNotFound`, `NotAuthorized`, or `InvalidCommitment` for zero.
    pub fn update_account_lines_hash(
        &mut self,
        order_id: &OrderId,
        account_lines_hash: AccountLinesHash,
        caller: &Address,
    ) -> Result<()> {
        self.seller_owned(order_id, caller)?;
        if account_lines_hash.is_zero() {
            return Err(FiatlockError::InvalidCommitment);
        }
        self.transact(|tx| {
            tx.update_order(order_id, |o| {
                o.account_lines_hash = account_lines_hash;
                Ok(())
            })?;
            Ok(((), None))
        })?;
        tracing::info!(order = %order_id, "account lines hash updated");
        self.record(EngineEvent::AccountLinesHashUpdated {
            order_id: *order_id,
            account_lines_hash,
        });
        Ok(())
    }

    /// List or unlist an order. Unlisted orders get a private code, which
    /// is returned.
    ///
    /// # Errors
    /// `OrderNotFound` or `NotAuthorized`.
    pub fn set_visibility(
        &mut self,
        order_id: &OrderId,
        is_public: bool,
        caller: &Address,
    ) -> Result<Option<String>> {
        self.seller_owned(order_id, caller)?;
        let code = (!is_public).then(|| Order::private_code_for(order_id));
        let new_code = code.clone();
        self.transact(|tx| {
            tx.update_order(order_id, |o| {
                o.is_public = is_public;
                o.private_code = new_code;
                Ok(())
            })?;
            Ok(((), None))
        })?;
        tracing::info!(order = %order_id, is_public, "order visibility changed");
        self.record(EngineEvent::VisibilityChanged {
            order_id: *order_id,
            is_public,
        });
        Ok(code)
    }

    fn seller_owned(&self, order_id: &OrderId, caller: &Address) -> Result<&Order> {
        let order = self.ledger.orders().require(order_id)?;
        if order.seller != *caller {
            return Err(FiatlockError::NotAuthorized {
                reason: format!("{caller} is not the seller of order {order_id}"),
            });
        }
        Ok(order)
    }

    // =====================================================================
    // Trades
    // =====================================================================

    /// Reserve tokens for a buyer paying `fiat_amount` cents.
    ///
    /// The reservation is `token_amount + fee`, where `token_amount` rounds
    /// up and the fee comes from the configured [`FeeCalculator`].
    ///
    /// # Errors
    /// - `Paused`, `OrderNotFound`
    /// - `FractionalFiatAmount` unless `fiat_amount` is whole currency units
    /// - `TradeValueOutOfBounds` outside the configured bounds
    /// - `VerifierNotConfigured` if the order's rail lost its verifier
    /// - `InsufficientLiquidity` if the order cannot cover the reservation
    pub fn fill_order(
        &mut self,
        order_id: &OrderId,
        buyer: &Address,
        fiat_amount: u64,
    ) -> Result<TradeId> {
        self.pause.check(GuardedOperation::FillOrder)?;
        let order = self.ledger.orders().require(order_id)?;
        validate_fiat_amount(
            fiat_amount,
            self.config.min_trade_value,
            self.config.max_trade_value,
        )?;
        if !self.verifiers.contains(order.rail) {
            return Err(FiatlockError::VerifierNotConfigured(order.rail));
        }

        let FillQuote {
            token_amount,
            fee_amount,
            reservation,
        } = self.quote(order, buyer, fiat_amount)?;

        let now = self.clock.now();
        let window = self.config.payment_window()?;
        let expires_at =
            now.checked_add_signed(window)
                .ok_or_else(|| FiatlockError::AmountOverflow {
                    context: format!("trade deadline {now} + {window}"),
                })?;
        let trade_id = self.transact(|tx| {
            let sequence = tx.next_sequence();
            let id = TradeId::derive(order_id, buyer, fiat_amount, now.timestamp(), sequence);
            tx.reserve(order_id, reservation)?;
            tx.insert_trade(Trade {
                id,
                order_id: *order_id,
                buyer: *buyer,
                token_amount,
                fiat_amount,
                fee_amount,
                created_at: now,
                expires_at,
                status: TradeStatus::Pending,
                settlement_tx_id_hash: None,
            })?;
            Ok((id, None))
        })?;

        tracing::info!(
            trade = %trade_id,
            order = %order_id,
            buyer = %buyer,
            fiat_amount,
            token_amount,
            fee = fee_amount,
            expires_at = %expires_at,
            "order filled"
        );
        self.record(EngineEvent::TradeCreated {
            trade_id,
            order_id: *order_id,
            buyer: *buyer,
            token_amount,
            fiat_amount,
            fee_amount,
            expires_at,
        });
        Ok(trade_id)
    }

    /// Settle a pending trade against a payment proof.
    ///
    /// The trade is marked SETTLED before the verifier runs and the tokens
    /// move; any failure after that point rolls the whole transaction back.
    ///
    /// # Errors
    /// - `Paused`, `TradeNotFound`
    /// - `TradeNotPending` if the trade already settled or expired
    /// - `TradeExpired` if the payment window has closed
    /// - `VerifierNotConfigured` if the order's rail has no verifier
    /// - `ProofVerificationFailed` if the verifier rejects the proof
    /// - `TransferFailed` if the payout to the buyer is refused
    pub fn submit_proof(
        &mut self,
        trade_id: &TradeId,
        tx_id_hash: TxIdHash,
        payment_time: &str,
        proof: &[u8],
    ) -> Result<()> {
        self.pause.check(GuardedOperation::SubmitProof)?;
        let now = self.clock.now();
        let verifier = self
            .ledger
            .trades()
            .get(trade_id)
            .and_then(|t| self.ledger.orders().get(&t.order_id))
            .and_then(|o| self.verifiers.get(o.rail).ok());
        let outcome = self.transact(|tx| {
            let trade = tx.trade(trade_id)?.clone();
            if !trade.is_pending() {
                return Err(FiatlockError::TradeNotPending {
                    trade_id: trade.id,
                    status: trade.status,
                });
            }
            if trade.is_expired_at(now) {
                return Err(FiatlockError::TradeExpired(trade.id));
            }
            tx.transition(trade_id, TradeStatus::Pending, TradeStatus::Settled)?;

            let order = tx.order(&trade.order_id)?.clone();
            let verifier = verifier.ok_or(FiatlockError::VerifierNotConfigured(order.rail))?;
            if !verifier.verify_payment(
                proof,
                &order.account_lines_hash,
                &tx_id_hash,
                trade.fiat_amount,
                payment_time,
            ) {
                return Err(FiatlockError::ProofVerificationFailed(trade.id));
            }

            tx.update_trade(trade_id, |t| {
                t.settlement_tx_id_hash = Some(tx_id_hash);
                Ok(())
            })?;
            if trade.fee_amount > 0 {
                tx.credit_fees(order.token.address, trade.fee_amount)?;
            }
            let payout = Flow::Payout {
                to: trade.buyer,
                token: order.token.address,
                amount: trade.token_amount,
            };
            Ok(((trade, verifier), Some(payout)))
        });

        let (trade, verifier) = match outcome {
            Ok(settled) => settled,
            Err(err) => {
                if matches!(err, FiatlockError::ProofVerificationFailed(_)) {
                    tracing::warn!(trade = %trade_id, tx_id_hash = %tx_id_hash, "payment proof rejected");
                }
                return Err(err);
            }
        };
        verifier.consume(&tx_id_hash);
        tracing::info!(
            trade = %trade.id,
            order = %trade.order_id,
            buyer = %trade.buyer,
            token_amount = trade.token_amount,
            fee = trade.fee_amount,
            tx_id_hash = %tx_id_hash,
            "trade settled"
        );
        self.record(EngineEvent::TradeSettled {
            trade_id: trade.id,
            order_id: trade.order_id,
            buyer: trade.buyer,
            token_amount: trade.token_amount,
            fee_amount: trade.fee_amount,
            tx_id_hash,
        });
        Ok(())
    }

    /// Expire a pending trade whose payment window has closed, returning
    /// the full reservation (fee included) to its order. Callable by anyone,
    /// never blocked by pause.
    ///
    /// # Errors
    /// `TradeNotFound`, `TradeNotPending`, or `TradeNotYetExpired`.
    pub fn expire(&mut self, trade_id: &TradeId) -> Result<()> {
        self.pause.check(GuardedOperation::Expire)?;
        let now = self.clock.now();
        let (trade, returned) = self.transact(|tx| {
            let trade = tx.trade(trade_id)?.clone();
            if !trade.is_pending() {
                return Err(FiatlockError::TradeNotPending {
                    trade_id: trade.id,
                    status: trade.status,
                });
            }
            if !trade.is_expired_at(now) {
                return Err(FiatlockError::TradeNotYetExpired {
                    trade_id: trade.id,
                    expires_at: trade.expires_at.timestamp(),
                });
            }
            let returned = trade.reservation()?;
            tx.transition(trade_id, TradeStatus::Pending, TradeStatus::Expired)?;
            tx.release(&trade.order_id, returned)?;
            Ok(((trade, returned), None))
        })?;

        tracing::info!(
            trade = %trade.id,
            order = %trade.order_id,
            returned,
            "trade expired"
        );
        self.record(EngineEvent::TradeExpired {
            trade_id: trade.id,
            order_id: trade.order_id,
            returned,
        });
        Ok(())
    }

    /// Expire every pending trade that is past its window. Failures are
    /// logged and skipped. Returns how many trades expired.
    pub fn sweep_expired(&mut self) -> usize {
        let due = self.ledger.trades().expired_pending(self.clock.now());
        let mut expired = 0;
        for trade_id in due {
            match self.expire(&trade_id) {
                Ok(()) => expired += 1,
                Err(err) => {
                    tracing::warn!(trade = %trade_id, error = %err, "sweep could not expire trade");
                }
            }
        }
        if expired > 0 {
            tracing::info!(expired, "expiry sweep complete");
        }
        expired
    }

    // =====================================================================
    // Fees
    // =====================================================================

    /// Send the whole accumulated fee balance for `token` to `recipient`.
    ///
    /// # Errors
    /// `NotAuthorized`, `NoFeesToWithdraw`, or `TransferFailed`.
    pub fn withdraw_fees(
        &mut self,
        token: &Address,
        recipient: &Address,
        caller: &Address,
    ) -> Result<u128> {
        self.require_admin(caller)?;
        self.pause.check(GuardedOperation::WithdrawFees)?;
        let amount = self.transact(|tx| {
            let amount = tx.take_fees(token)?;
            let payout = Flow::FeeWithdrawal {
                to: *recipient,
                token: *token,
                amount,
            };
            Ok((amount, Some(payout)))
        })?;

        tracing::info!(token = %token, recipient = %recipient, amount, "fees withdrawn");
        self.record(EngineEvent::FeesWithdrawn {
            token: *token,
            recipient: *recipient,
            amount,
        });
        Ok(amount)
    }

    /// Withdraw every non-zero fee balance. A token whose withdrawal fails
    /// keeps its balance and is skipped; the batch itself only fails on
    /// authorization.
    ///
    /// # Errors
    /// `NotAuthorized` if `caller` is not the admin.
    pub fn withdraw_all_fees(
        &mut self,
        recipient: &Address,
        caller: &Address,
    ) -> Result<Vec<(Address, u128)>> {
        self.require_admin(caller)?;
        let tokens = self.ledger.treasury().funded_tokens();
        let mut withdrawn = Vec::new();
        for token in tokens {
            match self.withdraw_fees(&token, recipient, caller) {
                Ok(amount) => withdrawn.push((token, amount)),
                Err(err) => {
                    tracing::warn!(token = %token, error = %err, "fee withdrawal failed, balance kept");
                }
            }
        }
        Ok(withdrawn)
    }

    // =====================================================================
    // Transactions
    // =====================================================================

    /// Run `apply` as one ledger transaction, persist its result, then make
    /// the custody movement it returns.
    ///
    /// The post-transaction snapshot is saved before any token moves; a
    /// failed save rolls the ledger back. If the movement then fails, the
    /// ledger rolls back and the prior snapshot is saved again. Supply
    /// flows are recorded only once the movement has succeeded.
    fn transact<T>(
        &mut self,
        apply: impl FnOnce(&mut Txn<'_>) -> Result<(T, Option<Flow>)>,
    ) -> Result<T> {
        let Self {
            config,
            ledger,
            custody,
            supply,
            pause,
            store,
            ..
        } = self;
        let paused = pause.is_paused();
        let mut saved = false;
        let outcome = ledger.atomically(|tx| {
            let (value, flow) = apply(tx)?;
            let mut flows = supply.clone();
            if let Some(flow) = flow {
                flow.record(&mut flows);
            }
            if let Some(store) = store.as_mut() {
                let snapshot = EngineSnapshot {
                    version: SNAPSHOT_VERSION,
                    config: config.clone(),
                    ledger: tx.snapshot(),
                    supply: flows.clone(),
                    paused,
                };
                store.save(&snapshot).inspect_err(|err| {
                    tracing::error!(error = %err, "snapshot save failed, transaction rolled back");
                })?;
                saved = true;
            }
            if let Some(flow) = flow {
                flow.execute(custody)?;
            }
            Ok((value, flows))
        });

        match outcome {
            Ok((value, flows)) => {
                self.supply = flows;
                Ok(value)
            }
            Err(err) => {
                if saved {
                    self.resave_after_rollback();
                }
                Err(err)
            }
        }
    }

    /// Overwrite a snapshot whose custody movement failed with the
    /// rolled-back state.
    fn resave_after_rollback(&mut self) {
        let snapshot = self.snapshot();
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(err) = store.save(&snapshot) {
            tracing::error!(
                error = %err,
                "snapshot restore failed after custody rollback, stored state is ahead of the ledger"
            );
        }
    }

    /// Save the current ledger under a changed `config` and pause flag, and
    /// adopt them only if the save succeeds.
    pub(crate) fn reconfigure(&mut self, config: EngineConfig, paused: bool) -> Result<()> {
        if self.store.is_some() {
            let snapshot = EngineSnapshot {
                version: SNAPSHOT_VERSION,
                config: config.clone(),
                ledger: self.ledger.snapshot(),
                supply: self.supply.clone(),
                paused,
            };
            if let Some(store) = self.store.as_mut() {
                store.save(&snapshot).inspect_err(|err| {
                    tracing::error!(error = %err, "snapshot save failed, setting not applied");
                })?;
            }
        }
        self.config = config;
        self.pause.set_paused(paused);
        Ok(())
    }

    pub(crate) fn record(&mut self, event: EngineEvent) {
        tracing::debug!(event = event.kind(), "event recorded");
        self.events.push(event);
    }

    /// Current persisted form of the engine.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            ledger: self.ledger.snapshot(),
            supply: self.supply.clone(),
            paused: self.pause.is_paused(),
        }
    }
}

impl std::fmt::Debug for SettlementCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementCoordinator")
            .field("chain_id", &self.config.chain_id)
            .field("orders", &self.ledger.orders().len())
            .field("trades", &self.ledger.trades().len())
            .field("paused", &self.pause.is_paused())
            .field("verifiers", &self.verifiers)
            .finish_non_exhaustive()
    }
}
