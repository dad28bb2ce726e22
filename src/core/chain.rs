//! Chain host
//!
//! Owns every ledger and sale and executes transactions one at a time.
//! A transaction either commits all of its effects and events or none of
//! them: the touched state is snapshotted before execution and restored on
//! any error.

use crate::core::context::CallContext;
use crate::core::events::{Event, LoggedEvent};
use crate::core::native::{NativeError, NativeLedger};
use crate::core::transaction::{Call, Receipt, Transaction};
use crate::sale::{Crowdsale, SaleError, SaleManager, TOKEN_DECIMALS};
use crate::token::{Token, TokenError, TokenManager};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Sale error: {0}")]
    Sale(#[from] SaleError),
    #[error("Native ledger error: {0}")]
    Native(#[from] NativeError),
    #[error("Sale not found: {0}")]
    SaleNotFound(String),
    #[error("Call {0} does not accept value")]
    NonPayable(&'static str),
    #[error("Unsupported token decimals: {0}, sales require {}", TOKEN_DECIMALS)]
    UnsupportedDecimals(u8),
}

impl ChainError {
    /// The sale rejection behind this error, if any
    pub fn sale_error(&self) -> Option<&SaleError> {
        match self {
            ChainError::Sale(e) => Some(e),
            _ => None,
        }
    }
}

/// Summary numbers for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    pub height: u64,
    pub token_count: usize,
    pub sale_count: usize,
    pub event_count: usize,
    pub native_issued: u128,
}

/// The whole ledger state plus its event log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chain {
    tokens: TokenManager,
    sales: SaleManager,
    native: NativeLedger,
    events: Vec<LoggedEvent>,
    /// Number of committed transactions
    height: u64,
}

impl Chain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Every committed event, oldest first
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn sales(&self) -> &SaleManager {
        &self.sales
    }

    pub fn token(&self, address: &str) -> Option<&Token> {
        self.tokens.get(address)
    }

    pub fn sale(&self, address: &str) -> Option<&Crowdsale> {
        self.sales.get(address)
    }

    pub fn native_balance(&self, account: &str) -> u128 {
        self.native.balance_of(account)
    }

    pub fn token_balance(&self, token: &str, holder: &str) -> Result<u128, ChainError> {
        Ok(self.tokens.balance_of(token, holder)?)
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height,
            token_count: self.tokens.count(),
            sale_count: self.sales.count(),
            event_count: self.events.len(),
            native_issued: self.native.total_issued(),
        }
    }

    // =========================================================================
    // State changes
    // =========================================================================

    /// Issue native coins to an account outside of any transaction
    /// (genesis allocation / faucet)
    pub fn allocate(&mut self, account: &str, amount: u128) -> Result<(), ChainError> {
        self.native.allocate(account, amount)?;
        log::info!("Allocated {} native units to {}", amount, account);
        Ok(())
    }

    /// Execute a transaction atomically
    pub fn submit(&mut self, tx: Transaction) -> Result<Receipt, ChainError> {
        let snapshot = (
            self.tokens.clone(),
            self.sales.clone(),
            self.native.clone(),
        );

        let (created, events) = match self.execute(&tx) {
            Ok(outcome) => outcome,
            Err(e) => {
                (self.tokens, self.sales, self.native) = snapshot;
                log::warn!(
                    "Transaction {} ({} from {}) rejected: {}",
                    tx.id.get(..16).unwrap_or(&tx.id),
                    tx.call.name(),
                    tx.sender,
                    e
                );
                return Err(e);
            }
        };

        self.height += 1;
        self.events
            .extend(events.iter().cloned().map(|event| LoggedEvent {
                height: self.height,
                tx_id: tx.id.clone(),
                timestamp: tx.timestamp,
                event,
            }));

        log::debug!(
            "Committed {} at height {} with {} event(s)",
            tx.call.name(),
            self.height,
            events.len()
        );

        Ok(Receipt {
            tx_id: tx.id,
            height: self.height,
            created,
            events,
        })
    }

    fn execute(&mut self, tx: &Transaction) -> Result<(Option<String>, Vec<Event>), ChainError> {
        let mut events = Vec::new();
        let mut created = None;
        let height = self.height + 1;

        if tx.value > 0 {
            let payee = tx
                .call
                .payee()
                .ok_or(ChainError::NonPayable(tx.call.name()))?;
            if let Some(event) = self.native.transfer(&tx.sender, payee, tx.value)? {
                events.push(event.into());
            }
        }

        let ctx = CallContext::new(tx.sender.clone(), tx.timestamp).with_value(tx.value);

        match &tx.call {
            Call::DeployToken {
                name,
                symbol,
                decimals,
                total_supply,
            } => {
                let token = self.tokens.create_token(
                    name.clone(),
                    symbol.clone(),
                    *decimals,
                    *total_supply,
                    &tx.sender,
                    height,
                    tx.timestamp,
                )?;
                created = Some(token.address);
            }

            Call::TransferToken { token, to, amount } => {
                let event = self.tokens.transfer(token, &tx.sender, to, *amount)?;
                events.push(event.into());
            }

            Call::ApproveToken {
                token,
                spender,
                amount,
            } => {
                let event = self.tokens.approve(token, &tx.sender, spender, *amount)?;
                events.push(event.into());
            }

            Call::TransferTokenFrom {
                token,
                from,
                to,
                amount,
            } => {
                let event = self
                    .tokens
                    .transfer_from(token, &tx.sender, from, to, *amount)?;
                events.push(event.into());
            }

            Call::DeployCrowdsale {
                token,
                price,
                max_tokens,
                sale_open_at,
            } => {
                let decimals = self
                    .tokens
                    .get(token)
                    .ok_or_else(|| TokenError::TokenNotFound(token.clone()))?
                    .decimals();
                if decimals != TOKEN_DECIMALS {
                    return Err(ChainError::UnsupportedDecimals(decimals));
                }

                let address = self.sales.deploy(
                    token,
                    &tx.sender,
                    *price,
                    *max_tokens,
                    *sale_open_at,
                    height,
                )?;
                created = Some(address);
            }

            Call::Buy { sale, quantity } => {
                let (sale, token) = resolve_sale(&mut self.sales, &mut self.tokens, sale)?;
                let purchase = sale.buy(&ctx, *quantity, token)?;
                events.push(purchase.transfer.into());
                events.push(purchase.event.into());
            }

            Call::Send { to } => {
                // Plain coin transfers were fully handled with the value
                if self.sales.exists(to) {
                    let (sale, token) = resolve_sale(&mut self.sales, &mut self.tokens, to)?;
                    let purchase = sale.receive(&ctx, token)?;
                    events.push(purchase.transfer.into());
                    events.push(purchase.event.into());
                }
            }

            Call::AddToWhitelist { sale, account } => {
                self.sale_mut(sale)?.add_to_whitelist(&ctx, account)?;
            }

            Call::SetPrice { sale, price } => {
                self.sale_mut(sale)?.set_price(&ctx, *price)?;
            }

            Call::Finalize { sale } => {
                let (sale, token) = resolve_sale(&mut self.sales, &mut self.tokens, sale)?;
                let settlement = sale.finalize(&ctx, token, &mut self.native)?;
                events.extend(settlement.asset_transfer.map(Event::from));
                events.extend(settlement.payment_transfer.map(Event::from));
                events.push(settlement.event.into());
            }
        }

        Ok((created, events))
    }

    fn sale_mut(&mut self, address: &str) -> Result<&mut Crowdsale, ChainError> {
        self.sales
            .get_mut(address)
            .ok_or_else(|| ChainError::SaleNotFound(address.to_string()))
    }
}

/// A sale together with the token it sells
fn resolve_sale<'a>(
    sales: &'a mut SaleManager,
    tokens: &'a mut TokenManager,
    address: &str,
) -> Result<(&'a mut Crowdsale, &'a mut Token), ChainError> {
    let sale = sales
        .get_mut(address)
        .ok_or_else(|| ChainError::SaleNotFound(address.to_string()))?;
    let token = tokens.resolve_mut(sale.token())?;
    Ok((sale, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::{BuyEvent, FinalizeEvent, SCALE};
    use chrono::{DateTime, Duration, Utc};

    const DEPLOYER: &str = "deployer";
    const USER1: &str = "user1";
    const USER2: &str = "user2";

    fn tokens(n: u128) -> u128 {
        n * SCALE
    }

    fn ether(n: u128) -> u128 {
        n * SCALE
    }

    struct Setup {
        chain: Chain,
        token: String,
        sale: String,
        now: DateTime<Utc>,
    }

    impl Setup {
        /// Token with 1,000,000 supply, sale at price 1 holding all of it,
        /// user1 whitelisted, both users holding 1,000 coins
        fn new() -> Self {
            let now = Utc::now();
            let mut chain = Chain::new();
            chain.allocate(USER1, ether(1_000)).unwrap();
            chain.allocate(USER2, ether(1_000)).unwrap();

            let token = chain
                .submit(Transaction::new(
                    DEPLOYER,
                    Call::DeployToken {
                        name: "Henry token".to_string(),
                        symbol: "HENRY".to_string(),
                        decimals: 18,
                        total_supply: tokens(1_000_000),
                    },
                    now,
                ))
                .unwrap()
                .created
                .unwrap();

            let sale = chain
                .submit(Transaction::new(
                    DEPLOYER,
                    Call::DeployCrowdsale {
                        token: token.clone(),
                        price: ether(1),
                        max_tokens: tokens(1_000_000),
                        sale_open_at: now,
                    },
                    now,
                ))
                .unwrap()
                .created
                .unwrap();

            let mut setup = Self {
                chain,
                token,
                sale,
                now,
            };
            setup
                .send(
                    DEPLOYER,
                    Call::TransferToken {
                        token: setup.token.clone(),
                        to: setup.sale.clone(),
                        amount: tokens(1_000_000),
                    },
                    0,
                )
                .unwrap();
            setup
                .send(
                    DEPLOYER,
                    Call::AddToWhitelist {
                        sale: setup.sale.clone(),
                        account: USER1.to_string(),
                    },
                    0,
                )
                .unwrap();
            setup
        }

        fn send(&mut self, sender: &str, call: Call, value: u128) -> Result<Receipt, ChainError> {
            self.chain
                .submit(Transaction::new(sender, call, self.now).with_value(value))
        }

        fn buy(&mut self, buyer: &str, quantity: u128, value: u128) -> Result<Receipt, ChainError> {
            let sale = self.sale.clone();
            self.send(buyer, Call::Buy { sale, quantity }, value)
        }

        fn finalize(&mut self, caller: &str) -> Result<Receipt, ChainError> {
            let sale = self.sale.clone();
            self.send(caller, Call::Finalize { sale }, 0)
        }

        fn token_balance(&self, holder: &str) -> u128 {
            self.chain.token_balance(&self.token, holder).unwrap()
        }

        fn sale_state(&self) -> &Crowdsale {
            self.chain.sale(&self.sale).unwrap()
        }
    }

    fn sale_error(result: Result<Receipt, ChainError>) -> SaleError {
        match result {
            Err(ChainError::Sale(e)) => e,
            other => panic!("expected sale error, got {:?}", other),
        }
    }

    #[test]
    fn test_deployment() {
        let setup = Setup::new();

        assert_eq!(setup.token_balance(&setup.sale), tokens(1_000_000));
        assert_eq!(setup.sale_state().price(), ether(1));
        assert_eq!(setup.sale_state().token(), setup.token);
        assert_eq!(setup.chain.height(), 4);
    }

    #[test]
    fn test_buy_scenario() {
        let mut setup = Setup::new();

        let receipt = setup.buy(USER1, tokens(10), ether(10)).unwrap();

        assert_eq!(setup.token_balance(&setup.sale), tokens(999_990));
        assert_eq!(setup.token_balance(USER1), tokens(10));
        assert_eq!(setup.chain.native_balance(&setup.sale), ether(10));
        assert_eq!(setup.chain.native_balance(USER1), ether(990));
        assert_eq!(setup.sale_state().tokens_sold(), tokens(10));

        let buys: Vec<_> = receipt.events_named("Buy").collect();
        assert_eq!(
            buys,
            vec![&Event::Buy(BuyEvent {
                sale: setup.sale.clone(),
                quantity: tokens(10),
                buyer: USER1.to_string(),
            })]
        );
    }

    #[test]
    fn test_rejected_buy_refunds_value() {
        let mut setup = Setup::new();
        let height = setup.chain.height();
        let events = setup.chain.events().len();

        // Overpaying by one coin
        let err = sale_error(setup.buy(USER1, tokens(10), ether(11)));
        assert!(matches!(err, SaleError::PaymentMismatch { .. }));

        assert_eq!(setup.chain.native_balance(USER1), ether(1_000));
        assert_eq!(setup.chain.native_balance(&setup.sale), 0);
        assert_eq!(setup.sale_state().tokens_sold(), 0);
        assert_eq!(setup.chain.height(), height);
        assert_eq!(setup.chain.events().len(), events);
    }

    #[test]
    fn test_buy_failures() {
        let mut setup = Setup::new();

        assert!(matches!(
            sale_error(setup.buy(USER1, tokens(10), 0)),
            SaleError::PaymentMismatch { .. }
        ));
        assert!(matches!(
            sale_error(setup.buy(USER2, tokens(10), ether(10))),
            SaleError::NotWhitelisted(_)
        ));
        assert!(matches!(
            sale_error(setup.buy(USER1, tokens(4), ether(4))),
            SaleError::OutOfBounds { .. }
        ));
        assert!(matches!(
            sale_error(setup.buy(USER1, tokens(101), ether(101))),
            SaleError::OutOfBounds { .. }
        ));
    }

    #[test]
    fn test_buy_before_open() {
        let mut setup = Setup::new();
        let tx = Transaction::new(
            USER1,
            Call::Buy {
                sale: setup.sale.clone(),
                quantity: tokens(10),
            },
            setup.now - Duration::seconds(30),
        )
        .with_value(ether(10));

        let err = sale_error(setup.chain.submit(tx));
        assert!(matches!(err, SaleError::SaleNotOpen { .. }));
    }

    #[test]
    fn test_buy_without_funds() {
        let mut setup = Setup::new();

        let result = setup.buy("broke", tokens(10), ether(10));
        assert!(matches!(
            result,
            Err(ChainError::Native(NativeError::InsufficientFunds { .. }))
        ));
    }

    #[test]
    fn test_value_on_non_payable_call() {
        let mut setup = Setup::new();
        let sale = setup.sale.clone();

        let result = setup.send(DEPLOYER, Call::Finalize { sale }, 1);
        assert!(matches!(result, Err(ChainError::NonPayable("finalize"))));
    }

    #[test]
    fn test_sending_value_buys_tokens() {
        let mut setup = Setup::new();
        let sale = setup.sale.clone();

        let receipt = setup
            .send(USER1, Call::Send { to: sale }, ether(10))
            .unwrap();

        assert_eq!(setup.chain.native_balance(&setup.sale), ether(10));
        assert_eq!(setup.token_balance(USER1), tokens(10));
        assert_eq!(receipt.events_named("Buy").count(), 1);
    }

    #[test]
    fn test_sending_value_requires_whitelist() {
        let mut setup = Setup::new();
        let sale = setup.sale.clone();

        let err = sale_error(setup.send(USER2, Call::Send { to: sale }, ether(10)));
        assert!(matches!(err, SaleError::NotWhitelisted(_)));
        assert_eq!(setup.chain.native_balance(USER2), ether(1_000));
    }

    #[test]
    fn test_plain_coin_transfer() {
        let mut setup = Setup::new();

        setup
            .send(
                USER1,
                Call::Send {
                    to: USER2.to_string(),
                },
                ether(5),
            )
            .unwrap();

        assert_eq!(setup.chain.native_balance(USER1), ether(995));
        assert_eq!(setup.chain.native_balance(USER2), ether(1_005));
    }

    #[test]
    fn test_update_price() {
        let mut setup = Setup::new();
        let sale = setup.sale.clone();

        setup
            .send(
                DEPLOYER,
                Call::SetPrice {
                    sale: sale.clone(),
                    price: ether(2),
                },
                0,
            )
            .unwrap();
        assert_eq!(setup.sale_state().price(), ether(2));

        let err = sale_error(setup.send(
            USER1,
            Call::SetPrice {
                sale,
                price: ether(3),
            },
            0,
        ));
        assert!(matches!(err, SaleError::Unauthorized { .. }));
        assert_eq!(setup.sale_state().price(), ether(2));
    }

    #[test]
    fn test_only_owner_can_whitelist() {
        let mut setup = Setup::new();
        let sale = setup.sale.clone();

        let err = sale_error(setup.send(
            USER2,
            Call::AddToWhitelist {
                sale,
                account: USER2.to_string(),
            },
            0,
        ));
        assert!(matches!(err, SaleError::Unauthorized { .. }));
    }

    #[test]
    fn test_finalize_scenario() {
        let mut setup = Setup::new();
        setup.buy(USER1, tokens(10), ether(10)).unwrap();

        let receipt = setup.finalize(DEPLOYER).unwrap();

        assert_eq!(setup.token_balance(&setup.sale), 0);
        assert_eq!(setup.token_balance(DEPLOYER), tokens(999_990));
        assert_eq!(setup.chain.native_balance(&setup.sale), 0);
        assert_eq!(setup.chain.native_balance(DEPLOYER), ether(10));
        assert_eq!(
            receipt.events.last(),
            Some(&Event::Finalize(FinalizeEvent {
                sale: setup.sale.clone(),
                tokens_sold: tokens(10),
                payment_collected: ether(10),
            }))
        );
        assert_eq!(receipt.events_named("Transfer").count(), 1);
        assert_eq!(receipt.events_named("NativeTransfer").count(), 1);
    }

    #[test]
    fn test_finalize_failures() {
        let mut setup = Setup::new();

        let err = sale_error(setup.finalize(USER1));
        assert!(matches!(err, SaleError::Unauthorized { .. }));

        setup.finalize(DEPLOYER).unwrap();
        assert_eq!(sale_error(setup.finalize(DEPLOYER)), SaleError::Finalized);
        assert_eq!(
            sale_error(setup.buy(USER1, tokens(10), ether(10))),
            SaleError::Finalized
        );
        assert_eq!(setup.chain.native_balance(USER1), ether(1_000));
    }

    #[test]
    fn test_crowdsale_requires_18_decimals() {
        let mut setup = Setup::new();
        let six = setup
            .send(
                DEPLOYER,
                Call::DeployToken {
                    name: "Six".to_string(),
                    symbol: "SIX".to_string(),
                    decimals: 6,
                    total_supply: 1_000_000,
                },
                0,
            )
            .unwrap()
            .created
            .unwrap();

        let result = setup.send(
            DEPLOYER,
            Call::DeployCrowdsale {
                token: six,
                price: ether(1),
                max_tokens: 1_000_000,
                sale_open_at: setup.now,
            },
            0,
        );
        assert!(matches!(result, Err(ChainError::UnsupportedDecimals(6))));
    }

    #[test]
    fn test_unknown_sale() {
        let mut setup = Setup::new();

        let result = setup.send(
            DEPLOYER,
            Call::Finalize {
                sale: "0xMISSING".to_string(),
            },
            0,
        );
        assert!(matches!(result, Err(ChainError::SaleNotFound(_))));
    }

    #[test]
    fn test_events_are_logged_in_order() {
        let mut setup = Setup::new();
        setup.buy(USER1, tokens(10), ether(10)).unwrap();
        setup.finalize(DEPLOYER).unwrap();

        let names: Vec<_> = setup
            .chain
            .events()
            .iter()
            .map(|logged| logged.event.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "Transfer",
                "NativeTransfer",
                "Transfer",
                "Buy",
                "Transfer",
                "NativeTransfer",
                "Finalize"
            ]
        );

        let heights: Vec<_> = setup.chain.events().iter().map(|e| e.height).collect();
        assert!(heights.windows(2).all(|w| w[0] <= w[1]));
    }
}
