//! Brokerage access
//!
//! The advisor only ever talks to the [`Broker`] trait. The sole shipped
//! implementation is [`MockBroker`], which simulates a small portfolio in
//! memory so the full pipeline can run without touching a real account.

use crate::error::Result;
use crate::model::{AccountFunds, OrderConfirmation, OrderSide, OrderTicket, Position};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Brokerage operations the advisor needs
#[async_trait]
pub trait Broker: Send + Sync {
    async fn authenticate(&self) -> Result<()>;
    async fn list_positions(&self) -> Result<Vec<Position>>;
    async fn get_available_funds(&self) -> Result<AccountFunds>;
    async fn place_order(&self, ticket: OrderTicket) -> Result<OrderConfirmation>;
}

const SEED_CASH: f64 = 10_000.0;

struct BrokerState {
    authenticated: bool,
    cash: f64,
    currency: String,
    positions: Vec<Position>,
}

/// In-memory broker with a seeded two-position portfolio
///
/// Orders mutate the simulated portfolio but are loudly marked as mocked.
/// Buys average up the entry price and deduct cash; sells release shares
/// and return cash. Market prices stay wherever the seed left them.
pub struct MockBroker {
    state: Mutex<BrokerState>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState {
                authenticated: false,
                cash: SEED_CASH,
                currency: "USD".to_string(),
                positions: seed_positions(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_positions() -> Vec<Position> {
    vec![
        Position {
            ticker: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            quantity: 10,
            average_price: 150.50,
            current_price: 175.20,
            market_value: 1752.00,
            unrealized_pnl: 247.00,
            unrealized_pnl_percent: 16.41,
        },
        Position {
            ticker: "MSFT".to_string(),
            name: "Microsoft Corporation".to_string(),
            quantity: 5,
            average_price: 300.00,
            current_price: 350.75,
            market_value: 1753.75,
            unrealized_pnl: 253.75,
            unrealized_pnl_percent: 16.92,
        },
    ]
}

#[async_trait]
impl Broker for MockBroker {
    async fn authenticate(&self) -> Result<()> {
        let mut state = self.lock();
        state.authenticated = true;
        info!("MOCK: authenticated against the simulated brokerage");
        Ok(())
    }

    async fn list_positions(&self) -> Result<Vec<Position>> {
        Ok(self.lock().positions.clone())
    }

    async fn get_available_funds(&self) -> Result<AccountFunds> {
        let state = self.lock();
        let invested: f64 = state.positions.iter().map(|p| p.market_value).sum();
        Ok(AccountFunds {
            currency: state.currency.clone(),
            available_cash: state.cash,
            total_value: state.cash + invested,
            invested_value: invested,
        })
    }

    async fn place_order(&self, ticket: OrderTicket) -> Result<OrderConfirmation> {
        ticket.validate()?;
        let total_value = ticket.total_value();
        let now = Utc::now();
        let order_id = format!("MOCK-{}-{}", now.format("%Y%m%d%H%M%S"), ticket.ticker);
        warn!(
            ticker = %ticket.ticker,
            side = ticket.side.as_str(),
            quantity = ticket.quantity,
            price = ticket.price,
            total_value,
            "MOCK ORDER: no real trade was executed"
        );

        let mut state = self.lock();
        match ticket.side {
            OrderSide::Buy => {
                if let Some(position) = state
                    .positions
                    .iter_mut()
                    .find(|p| p.ticker == ticket.ticker)
                {
                    let old_quantity = f64::from(position.quantity);
                    let new_quantity = old_quantity + f64::from(ticket.quantity);
                    position.average_price =
                        (position.average_price * old_quantity + total_value) / new_quantity;
                    position.quantity += ticket.quantity;
                } else {
                    state.positions.push(Position {
                        ticker: ticket.ticker.clone(),
                        name: format!("{} (Mock Position)", ticket.ticker),
                        quantity: ticket.quantity,
                        average_price: ticket.price,
                        current_price: ticket.price,
                        market_value: total_value,
                        unrealized_pnl: 0.0,
                        unrealized_pnl_percent: 0.0,
                    });
                }
                state.cash -= total_value;
            }
            OrderSide::Sell => {
                if let Some(index) = state
                    .positions
                    .iter()
                    .position(|p| p.ticker == ticket.ticker)
                {
                    let position = &mut state.positions[index];
                    position.quantity = position.quantity.saturating_sub(ticket.quantity);
                    if position.quantity == 0 {
                        state.positions.remove(index);
                    }
                }
                state.cash += total_value;
            }
        }

        Ok(OrderConfirmation {
            order_id,
            ticker: ticket.ticker,
            side: ticket.side,
            quantity: ticket.quantity,
            price: ticket.price,
            total_value,
            status: "simulated".to_string(),
            timestamp: now,
        })
    }
}
