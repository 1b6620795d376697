//! A scripted, in-memory broker used by downstream tests.
//!
//! Every trait call is recorded by name so tests can assert exactly which
//! operations were (or were not) performed.

use crate::{ApiClient, ApiError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use core_types::{
    Holding, InstrumentSummary, InstrumentType, MinorUnits, OrderAck, OrderRequest, OrderSnapshot,
    OrderStatus, Quote, SpaceSummary, VenueStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Mutex;

/// Mutable script and call log of the mock.
#[derive(Debug, Clone)]
pub struct MockState {
    pub venue: VenueStatus,
    pub spaces: Vec<SpaceSummary>,
    pub instruments: Vec<InstrumentSummary>,
    pub quote: Quote,
    pub balance: MinorUnits,
    pub positions: HashMap<String, Holding>,
    /// Status returned by `create_order`.
    pub create_status: OrderStatus,
    /// `get_order` reports `executed` on this (1-based) call; `None` means never.
    pub executed_on_poll: Option<u32>,
    pub executed_price: MinorUnits,
    /// Status reported by `get_order` before execution.
    pub pending_status: OrderStatus,
    /// Number of leading `get_order` calls that fail.
    pub failing_polls: u32,
    /// Operation names that fail with a transport-like error.
    pub failing_operations: Vec<&'static str>,
    /// Names of every operation invoked, in order.
    pub calls: Vec<&'static str>,
    /// Every order request received by `create_order`.
    pub created_orders: Vec<OrderRequest>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            venue: VenueStatus {
                mic: "XMUN".to_string(),
                is_open: true,
                next_opening_day: NaiveDate::from_ymd_opt(2021, 11, 29).unwrap_or_default(),
                opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            },
            spaces: vec![SpaceSummary {
                id: "sp_1".to_string(),
                name: "Long term".to_string(),
            }],
            instruments: vec![InstrumentSummary {
                title: "APPLE INC.".to_string(),
                isin: "US0378331005".to_string(),
                instrument_type: InstrumentType::Stock,
            }],
            quote: Quote {
                isin: "US0378331005".to_string(),
                bid: MinorUnits(4_900),
                ask: MinorUnits(5_000),
            },
            balance: MinorUnits(100_000),
            positions: HashMap::new(),
            create_status: OrderStatus::Created,
            executed_on_poll: Some(1),
            executed_price: MinorUnits(5_200),
            pending_status: OrderStatus::Activated,
            failing_polls: 0,
            failing_operations: Vec::new(),
            calls: Vec::new(),
            created_orders: Vec::new(),
        }
    }
}

/// A scripted `ApiClient`.
#[derive(Debug, Default)]
pub struct MockApiClient {
    state: Mutex<MockState>,
    /// `get_order` calls answered so far.
    polls: AtomicU32,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
            polls: AtomicU32::new(0),
        }
    }

    /// Applies `f` to the script, e.g. to change the balance mid-test.
    pub async fn update(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut *self.state.lock().await);
    }

    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    pub async fn created_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().await.created_orders.clone()
    }

    async fn record(&self, operation: &'static str) -> Result<tokio::sync::MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.state.lock().await;
        state.calls.push(operation);
        if state.failing_operations.contains(&operation) {
            return Err(ApiError::Status {
                status: 503,
                code: "service_unavailable".to_string(),
                message: format!("{} failed", operation),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get_venue(&self, _mic: &str) -> Result<VenueStatus, ApiError> {
        Ok(self.record("get_venue").await?.venue.clone())
    }

    async fn search_instruments(
        &self,
        query: &str,
        instrument_type: InstrumentType,
    ) -> Result<Vec<InstrumentSummary>, ApiError> {
        let state = self.record("search_instruments").await?;
        let query = query.to_lowercase();
        Ok(state
            .instruments
            .iter()
            .filter(|i| i.instrument_type == instrument_type)
            .filter(|i| i.title.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn get_instrument_title(&self, isin: &str) -> Result<String, ApiError> {
        let state = self.record("get_instrument_title").await?;
        state
            .instruments
            .iter()
            .find(|i| i.isin == isin)
            .map(|i| i.title.clone())
            .ok_or_else(|| ApiError::NotFound(format!("instrument {}", isin)))
    }

    async fn get_latest_quote(&self, _isin: &str) -> Result<Quote, ApiError> {
        Ok(self.record("get_latest_quote").await?.quote.clone())
    }

    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, ApiError> {
        Ok(self.record("list_spaces").await?.spaces.clone())
    }

    async fn get_account_balance(&self, _space_id: &str) -> Result<MinorUnits, ApiError> {
        Ok(self.record("get_account_balance").await?.balance)
    }

    async fn get_positions(&self, _space_id: &str) -> Result<HashMap<String, Holding>, ApiError> {
        Ok(self.record("get_positions").await?.positions.clone())
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let mut state = self.record("create_order").await?;
        state.created_orders.push(order.clone());
        let id = format!("ord_{}", state.created_orders.len());
        Ok(OrderAck {
            id,
            status: state.create_status,
        })
    }

    async fn activate_order(&self, _order_id: &str) -> Result<OrderStatus, ApiError> {
        self.record("activate_order").await?;
        Ok(OrderStatus::Activated)
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot, ApiError> {
        let state = self.record("get_order").await?;
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if poll <= state.failing_polls {
            return Err(ApiError::InvalidData("malformed order response".to_string()));
        }
        let executed = state.executed_on_poll.is_some_and(|n| poll >= n);
        Ok(OrderSnapshot {
            id: order_id.to_string(),
            status: if executed { OrderStatus::Executed } else { state.pending_status },
            executed_price: executed.then_some(state.executed_price),
        })
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<OrderStatus, ApiError> {
        self.record("cancel_order").await?;
        Ok(OrderStatus::Cancelled)
    }
}
