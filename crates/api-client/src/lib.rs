use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use configuration::GatewayConfig;
use core_types::{
    Holding, InstrumentSummary, InstrumentType, MinorUnits, OrderAck, OrderRequest, OrderSnapshot,
    OrderStatus, Quote, SpaceSummary, VenueStatus,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod responses;
// --- Public API ---
pub use error::ApiError;
#[cfg(feature = "mock")]
pub use mock::MockApiClient;
use responses::{
    ApiErrorResponse, Envelope, InstrumentResponse, OrderResponse, PositionResponse,
    QuoteResponse, SpaceResponse, StatusResponse, VenueResponse,
};

/// The narrow capability interface the trade workflow needs from the broker.
///
/// This trait is the contract the conversation engine and the order controller
/// are written against, allowing the underlying implementation (live or mock)
/// to be swapped out. All money crosses it as `MinorUnits`.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetches the opening state of a venue.
    async fn get_venue(&self, mic: &str) -> Result<VenueStatus, ApiError>;

    /// Searches instruments by free text within one instrument class.
    async fn search_instruments(
        &self,
        query: &str,
        instrument_type: InstrumentType,
    ) -> Result<Vec<InstrumentSummary>, ApiError>;

    /// Looks up the display title of an instrument.
    async fn get_instrument_title(&self, isin: &str) -> Result<String, ApiError>;

    /// Fetches the latest bid/ask for an instrument.
    async fn get_latest_quote(&self, isin: &str) -> Result<Quote, ApiError>;

    /// Lists the spaces (sub-accounts) orders can be placed from.
    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, ApiError>;

    /// Cash available for buying in one space.
    async fn get_account_balance(&self, space_id: &str) -> Result<MinorUnits, ApiError>;

    /// Current holdings of one space, keyed by ISIN.
    async fn get_positions(&self, space_id: &str) -> Result<HashMap<String, Holding>, ApiError>;

    /// Creates an inactive order. (Authenticated)
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError>;

    /// Activates a previously created order. (Authenticated)
    async fn activate_order(&self, order_id: &str) -> Result<OrderStatus, ApiError>;

    /// Fetches the current status of an order. (Authenticated)
    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot, ApiError>;

    /// Cancels an order. (Authenticated)
    async fn cancel_order(&self, order_id: &str) -> Result<OrderStatus, ApiError>;

    async fn is_venue_open(&self, mic: &str) -> Result<bool, ApiError> {
        Ok(self.get_venue(mic).await?.is_open)
    }

    async fn next_opening_day(&self, mic: &str) -> Result<NaiveDate, ApiError> {
        Ok(self.get_venue(mic).await?.next_opening_day)
    }

    async fn next_opening_time(&self, mic: &str) -> Result<NaiveTime, ApiError> {
        Ok(self.get_venue(mic).await?.opening_time)
    }
}

/// Query parameters accepted by `GET instruments/`.
#[derive(Debug, Serialize)]
struct InstrumentQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    instrument_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    isin: Option<&'a str>,
    mic: &'a str,
}

#[derive(Debug, Serialize)]
struct VenueQuery<'a> {
    mic: &'a str,
}

/// Query parameters accepted by `GET quotes/latest`.
#[derive(Debug, Serialize)]
struct QuoteQuery<'a> {
    isin: &'a str,
    mic: &'a str,
    decimals: bool,
}

#[derive(Debug, Serialize)]
struct SpaceQuery<'a> {
    space_id: &'a str,
    decimals: bool,
}

/// Body of `POST orders/`.
#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    isin: &'a str,
    expires_at: &'a str,
    side: &'a str,
    quantity: u64,
    venue: &'a str,
    space_id: &'a str,
}

/// A concrete implementation of the `ApiClient` for the lemon.markets REST API.
#[derive(Clone)]
pub struct LemonClient {
    client: reqwest::Client,
    trading_base_url: String,
    market_data_base_url: String,
    venue: String,
}

impl LemonClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| ApiError::InvalidData(format!("Invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            trading_base_url: config.trading_base_url.clone(),
            market_data_base_url: config.market_data_base_url.clone(),
            venue: config.venue.clone(),
        })
    }

    fn trading_url(&self, path: &str) -> String {
        format!("{}{}", self.trading_base_url, path)
    }

    fn market_url<Q: Serialize>(&self, path: &str, query: &Q) -> Result<String, ApiError> {
        let query_string =
            serde_qs::to_string(query).map_err(|e| ApiError::InvalidData(e.to_string()))?;
        Ok(format!("{}{}?{}", self.market_data_base_url, path, query_string))
    }

    /// Sends a request and unwraps the `results` envelope of a successful response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<Envelope<T>>(&text)
                .map(|envelope| envelope.results)
                .map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let api_error: ApiErrorResponse = serde_json::from_str(&text).map_err(|e| {
                ApiError::Deserialization(format!(
                    "Failed to deserialize error response: {}. Original text: {}",
                    e, text
                ))
            })?;
            Err(ApiError::Status {
                status: status.as_u16(),
                code: api_error.error_code,
                message: api_error.error_message,
            })
        }
    }

    /// Like `send`, for endpoints that answer with a bare `{"status": ...}`.
    async fn send_for_status(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<StatusResponse>(&text)
                .map(|r| r.status)
                .map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let api_error: ApiErrorResponse = serde_json::from_str(&text)
                .map_err(|e| ApiError::Deserialization(e.to_string()))?;
            Err(ApiError::Status {
                status: status.as_u16(),
                code: api_error.error_code,
                message: api_error.error_message,
            })
        }
    }

    async fn query_instruments(
        &self,
        query: &InstrumentQuery<'_>,
    ) -> Result<Vec<InstrumentResponse>, ApiError> {
        let url = self.market_url("instruments/", query)?;
        self.send(self.client.get(&url)).await
    }
}

#[async_trait]
impl ApiClient for LemonClient {
    async fn get_venue(&self, mic: &str) -> Result<VenueStatus, ApiError> {
        let url = self.market_url("venues/", &VenueQuery { mic })?;
        let venues: Vec<VenueResponse> = self.send(self.client.get(&url)).await?;
        let venue = venues
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("venue {}", mic)))?;
        VenueStatus::try_from(venue)
    }

    async fn search_instruments(
        &self,
        query: &str,
        instrument_type: InstrumentType,
    ) -> Result<Vec<InstrumentSummary>, ApiError> {
        let raw = self
            .query_instruments(&InstrumentQuery {
                search: Some(query),
                instrument_type: Some(instrument_type.as_str()),
                isin: None,
                mic: &self.venue,
            })
            .await?;
        tracing::debug!(query, count = raw.len(), "Instrument search completed.");
        raw.into_iter().map(InstrumentSummary::try_from).collect()
    }

    async fn get_instrument_title(&self, isin: &str) -> Result<String, ApiError> {
        let raw = self
            .query_instruments(&InstrumentQuery {
                search: None,
                instrument_type: None,
                isin: Some(isin),
                mic: &self.venue,
            })
            .await?;
        raw.into_iter()
            .next()
            .map(|instrument| instrument.title)
            .ok_or_else(|| ApiError::NotFound(format!("instrument {}", isin)))
    }

    async fn get_latest_quote(&self, isin: &str) -> Result<Quote, ApiError> {
        let url = self.market_url(
            "quotes/latest",
            &QuoteQuery { isin, mic: &self.venue, decimals: false },
        )?;
        let quotes: Vec<QuoteResponse> = self.send(self.client.get(&url)).await?;
        quotes
            .into_iter()
            .next()
            .map(Quote::from)
            .ok_or_else(|| ApiError::NotFound(format!("quote for {}", isin)))
    }

    async fn list_spaces(&self) -> Result<Vec<SpaceSummary>, ApiError> {
        let url = self.trading_url("spaces/?decimals=false");
        let spaces: Vec<SpaceResponse> = self.send(self.client.get(&url)).await?;
        Ok(spaces.into_iter().map(SpaceSummary::from).collect())
    }

    async fn get_account_balance(&self, space_id: &str) -> Result<MinorUnits, ApiError> {
        let url = self.trading_url(&format!("spaces/{}/?decimals=false", space_id));
        let space: SpaceResponse = self.send(self.client.get(&url)).await?;
        Ok(MinorUnits(space.buying_power))
    }

    async fn get_positions(&self, space_id: &str) -> Result<HashMap<String, Holding>, ApiError> {
        let query = serde_qs::to_string(&SpaceQuery { space_id, decimals: false })
            .map_err(|e| ApiError::InvalidData(e.to_string()))?;
        let url = self.trading_url(&format!("positions/?{}", query));
        let positions: Vec<PositionResponse> = self.send(self.client.get(&url)).await?;
        positions
            .into_iter()
            .map(|raw| Holding::try_from(raw).map(|h| (h.isin.clone(), h)))
            .collect()
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let body = CreateOrderBody {
            isin: &order.isin,
            expires_at: order.expiry.as_code(),
            side: order.side.as_str(),
            quantity: order.quantity,
            venue: &order.venue,
            space_id: &order.space_id,
        };
        let url = self.trading_url("orders/");
        let created: OrderResponse = self.send(self.client.post(&url).json(&body)).await?;
        tracing::info!(order_id = %created.id, status = %created.status, "Order created.");
        OrderAck::try_from(created)
    }

    async fn activate_order(&self, order_id: &str) -> Result<OrderStatus, ApiError> {
        let url = self.trading_url(&format!("orders/{}/activate/", order_id));
        let status = self.send_for_status(self.client.post(&url)).await?;
        match status.as_str() {
            "ok" => Ok(OrderStatus::Activated),
            other => responses::parse_order_status(other),
        }
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot, ApiError> {
        let url = self.trading_url(&format!("orders/{}/?decimals=false", order_id));
        let order: OrderResponse = self.send(self.client.get(&url)).await?;
        OrderSnapshot::try_from(order)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderStatus, ApiError> {
        let url = self.trading_url(&format!("orders/{}/", order_id));
        let status = self.send_for_status(self.client.delete(&url)).await?;
        match status.as_str() {
            "ok" => Ok(OrderStatus::Cancelled),
            other => responses::parse_order_status(other),
        }
    }
}
