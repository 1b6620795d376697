use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("API client error: {0}")]
    ApiClient(#[from] api_client::ApiError),

    #[error("Order lifecycle error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("No space is available to trade with.")]
    NoSpace,

    #[error("The conversation has no {0} yet.")]
    MissingContext(&'static str),
}

/// Why a quick-trade command could not be parsed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuickTradeError {
    #[error("expected 4 tokens, got {0}")]
    TokenCount(usize),

    #[error("'{0}' is not buy or sell")]
    Side(String),

    #[error("'{0}' is not a positive whole number of shares")]
    Quantity(String),

    #[error("'{0}' is not an instrument type")]
    InstrumentType(String),
}
