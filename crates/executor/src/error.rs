use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Order {order_id} was rejected by the broker.")]
    Rejected { order_id: String },

    #[error("Order {order_id} cannot be activated while it is {status}.")]
    NotActivatable { order_id: String, status: String },

    #[error("API error: {0}")]
    Api(#[from] api_client::ApiError),
}
