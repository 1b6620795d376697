use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RiskError {
    #[error("'{0}' is not a number of shares.")]
    InvalidQuantity(String),
}
