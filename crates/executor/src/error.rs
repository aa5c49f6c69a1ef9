use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid order quantity after rounding. Requested: {requested}, Rounded: {rounded}")]
    InvalidQuantity { requested: String, rounded: String },

    #[error("Invalid order price: {0}")]
    InvalidPrice(String),

    #[error("API error: {0}")]
    Api(#[from] api_client::error::ApiError),
}
