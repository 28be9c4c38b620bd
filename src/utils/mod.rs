pub mod error;
pub mod retry;

pub use error::AppError;
pub use retry::RetryPolicy;
