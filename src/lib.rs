pub mod browser;
pub mod checkin;
pub mod config;
pub mod connect;
pub mod plugins;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use checkin::CheckinRunner;
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
