pub mod auth;
pub mod booking;
pub mod errors;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod middleware;

pub use auth::*;
pub use booking::*;
pub use errors::{ApiError, ApiJson, ApiResult, RecordId};
pub use health::*;
pub use menu::*;
pub use metrics::*;
pub use middleware::*;
