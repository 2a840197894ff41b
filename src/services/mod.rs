// Services module - business logic layer

pub mod auth_service;
pub mod booking_service;
pub mod menu_service;

pub use auth_service::AuthService;
pub use booking_service::BookingService;
pub use menu_service::MenuService;
