// Repositories module - data access layer

pub mod booking_repository;
pub mod database;
pub mod menu_repository;
pub mod user_repository;


pub use booking_repository::{BookingRepository, SqliteBookingRepository};
pub use database::Database;
pub use menu_repository::{MenuRepository, SqliteMenuRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};
