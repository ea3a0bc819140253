//! Business rules over the [`Store`](crate::db::Store)

pub mod reservation_manager;
pub mod table_manager;
pub mod user_manager;
pub mod validation;

pub use reservation_manager::ReservationManager;
pub use table_manager::TableManager;
pub use user_manager::UserManager;
pub use validation::InputValidator;
