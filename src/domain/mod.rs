pub mod amount;
pub mod history;
pub mod notification;
pub mod pending;
pub mod transaction;
