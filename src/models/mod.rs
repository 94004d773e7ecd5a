pub mod balance;
pub mod category;
pub mod transaction;
