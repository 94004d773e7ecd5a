pub mod balance_repository;
pub mod category_repository;
pub mod connection;
pub mod transaction_repository;
