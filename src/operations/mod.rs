pub mod add;
pub mod balance;
pub mod category;
pub mod edit;
pub mod history;
pub mod import;
pub mod remove;
pub mod search;
