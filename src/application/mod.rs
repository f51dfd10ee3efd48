pub mod blog;
pub mod error;
pub mod mail;
pub mod pagination;
pub mod repos;
pub mod search;
pub mod share;
