pub mod entities;
pub mod posts;
pub mod types;
