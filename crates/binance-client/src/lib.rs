pub mod client;
pub mod models;
mod rate_limit;

pub use account_source::AccountDataSource;
pub use client::{BinanceClient, DEFAULT_BASE_URL};
