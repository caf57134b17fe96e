pub mod cache;
pub mod config;
pub mod export;
pub mod fetch;
pub mod normalize;
