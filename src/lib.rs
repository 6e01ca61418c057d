pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod fetch;
pub mod observability;
pub mod poller;
