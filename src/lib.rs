pub mod auth;
pub mod config;
pub mod engine;
pub mod export;
pub mod journal;
pub mod limits;
pub mod model;
pub mod observability;
pub mod seed;
pub mod source;
pub mod sql;
pub mod sync;
pub mod tenant;
pub mod tls;
pub mod wire;
