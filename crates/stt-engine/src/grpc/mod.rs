mod client;
pub mod proto;

pub use client::{ApiKey, ConnectOptions, GrpcChannel, API_KEY_HEADER};
