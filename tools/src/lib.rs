//! Node binary support: configuration, RocksDB persistence and the RPC server.
#![allow(missing_docs)]
mod config;
pub mod rpc;
pub mod store;


pub use config::{decode_json, encode_json, AppConfig, ConfigPaths, Configs, QueueSettings};
