//! JSON-RPC over HTTP.
pub mod methods;
mod server;

pub use server::RpcServer;
