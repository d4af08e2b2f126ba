//! Node identity. The public key identifies a node in the network, signs its
//! contributions to snapshot agreement and doubles as the account key which
//! controls transaction outputs.

mod keys;
mod testonly;
#[cfg(test)]
mod tests;

pub use keys::*;
