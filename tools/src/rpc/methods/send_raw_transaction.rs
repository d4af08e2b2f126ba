//! Submission of a signed transaction, hex-encoded.
use super::{internal_error, invalid_params};
use anyhow::Context as _;
use jsonrpsee::{core::RpcResult, types::Params};
use meridian_concurrency::ctx;
use meridian_executor::Executor;
use meridian_roles::{proto, transaction::SignedTransaction};

/// Decodes a hex-encoded signed transaction.
pub fn decode(raw: &str) -> anyhow::Result<SignedTransaction> {
    let bytes = hex::decode(raw.trim()).context("hex")?;
    proto::decode(&bytes).context("transaction")
}

/// Queues the transaction for agreement and returns its hash.
pub async fn callback(
    ctx: &ctx::Ctx,
    executor: &Executor,
    params: Params<'_>,
) -> RpcResult<serde_json::Value> {
    let (raw,): (String,) = params.parse()?;
    let transaction = decode(&raw).map_err(invalid_params)?;
    let hash = transaction.hash();
    executor
        .submit_transaction(ctx, transaction)
        .await
        .map_err(internal_error)?;
    Ok(serde_json::json!({ "hash": hash }))
}

/// Send transaction method name.
pub fn method() -> &'static str {
    "sendrawtransaction"
}
