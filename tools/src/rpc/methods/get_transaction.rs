//! Persisted transaction by hash.
use super::{internal_error, invalid_params};
use anyhow::Context as _;
use jsonrpsee::{core::RpcResult, types::Params};
use meridian_concurrency::ctx;
use meridian_crypto::Text;
use meridian_executor::Executor;
use meridian_roles::transaction::TxHash;

/// The signed transaction, with its hash and the hash of the snapshot carrying it,
/// or `null` if the transaction is not persisted.
pub async fn callback(
    ctx: &ctx::Ctx,
    executor: &Executor,
    params: Params<'_>,
) -> RpcResult<serde_json::Value> {
    let (hash,): (String,) = params.parse()?;
    let hash: TxHash = Text::new(&hash)
        .decode()
        .context("hash")
        .map_err(invalid_params)?;
    let Some(snapshot) = executor
        .store()
        .transaction(ctx, &hash)
        .await
        .map_err(internal_error)?
    else {
        return Ok(serde_json::Value::Null);
    };
    let mut record = serde_json::json!(snapshot.transaction);
    record["hash"] = serde_json::json!(hash);
    record["snapshot"] = serde_json::json!(snapshot.hash());
    Ok(record)
}

/// Get transaction method name.
pub fn method() -> &'static str {
    "gettransaction"
}
