//! Node info: identity, network and queue counters.
use super::internal_error;
use jsonrpsee::core::RpcResult;
use meridian_concurrency::ctx;
use meridian_executor::Executor;

/// Info response.
pub async fn callback(ctx: &ctx::Ctx, executor: &Executor) -> RpcResult<serde_json::Value> {
    let info = executor
        .store()
        .queue_info(ctx)
        .await
        .map_err(internal_error)?;
    Ok(serde_json::json!({
        "node": executor.public_key(),
        "network": executor.config().genesis.network_id(),
        "version": env!("CARGO_PKG_VERSION"),
        "queue": {
            "persisted": info.persisted,
            "length": info.queue_length,
        },
        "pending": executor.kernel().pending_len(),
    }))
}

/// Info method name.
pub fn method() -> &'static str {
    "getinfo"
}
