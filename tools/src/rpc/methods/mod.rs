//! Methods of the RPC server.
//!
//! Every method is a module with the method name and an async `callback`,
//! which gets the node and the raw params of the call.
use jsonrpsee::{
    core::RpcResult,
    types::{error::ErrorCode, ErrorObjectOwned, Params},
};
use meridian_concurrency::ctx;
use meridian_executor::Executor;

pub mod get_info;
pub mod get_transaction;
pub mod health_check;
pub mod list_snapshots;
pub mod send_raw_transaction;

/// Names of all the methods served.
pub fn methods() -> [&'static str; 5] {
    [
        health_check::method(),
        get_info::method(),
        send_raw_transaction::method(),
        list_snapshots::method(),
        get_transaction::method(),
    ]
}

/// Executes the call of `method`.
pub(crate) async fn call(
    ctx: &ctx::Ctx,
    executor: &Executor,
    method: &str,
    params: Params<'_>,
) -> RpcResult<serde_json::Value> {
    match method {
        m if m == health_check::method() => health_check::callback(),
        m if m == get_info::method() => get_info::callback(ctx, executor).await,
        m if m == send_raw_transaction::method() => {
            send_raw_transaction::callback(ctx, executor, params).await
        }
        m if m == list_snapshots::method() => list_snapshots::callback(ctx, executor, params).await,
        m if m == get_transaction::method() => {
            get_transaction::callback(ctx, executor, params).await
        }
        _ => Err(ErrorCode::MethodNotFound.into()),
    }
}

/// Error of a call with malformed params.
pub(crate) fn invalid_params(err: anyhow::Error) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(ErrorCode::InvalidParams.code(), format!("{err:#}"), None::<()>)
}

/// Error of a call which failed on the node side. The cause is logged, not returned.
pub(crate) fn internal_error(err: ctx::Error) -> ErrorObjectOwned {
    match err {
        ctx::Error::Canceled(_) => {
            ErrorObjectOwned::owned(ErrorCode::InternalError.code(), "node is stopping", None::<()>)
        }
        ctx::Error::Internal(err) => {
            tracing::warn!("RPC call failed: {err:#}");
            ErrorCode::InternalError.into()
        }
    }
}
