use super::methods::{self, health_check};
use jsonrpsee::{
    core::RpcResult,
    server::{middleware::http::ProxyGetRequestLayer, RpcModule, Server},
    types::{error::ErrorCode, Params},
};
use meridian_concurrency::{
    ctx::{self, channel},
    scope,
};
use meridian_executor::Executor;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::oneshot;

/// Call received by the server, executed within the scope of [`RpcServer::run`].
struct Call {
    method: &'static str,
    params: Params<'static>,
    response: oneshot::Sender<RpcResult<serde_json::Value>>,
}

/// JSON-RPC server of a node.
#[derive(Debug)]
pub struct RpcServer {
    addr: SocketAddr,
    executor: Arc<Executor>,
}

impl RpcServer {
    /// Server of `executor`, listening on `addr`.
    pub fn new(addr: SocketAddr, executor: Arc<Executor>) -> Self {
        Self { addr, executor }
    }

    /// Module forwarding every call to `calls`.
    fn module(calls: channel::UnboundedSender<Call>) -> anyhow::Result<RpcModule<channel::UnboundedSender<Call>>> {
        let mut module = RpcModule::new(calls);
        for method in methods::methods() {
            module.register_async_method(method, move |params, calls, _| async move {
                let (send, recv) = oneshot::channel();
                calls.send(Call {
                    method,
                    params,
                    response: send,
                });
                // The sender is dropped without a response if the server is stopping.
                recv.await
                    .unwrap_or_else(|_| Err(ErrorCode::InternalError.into()))
            })?;
        }
        Ok(module)
    }

    /// Serves calls until `ctx` is canceled.
    pub async fn run(self, ctx: &ctx::Ctx) -> anyhow::Result<()> {
        let (send, mut recv) = channel::unbounded();
        // Custom tower service to handle the RPC requests
        let service_builder = tower::ServiceBuilder::new()
            // Proxy `GET /health` requests to the `health_check` method.
            .layer(ProxyGetRequestLayer::new(
                health_check::path(),
                health_check::method(),
            )?);
        let server = Server::builder()
            .set_http_middleware(service_builder)
            .build(self.addr)
            .await?;
        tracing::info!("RPC server listening on {}", server.local_addr()?);
        let handle = server.start(Self::module(send)?);

        let executor = &*self.executor;
        let res = scope::run!(ctx, |ctx, s| async {
            loop {
                let call: Call = recv.recv(ctx).await?;
                s.spawn(async move {
                    let res = methods::call(ctx, executor, call.method, call.params).await;
                    // The client may be gone already.
                    let _ = call.response.send(res);
                    Ok(())
                });
            }
        })
        .await;

        let _ = handle.stop();
        handle.stopped().await;
        match res {
            Ok(()) | Err(ctx::Error::Canceled(_)) => Ok(()),
            Err(ctx::Error::Internal(err)) => Err(err),
        }
    }
}
