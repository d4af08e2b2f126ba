//! Persisted snapshots in topology order.
use super::internal_error;
use jsonrpsee::{core::RpcResult, types::Params};
use meridian_concurrency::ctx;
use meridian_executor::Executor;
use meridian_roles::{
    node,
    snapshot::{Snapshot, SnapshotHash, SnapshotSignature},
    transaction::{Transaction, TxHash},
};

/// Upper bound of the `limit` param.
pub const MAX_LIMIT: u64 = 100_000;

/// Snapshot as listed by the RPC.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SnapshotRecord {
    /// Snapshot hash.
    pub hash: SnapshotHash,
    /// Position of the snapshot in the persistence order.
    pub topology: u64,
    /// Snapshot format version.
    pub version: u32,
    /// Hash of the transaction.
    pub transaction_hash: TxHash,
    /// Transaction payload.
    pub transaction: Transaction,
    /// Per-input signatures of the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<Vec<node::Signature>>>,
    /// Committee signatures of the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee: Option<Vec<SnapshotSignature>>,
}

impl SnapshotRecord {
    /// Record of `snapshot` at position `topology`.
    pub fn new(snapshot: Snapshot, topology: u64, include_signatures: bool) -> Self {
        let hash = snapshot.hash();
        let transaction_hash = snapshot.transaction.hash();
        let (signatures, committee) = if include_signatures {
            (
                Some(snapshot.transaction.signatures),
                Some(snapshot.signatures),
            )
        } else {
            (None, None)
        };
        Self {
            hash,
            topology,
            version: snapshot.version,
            transaction_hash,
            transaction: snapshot.transaction.transaction,
            signatures,
            committee,
        }
    }
}

/// Lists up to `limit` snapshots starting at topology `offset`.
///
/// Params: `[offset, limit, include_signatures, finalized_only]`. The node persists
/// finalized snapshots only, so `finalized_only` does not change the result.
pub async fn callback(
    ctx: &ctx::Ctx,
    executor: &Executor,
    params: Params<'_>,
) -> RpcResult<serde_json::Value> {
    let (offset, limit, include_signatures, _finalized_only): (u64, u64, bool, bool) =
        params.parse()?;
    let snapshots = executor
        .store()
        .list(ctx, offset, limit.min(MAX_LIMIT))
        .await
        .map_err(internal_error)?;
    let records: Vec<_> = (offset..)
        .zip(snapshots)
        .map(|(topology, s)| SnapshotRecord::new(s, topology, include_signatures))
        .collect();
    Ok(serde_json::json!(records))
}

/// List snapshots method name.
pub fn method() -> &'static str {
    "listsnapshots"
}
