//! Node executor: runs the snapshot intake of a node together with the
//! agreement hook and the gossip transport. Kept apart from the binary, so
//! that tests and tools can run many nodes in one process.
use anyhow::Context as _;
use meridian_concurrency::{ctx, error::Wrap as _, scope};
use meridian_engine::{
    PersistentSnapshotStore, QueueConfig, SnapshotStore, SnapshotStoreRunner,
};
use meridian_roles::{
    node,
    snapshot::{Genesis, Snapshot, SnapshotHash},
    transaction::SignedTransaction,
};
use std::sync::Arc;

pub mod kernel;
pub mod network;

pub use kernel::Kernel;

/// Config of the node executor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Node's secret key. It identifies the node as a peer and signs snapshots.
    pub node_key: node::SecretKey,
    /// Genesis of the network. The genesis nodes form the committee.
    pub genesis: Genesis,
    /// Snapshot queue parameters.
    pub queue: QueueConfig,
}

/// A running node: snapshot store, agreement hook and gossip.
#[derive(Debug)]
pub struct Executor {
    config: Config,
    store: Arc<SnapshotStore>,
    kernel: Kernel,
}

impl Executor {
    /// Constructs the node on top of `persistent` and persists the genesis snapshots.
    /// The node processes snapshots only while the returned runner runs.
    pub async fn new(
        ctx: &ctx::Ctx,
        config: Config,
        persistent: Box<dyn PersistentSnapshotStore>,
        gossip: Box<dyn network::Gossip>,
        inbox: network::Inbox,
    ) -> ctx::Result<(Arc<Self>, ExecutorRunner)> {
        config.genesis.verify().context("genesis.verify()")?;
        let committee = config.genesis.committee().context("genesis.committee()")?;
        let (store, store_runner) = SnapshotStore::new(persistent, &config.queue);
        let mut written = 0;
        for snapshot in config.genesis.snapshots() {
            if store.write_snapshot(ctx, &snapshot).await.wrap("write_snapshot()")? {
                written += 1;
            }
        }
        tracing::info!(
            "node {:?}: {written} genesis snapshots written, network {}",
            config.node_key.public(),
            config.genesis.network_id()
        );
        let kernel = Kernel::new(config.node_key.clone(), committee, store.clone(), gossip);
        let this = Arc::new(Self {
            config,
            store,
            kernel,
        });
        let runner = ExecutorRunner {
            executor: this.clone(),
            store_runner,
            inbox,
        };
        Ok((this, runner))
    }

    /// Config of the node.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Public key of the node.
    pub fn public_key(&self) -> node::PublicKey {
        self.config.node_key.public()
    }

    /// Snapshot store of the node.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Agreement hook of the node.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Forms a snapshot of a submitted transaction and queues it for agreement.
    pub async fn submit_transaction(
        &self,
        ctx: &ctx::Ctx,
        transaction: SignedTransaction,
    ) -> ctx::Result<SnapshotHash> {
        let snapshot = Snapshot::new(transaction);
        let hash = snapshot.hash();
        tracing::debug!("submitted {:?} as {hash:?}", snapshot.transaction.hash());
        self.store
            .queue_append_snapshot(ctx, self.public_key(), snapshot, false)
            .await?;
        Ok(hash)
    }
}

/// Background tasks of an [`Executor`].
#[must_use]
#[derive(Debug)]
pub struct ExecutorRunner {
    executor: Arc<Executor>,
    store_runner: SnapshotStoreRunner,
    inbox: network::Inbox,
}

impl ExecutorRunner {
    /// Runs the drain loop and the gossip receiver until `ctx` is canceled.
    pub async fn run(self, ctx: &ctx::Ctx) -> anyhow::Result<()> {
        let Self {
            executor,
            store_runner,
            mut inbox,
        } = self;
        let res = scope::run!(ctx, |ctx, s| async {
            s.spawn(async {
                store_runner
                    .run(ctx, &executor.kernel)
                    .await
                    .context("drain loop stopped")?;
                Ok(())
            });
            loop {
                let msg = inbox.recv(ctx).await?;
                executor
                    .store
                    .queue_append_snapshot(ctx, msg.peer, msg.snapshot, msg.finalized)
                    .await?;
            }
        })
        .await;

        match res {
            Ok(()) | Err(ctx::Error::Canceled(_)) => Ok(()),
            Err(ctx::Error::Internal(err)) => Err(err),
        }
    }
}
