//! RocksDB-based implementation of PersistentSnapshotStore.
use anyhow::Context as _;
use meridian_concurrency::{ctx, scope};
use meridian_engine::PersistentSnapshotStore;
use meridian_roles::{
    proto,
    snapshot::{Snapshot, SnapshotHash},
    transaction::TxHash,
};
use rocksdb::{Direction, IteratorMode, ReadOptions};
use std::{
    fmt,
    path::Path,
    sync::{Arc, RwLock},
};

/// Enum used to represent a key in the database. The first byte of an encoded key
/// separates the record kinds, so each kind occupies a contiguous key range.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DatabaseKey {
    /// Snapshot(SnapshotHash) -> Snapshot
    Snapshot(SnapshotHash),
    /// Transaction(TxHash) -> SnapshotHash
    Transaction(TxHash),
    /// Topology(u64) -> SnapshotHash, in write order.
    Topology(u64),
}

impl DatabaseKey {
    const SNAPSHOT: u8 = 1;
    const TRANSACTION: u8 = 2;
    const TOPOLOGY: u8 = 3;

    /// Encodes this key for usage as a RocksDB key.
    fn encode_key(&self) -> Vec<u8> {
        let (prefix, rest) = match self {
            Self::Snapshot(hash) => (Self::SNAPSHOT, hash.0.as_bytes().to_vec()),
            Self::Transaction(hash) => (Self::TRANSACTION, hash.0.as_bytes().to_vec()),
            // Big endian, so that the byte order of the keys is the topology order.
            Self::Topology(n) => (Self::TOPOLOGY, n.to_be_bytes().to_vec()),
        };
        [&[prefix][..], &rest].concat()
    }

    fn decode_topology(key: &[u8]) -> anyhow::Result<u64> {
        anyhow::ensure!(key.first() == Some(&Self::TOPOLOGY), "not a topology key");
        Ok(u64::from_be_bytes(key[1..].try_into().context("topology key")?))
    }
}

/// Number of snapshots, i.e. the topology number of the next snapshot.
fn head(db: &rocksdb::DB) -> anyhow::Result<u64> {
    let mut options = ReadOptions::default();
    options.set_iterate_range(DatabaseKey::Topology(0).encode_key()..);
    let last = DatabaseKey::Topology(u64::MAX).encode_key();
    let Some(res) = db
        .iterator_opt(IteratorMode::From(&last, Direction::Reverse), options)
        .next()
    else {
        return Ok(0);
    };
    let (key, _) = res.context("RocksDB error reading topology head")?;
    Ok(DatabaseKey::decode_topology(&key)? + 1)
}

fn decode_hash(raw: &[u8]) -> anyhow::Result<SnapshotHash> {
    let raw: [u8; 32] = raw.try_into().context("snapshot hash")?;
    Ok(SnapshotHash(raw.into()))
}

struct Inner {
    db: RwLock<rocksdb::DB>,
}

impl Inner {
    fn count_blocking(&self) -> anyhow::Result<u64> {
        head(&self.db.read().unwrap())
    }

    fn snapshot_blocking(&self, hash: &SnapshotHash) -> anyhow::Result<Option<Snapshot>> {
        let db = self.db.read().unwrap();
        let Some(raw) = db
            .get(DatabaseKey::Snapshot(*hash).encode_key())
            .context("RocksDB error")?
        else {
            return Ok(None);
        };
        Ok(Some(proto::decode(&raw).context("failed decoding snapshot")?))
    }

    fn transaction_blocking(&self, hash: &TxHash) -> anyhow::Result<Option<Snapshot>> {
        let raw = self
            .db
            .read()
            .unwrap()
            .get(DatabaseKey::Transaction(*hash).encode_key())
            .context("RocksDB error")?;
        match raw {
            Some(raw) => self.snapshot_blocking(&decode_hash(&raw)?),
            None => Ok(None),
        }
    }

    fn list_blocking(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<Snapshot>> {
        let hashes = {
            let db = self.db.read().unwrap();
            let mut options = ReadOptions::default();
            options.set_iterate_range(
                DatabaseKey::Topology(offset).encode_key()..vec![DatabaseKey::TOPOLOGY + 1],
            );
            let mut hashes = vec![];
            for res in db
                .iterator_opt(IteratorMode::Start, options)
                .take(limit.try_into().unwrap_or(usize::MAX))
            {
                let (_, raw) = res.context("RocksDB error iterating topology")?;
                hashes.push(decode_hash(&raw)?);
            }
            hashes
        };
        let mut snapshots = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            snapshots.push(
                self.snapshot_blocking(hash)?
                    .with_context(|| format!("{hash:?} missing from the topology"))?,
            );
        }
        Ok(snapshots)
    }

    fn write_blocking(&self, snapshot: &Snapshot) -> anyhow::Result<bool> {
        let hash = snapshot.hash();
        // The write lock serializes the topology numbering.
        let db = self.db.write().unwrap();
        let key = DatabaseKey::Snapshot(hash).encode_key();
        if db.get_pinned(&key).context("RocksDB error")?.is_some() {
            return Ok(false);
        }
        let next = head(&db)?;
        let mut write_batch = rocksdb::WriteBatch::default();
        write_batch.put(key, proto::encode(snapshot));
        write_batch.put(
            DatabaseKey::Transaction(snapshot.transaction.hash()).encode_key(),
            hash.0.as_bytes(),
        );
        write_batch.put(DatabaseKey::Topology(next).encode_key(), hash.0.as_bytes());
        db.write(write_batch)
            .context("Failed writing snapshot to database")?;
        Ok(true)
    }
}

/// RocksDB store of finalized snapshots. It holds:
///
/// - the snapshots, by hash;
/// - an index from transaction hash to snapshot hash;
/// - the topology: snapshot hashes in write order.
#[derive(Clone)]
pub struct RocksDB(Arc<Inner>);

impl RocksDB {
    /// Opens the database at `path`, creating it if missing.
    pub async fn open(path: &Path) -> ctx::Result<Self> {
        let mut options = rocksdb::Options::default();
        options.create_missing_column_families(true);
        options.create_if_missing(true);
        let path = path.to_path_buf();
        let db = scope::wait_blocking(move || {
            rocksdb::DB::open(&options, &path)
                .with_context(|| format!("Failed opening RocksDB at {}", path.display()))
        })
        .await?;
        Ok(Self(Arc::new(Inner {
            db: RwLock::new(db),
        })))
    }
}

impl fmt::Debug for RocksDB {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("RocksDB")
    }
}

#[async_trait::async_trait]
impl PersistentSnapshotStore for RocksDB {
    async fn count(&self, _ctx: &ctx::Ctx) -> ctx::Result<u64> {
        let inner = self.0.clone();
        Ok(scope::wait_blocking(move || inner.count_blocking()).await?)
    }

    async fn snapshot(&self, _ctx: &ctx::Ctx, hash: &SnapshotHash) -> ctx::Result<Option<Snapshot>> {
        let (inner, hash) = (self.0.clone(), *hash);
        Ok(scope::wait_blocking(move || inner.snapshot_blocking(&hash))
            .await
            .with_context(|| format!("{hash:?}"))?)
    }

    async fn transaction(&self, _ctx: &ctx::Ctx, hash: &TxHash) -> ctx::Result<Option<Snapshot>> {
        let (inner, hash) = (self.0.clone(), *hash);
        Ok(scope::wait_blocking(move || inner.transaction_blocking(&hash))
            .await
            .with_context(|| format!("{hash:?}"))?)
    }

    async fn list(&self, _ctx: &ctx::Ctx, offset: u64, limit: u64) -> ctx::Result<Vec<Snapshot>> {
        let inner = self.0.clone();
        Ok(scope::wait_blocking(move || inner.list_blocking(offset, limit)).await?)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(hash = ?snapshot.hash()))]
    async fn write(&self, _ctx: &ctx::Ctx, snapshot: &Snapshot) -> ctx::Result<bool> {
        let (inner, snapshot) = (self.0.clone(), snapshot.clone());
        Ok(scope::wait_blocking(move || inner.write_blocking(&snapshot)).await?)
    }
}
