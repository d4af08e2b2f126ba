//! Node configuration.
use crate::store;
use anyhow::Context as _;
use meridian_concurrency::{ctx, time};
use meridian_crypto::{Text, TextFmt as _};
use meridian_engine::QueueConfig;
use meridian_executor::{self as executor, network};
use meridian_roles::{node, snapshot::Genesis};
use rand::Rng;
use std::{
    fs,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Port of the RPC server of the first local node. Node `i` listens on `NODES_PORT + i`.
const NODES_PORT: u16 = 3054;

/// Decodes a JSON document, rejecting trailing data.
pub fn decode_json<T: serde::de::DeserializeOwned>(json: &str) -> anyhow::Result<T> {
    let mut d = serde_json::Deserializer::from_str(json);
    let p = T::deserialize(&mut d)?;
    d.end()?;
    Ok(p)
}

/// Encodes a value as pretty-printed JSON.
pub fn encode_json<T: serde::Serialize>(x: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(x)?)
}

/// Snapshot queue settings, as stored in the config file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    /// Slots per channel.
    pub capacity: usize,
    /// Re-check interval of a put waiting for a free slot, in milliseconds.
    pub retry_interval_ms: u32,
    /// Re-check interval of an idle drain loop, in milliseconds.
    pub poll_interval_ms: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 1 << 20,
            retry_interval_ms: 100,
            poll_interval_ms: 100,
        }
    }
}

impl QueueSettings {
    /// Validates the settings and converts them to the queue parameters.
    pub fn queue_config(&self) -> anyhow::Result<QueueConfig> {
        anyhow::ensure!(self.capacity > 0, "capacity has to be positive");
        anyhow::ensure!(self.retry_interval_ms > 0, "retry_interval_ms has to be positive");
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms has to be positive");
        Ok(QueueConfig {
            capacity: self.capacity,
            retry_interval: time::Duration::milliseconds(self.retry_interval_ms.into()),
            poll_interval: time::Duration::milliseconds(self.poll_interval_ms.into()),
        })
    }
}

/// Application settings of a node, read from `config.json`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Address of the JSON-RPC server.
    pub server_addr: SocketAddr,
    /// Address of the prometheus exporter. Metrics are not exported if unset.
    #[serde(default)]
    pub metrics_server_addr: Option<SocketAddr>,
    /// Directory of the RocksDB database.
    pub database: PathBuf,
    /// Snapshot queue settings.
    #[serde(default)]
    pub queue: QueueSettings,
}

impl AppConfig {
    /// Config of a node listening on `port` on all interfaces.
    pub fn for_port(port: u16, database: PathBuf) -> Self {
        Self {
            server_addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port),
            metrics_server_addr: None,
            database,
            queue: QueueSettings::default(),
        }
    }

    pub fn with_metrics_server_addr(&mut self, addr: SocketAddr) -> &mut Self {
        self.metrics_server_addr = Some(addr);
        self
    }

    pub fn with_queue(&mut self, queue: QueueSettings) -> &mut Self {
        self.queue = queue;
        self
    }
}

/// Paths of the files a node is configured with.
#[derive(Debug)]
pub struct ConfigPaths<'a> {
    /// JSON file with the [`AppConfig`].
    pub app: &'a Path,
    /// JSON file with the network [`Genesis`].
    pub genesis: &'a Path,
    /// Text file with the node secret key.
    pub node_key: &'a Path,
}

/// Everything a node is configured with.
#[derive(Debug, Clone)]
pub struct Configs {
    pub app: AppConfig,
    pub genesis: Genesis,
    pub node_key: node::SecretKey,
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| path.display().to_string())
}

impl<'a> ConfigPaths<'a> {
    /// Loads and validates the configs.
    pub fn load(self) -> anyhow::Result<Configs> {
        let app: AppConfig = decode_json(&read_file(self.app)?)
            .with_context(|| format!("{}: failed decoding JSON", self.app.display()))?;
        app.queue.queue_config().context("queue")?;

        let genesis: Genesis = decode_json(&read_file(self.genesis)?)
            .with_context(|| format!("{}: failed decoding JSON", self.genesis.display()))?;
        genesis.verify().context("genesis")?;

        let node_key = Text::new(read_file(self.node_key)?.trim())
            .decode()
            .with_context(|| format!("{}: failed decoding key", self.node_key.display()))?;
        Ok(Configs {
            app,
            genesis,
            node_key,
        })
    }
}

impl Configs {
    /// Configs of a local network of `nodes` nodes, with databases under `root`.
    pub fn localnet(rng: &mut impl Rng, nodes: usize, root: &Path) -> Vec<Self> {
        let (genesis, keys) = meridian_roles::snapshot::testonly::localnet(rng, nodes);
        keys.into_iter()
            .enumerate()
            .map(|(i, node_key)| {
                let port = NODES_PORT + i as u16;
                Self {
                    app: AppConfig::for_port(port, root.join(format!("node{i}")).join("database")),
                    genesis: genesis.clone(),
                    node_key,
                }
            })
            .collect()
    }

    /// Writes the configs to `dir`, under the file names the binary reads by default.
    pub fn write_to_dir(&self, dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(dir).context("create_dir_all()")?;
        fs::write(dir.join("config.json"), encode_json(&self.app)?).context("config.json")?;
        fs::write(dir.join("genesis.json"), encode_json(&self.genesis)?).context("genesis.json")?;
        fs::write(dir.join("node_key"), self.node_key.encode()).context("node_key")?;
        Ok(())
    }

    /// Executor config of the node.
    pub fn executor_config(&self) -> anyhow::Result<executor::Config> {
        Ok(executor::Config {
            node_key: self.node_key.clone(),
            genesis: self.genesis.clone(),
            queue: self.app.queue.queue_config()?,
        })
    }

    /// Opens the database and constructs the node executor.
    pub async fn make_executor(
        &self,
        ctx: &ctx::Ctx,
        gossip: Box<dyn network::Gossip>,
        inbox: network::Inbox,
    ) -> ctx::Result<(Arc<executor::Executor>, executor::ExecutorRunner)> {
        let store = store::RocksDB::open(&self.app.database).await?;
        let config = self.executor_config()?;
        executor::Executor::new(ctx, config, Box::new(store), gossip, inbox).await
    }
}
