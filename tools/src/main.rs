//! Main binary of the node. It reads the configuration, opens the database, and runs the
//! executor together with the RPC server and the metrics exporter.
use anyhow::Context as _;
use clap::Parser;
use meridian_concurrency::{ctx, scope};
use meridian_executor::network::LocalNetwork;
use meridian_tools::{rpc::RpcServer, ConfigPaths, Configs};
use std::{fs, io::IsTerminal as _, path::PathBuf};
use tracing::metadata::LevelFilter;
use tracing_subscriber::{prelude::*, Registry};
use vise_exporter::MetricsExporter;

/// Command-line application launching a node executor.
#[derive(Debug, Parser)]
struct Args {
    /// Verify configuration instead of launching a node.
    #[arg(long, conflicts_with = "localnet")]
    verify_config: bool,
    /// Run a local network of this many nodes in one process, with generated configs
    /// written to `localnet/`.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=64))]
    localnet: Option<u16>,
    /// Path to a JSON file with node configuration.
    #[arg(long, default_value = "config.json")]
    config_file: PathBuf,
    /// Path to a JSON file with the network genesis.
    #[arg(long, default_value = "genesis.json")]
    genesis_file: PathBuf,
    /// Path to a node key file.
    #[arg(long, default_value = "node_key")]
    node_key: PathBuf,
}

impl Args {
    /// Extracts configuration paths from these args.
    fn config_paths(&self) -> ConfigPaths<'_> {
        ConfigPaths {
            app: &self.config_file,
            genesis: &self.genesis_file,
            node_key: &self.node_key,
        }
    }
}

fn init_logging() -> anyhow::Result<()> {
    fs::create_dir_all("logs/")?;
    let log_file = fs::File::create("logs/output.log")?;

    // Human-readable logs of level INFO or higher on stdout.
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal())
        .with_file(false)
        .with_line_number(false)
        .with_filter(LevelFilter::INFO);

    // Machine-readable logs of level DEBUG or higher in the log file.
    let file_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(LevelFilter::DEBUG);

    let subscriber = Registry::default().with(stdout_log).with(file_log);
    tracing::subscriber::set_global_default(subscriber).context("set_global_default()")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = Args::parse();
    tracing::trace!(?args, "Starting node");
    let ctx = &ctx::root();

    if !args.verify_config {
        init_logging()?;
        tracing::info!("Starting node.");
    }

    let configs = match args.localnet {
        Some(n) => {
            let root = PathBuf::from("localnet");
            let configs = Configs::localnet(&mut ctx.rng(), n.into(), &root);
            for (i, c) in configs.iter().enumerate() {
                c.write_to_dir(&root.join(format!("node{i}")))
                    .with_context(|| format!("node{i}"))?;
            }
            configs
        }
        None => {
            tracing::debug!("Loading config files.");
            vec![args.config_paths().load().context("config_paths().load()")?]
        }
    };

    if args.verify_config {
        tracing::info!("Configuration verified.");
        return Ok(());
    }

    // Nodes of this process gossip in memory. Without a wire transport, a single
    // node finalizes snapshots only if it is the whole committee.
    let network = LocalNetwork::new();
    scope::run!(ctx, |ctx, s| async {
        for (i, configs) in configs.iter().enumerate() {
            let (endpoint, inbox) = network.join(configs.node_key.public());
            let (executor, runner) = configs
                .make_executor(ctx, Box::new(endpoint), inbox)
                .await
                .with_context(|| format!("node{i}: make_executor()"))?;
            tracing::info!(
                "node{i} {:?} serving RPC on {}",
                executor.public_key(),
                configs.app.server_addr
            );
            s.spawn(runner.run(ctx));
            s.spawn(RpcServer::new(configs.app.server_addr, executor).run(ctx));

            if let Some(addr) = configs.app.metrics_server_addr {
                s.spawn_bg(async move {
                    MetricsExporter::default()
                        .with_graceful_shutdown(ctx.canceled())
                        .start(addr)
                        .await?;
                    Ok(())
                });
            }
        }
        Ok(())
    })
    .await
    .context("node stopped")
}
