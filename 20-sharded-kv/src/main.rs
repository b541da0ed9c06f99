use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use sharded_kv::{
    cli::Cli,
    placement::NodeId,
    shell::Shell,
    store::ShardedStore,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut store = ShardedStore::with_nodes(usize::from(cli.nodes));
    if let Some(id) = cli.pin_source {
        store
            .pin_source(NodeId(id))
            .context("invalid --pin-source")?;
    }
    info!(nodes = store.node_count(), "store ready");

    let mut shell = Shell::new(store).with_prompt(!cli.no_prompt);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    tokio::select! {
        result = shell.run(&mut stdin, &mut stdout) => result?,
        ctrl_c = tokio::signal::ctrl_c() => {
            if let Err(error) = ctrl_c {
                warn!(?error, "ctrl-c handler failed");
            }
        }
    }

    Ok(())
}
