use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use canopy_wm::actor::broadcast::{ChannelSink, ListenerId};
use canopy_wm::actor::config_watcher::ConfigWatcher;
use canopy_wm::actor::reactor::Reactor;
use canopy_wm::bus::Bus;
use canopy_wm::common::config::Config;
use canopy_wm::common::log;
use canopy_wm::ipc::IpcMessageHandler;
use clap::Parser;
use tracing::{info, warn};

/// Tiling window manager engine.
///
/// Reads IPC requests from stdin, one per line, and writes replies and
/// subscribed events to stdout.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Config file to use instead of ~/.config/canopy/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate the config and exit.
    #[arg(long)]
    check: bool,

    /// Do not reload the config when the file changes.
    #[arg(long)]
    no_watch: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    sigpipe::reset();
    let cli = Cli::parse();
    log::init_logging(cli.verbose);

    let path = cli.config.clone().or_else(Config::default_path);
    let config = match &path {
        Some(path) if path.exists() => {
            Config::read(path).with_context(|| format!("loading {}", path.display()))?
        }
        Some(path) if cli.config.is_some() => {
            anyhow::bail!("config file {} does not exist", path.display())
        }
        _ => Config::default(),
    };
    if cli.check {
        println!("config ok");
        return Ok(());
    }

    let (event_tx, event_rx) = crossbeam_channel::unbounded::<(ListenerId, String)>();
    let bus = Bus::new(config).with_sink(ChannelSink::new(event_tx));
    let (reactor, reactor_thread) = Reactor::spawn(bus).context("starting the reactor")?;

    let printer = thread::Builder::new()
        .name("event-printer".to_string())
        .spawn(move || {
            for (_, message) in event_rx {
                println!("{message}");
            }
        })
        .context("starting the event printer")?;

    if let Some(path) = path.filter(|p| p.exists() && !cli.no_watch) {
        if let Err(err) = ConfigWatcher::new(path, reactor.clone()).spawn() {
            warn!(%err, "config changes will not be picked up");
        }
    }

    info!("ready");
    let ipc = IpcMessageHandler::new(reactor.clone());
    let stdout = io::stdout();
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = ipc.handle_message(ListenerId(0), &line);
        writeln!(stdout.lock(), "{reply}").context("writing reply")?;
    }

    reactor.shutdown();
    let bus = reactor_thread
        .join()
        .map_err(|_| anyhow::anyhow!("the reactor thread panicked"))?;
    drop(bus);
    drop(reactor);
    drop(ipc);
    printer.join().map_err(|_| anyhow::anyhow!("the event printer panicked"))?;
    Ok(())
}
