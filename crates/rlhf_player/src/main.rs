//! rlhf-player - drive the walkthrough pages from a terminal
//!
//! Reads one command per line on stdin and answers each with one JSON line
//! on stdout. Pages that animate (token shift transitions, the advantage
//! scan, PPO auto-play, ...) emit a fresh snapshot whenever their timer
//! fires. Logs go to stderr; set `RUST_LOG` to adjust.
//!
//! Config is read from the OS data dir:
//! - Linux: ~/.local/share/rlhf_viz/config.json
//! - Windows: %APPDATA%\rlhf_viz\config.json
//! - MacOS: ~/Library/Application Support/rlhf_viz/config.json

use std::path::PathBuf;
use std::process;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod error;
mod paths;
mod player;
mod ticker;

use config::PlayerConfig;
use error::Result;
use paths::AppPaths;
use player::{Player, Reply};
use rlhf_pages::PageKind;
use ticker::Ticker;

fn usage() -> ! {
    eprintln!("rlhf-player: step through the RLHF walkthrough pages");
    eprintln!("Usage: rlhf-player [--config <file>] [--page <page>] [--seed <n>] [--pretty]\n");
    eprintln!("Pages:");
    for kind in PageKind::all() {
        eprintln!("  {:<18}{}", kind.label(), kind.path());
    }
    eprintln!("\nCommands (stdin, one per line):");
    for (usage, description) in command::HELP {
        eprintln!("  {usage:<36}{description}");
    }
    process::exit(1);
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    page: Option<String>,
    seed: Option<u64>,
    pretty: bool,
}

fn parse_args() -> Args {
    let mut out = Args::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => out.config = Some(args.next().unwrap_or_else(|| usage()).into()),
            "--page" => out.page = Some(args.next().unwrap_or_else(|| usage())),
            "--seed" => {
                let raw = args.next().unwrap_or_else(|| usage());
                out.seed = Some(raw.parse().unwrap_or_else(|_| {
                    eprintln!("--seed must be an unsigned integer, got `{raw}`");
                    process::exit(1)
                }));
            }
            "--pretty" => out.pretty = true,
            "-h" | "--help" => usage(),
            other => {
                eprintln!("unknown argument `{other}`\n");
                usage();
            }
        }
    }
    out
}

fn load_config(args: &Args) -> Result<PlayerConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => AppPaths::new()?.config_file(),
    };
    let mut cfg = PlayerConfig::load(&path)?;
    info!("config: {}", path.display());

    if let Some(page) = &args.page {
        cfg.start_page = page.clone();
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    cfg.pretty |= args.pretty;
    Ok(cfg)
}

async fn write_reply(out: &mut Stdout, reply: &impl Serialize, pretty: bool) -> Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(reply)?
    } else {
        serde_json::to_string(reply)?
    };
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Answer one stdin line; `None` for blank and comment lines. Only a
/// command that went through and is not a query restarts the pending tick.
fn handle_line(player: &mut Player, ticker: &mut Ticker, line: &str) -> Option<Reply> {
    let result = match command::parse(line) {
        Ok(None) => return None,
        Ok(Some(cmd)) => {
            let query = cmd.is_query();
            player.handle(cmd).map(|reply| {
                if !query {
                    ticker.reschedule(player.tick_interval());
                }
                reply
            })
        }
        Err(e) => Err(e),
    };
    Some(result.unwrap_or_else(|e| {
        warn!("{line:?}: {e}");
        Reply::error(e)
    }))
}

/// Advance the page for a delivered tick; stale generations yield `None`.
fn handle_tick(player: &mut Player, ticker: &mut Ticker, generation: u64) -> Option<Reply> {
    if !ticker.is_current(generation) {
        debug!(generation, "stale tick dropped");
        return None;
    }
    ticker.fired();
    let reply = player.tick().unwrap_or_else(|e| {
        warn!("tick: {e}");
        Reply::error(e)
    });
    ticker.reschedule(player.tick_interval());
    Some(reply)
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let cfg = load_config(&args)?;
    let start = cfg.start_page()?;
    let mut player = Player::new(start, cfg.page_settings());
    info!(page = start.label(), seed = cfg.seed, "player ready");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ticker = Ticker::new(tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    write_reply(&mut stdout, &player.snapshot()?, cfg.pretty).await?;
    ticker.reschedule(player.tick_interval());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let Some(reply) = handle_line(&mut player, &mut ticker, &line) else {
                    continue;
                };
                let done = matches!(reply, Reply::Bye);
                write_reply(&mut stdout, &reply, cfg.pretty).await?;
                if done {
                    break;
                }
            }
            Some(generation) = rx.recv() => {
                if let Some(reply) = handle_tick(&mut player, &mut ticker, generation) {
                    write_reply(&mut stdout, &reply, cfg.pretty).await?;
                }
            }
        }
    }

    if ticker.is_pending() {
        debug!("dropping pending tick");
    }
    ticker.cancel();
    info!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlhf_pages::PageSettings;
    use std::time::Duration;

    fn step_index(reply: &Reply) -> u64 {
        let json = serde_json::to_value(reply).unwrap();
        json["snapshot"]["step"]["index"].as_u64().expect("snapshot step index")
    }

    #[tokio::test(start_paused = true)]
    async fn polling_show_keeps_autoplay_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(tx);
        let mut player = Player::new(PageKind::Ppo, PageSettings::default());
        handle_line(&mut player, &mut ticker, "speed 500").unwrap();
        handle_line(&mut player, &mut ticker, "play").unwrap();
        assert!(ticker.is_pending());

        let mut ticks = 0;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(300)).await;
            for line in ["show", "params", "pages", "help", "bogus"] {
                handle_line(&mut player, &mut ticker, line).unwrap();
            }
            while let Ok(generation) = rx.try_recv() {
                if handle_tick(&mut player, &mut ticker, generation).is_some() {
                    ticks += 1;
                }
            }
        }
        assert!(ticks >= 4, "only {ticks} ticks in 3s");
        let shown = handle_line(&mut player, &mut ticker, "show").unwrap();
        assert!(step_index(&shown) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_blank_lines() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ticker = Ticker::new(tx);
        let mut player = Player::new(PageKind::Ppo, PageSettings::default());
        assert!(handle_line(&mut player, &mut ticker, "   ").is_none());
        handle_line(&mut player, &mut ticker, "play").unwrap();
        assert!(ticker.is_pending());
        handle_line(&mut player, &mut ticker, "pause").unwrap();
        assert!(!ticker.is_pending());
    }
}
