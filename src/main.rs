use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use healthwatch::{render_json, render_line, Assessment, Expectations, Overrides, Settings};
use healthwatch_client::{HealthMonitor, StatusSnapshot};

#[derive(Parser, Debug)]
#[command(name = "healthwatch")]
#[command(about = "Follow the live health feed of a local recorder")]
struct Args {
    /// Health feed URL (default ws://127.0.0.1:3030/ws/health)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay before reconnecting after a failure (e.g., "2s", "500ms")
    #[arg(long)]
    retry: Option<String>,

    /// Give up on a connection attempt after this long (e.g., "5s")
    #[arg(long)]
    connect_timeout: Option<String>,

    /// Print one JSON object per update instead of a text line
    #[arg(long)]
    json: bool,

    /// Exit after the first real status; exit code 1 unless healthy
    #[arg(long)]
    once: bool,

    /// Do not require audio capture to be healthy
    #[arg(long)]
    no_audio: bool,

    /// Do not require UI capture to be healthy
    #[arg(long)]
    no_ui: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            retry_interval: self.retry.clone(),
            connect_timeout: self.connect_timeout.clone(),
            expect_audio: self.no_audio.then_some(false),
            expect_ui: self.no_ui.then_some(false),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only status lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;

    let rt = tokio::runtime::Runtime::new()?;
    let last = rt.block_on(follow(settings, args.json, args.once))?;

    if args.once && last != Some(Assessment::Healthy) {
        std::process::exit(1);
    }
    Ok(())
}

/// Print every delivered update until interrupted, or until the first real
/// status when `once` is set. Returns the last verdict printed.
async fn follow(settings: Settings, json: bool, once: bool) -> Result<Option<Assessment>> {
    let Settings {
        monitor: config,
        expectations,
    } = settings;

    let monitor = HealthMonitor::new(config)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<Option<StatusSnapshot>>();
    let subscription = monitor.subscribe(move |status| {
        let _ = tx.send(status.cloned());
    });
    monitor.ensure_started();

    let mut last = None;
    loop {
        tokio::select! {
            delivery = rx.recv() => {
                let Some(status) = delivery else { break };
                let assessment = print_update(status.as_ref(), &expectations, json)?;
                last = Some(assessment);
                if once && assessment.is_settled() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    monitor.unsubscribe(subscription);
    monitor.shutdown().await;
    Ok(last)
}

fn print_update(
    status: Option<&StatusSnapshot>,
    expectations: &Expectations,
    json: bool,
) -> Result<Assessment> {
    let line = if json {
        render_json(status, expectations)?
    } else {
        render_line(status, expectations)
    };
    println!("{}", line);
    Ok(Assessment::of(status, expectations))
}
