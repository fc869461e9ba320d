//! vehicle-voice: spoken vehicle status announcements.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vehicle_voice::announcer::Announcer;
use vehicle_voice::api::{start_api, ApiState};
use vehicle_voice::config::{Config, SpeechConfig};
use vehicle_voice::facade::NotificationFacade;
use vehicle_voice::history::HistoryLog;
use vehicle_voice::link::CalibrationFlag;
use vehicle_voice::notifier::{DesktopNotifier, ToastSink};
use vehicle_voice::prefs::SharedPreferences;
use vehicle_voice::speech::{HttpSpeechSink, LogSpeechSink, SpeechSink};
use vehicle_voice::telemetry::spawn_mavlink_source;
use vehicle_voice::vehicle::SharedVehicle;

#[derive(Parser, Debug)]
#[command(name = "vehicle-voice", about = "Spoken vehicle status announcements")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen to the vehicle and announce (default)
    Run,
    /// Print the announcement report for a day
    History {
        /// Day to report, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Validate the config and check the speech service
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=warn,reqwest=warn")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(args.config.as_deref());

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::History { date } => {
            print_history(&config, date);
            Ok(())
        }
        Command::Check => check(&config).await,
    }
}

async fn speech_sink(
    config: &SpeechConfig,
    toasts: Arc<dyn ToastSink>,
) -> anyhow::Result<Arc<dyn SpeechSink>> {
    if config.backend == "log" {
        info!("Speech backend: stdout");
        return Ok(Arc::new(LogSpeechSink));
    }

    let sink = Arc::new(HttpSpeechSink::start(config, toasts).context("building speech client")?);
    if let Err(e) = sink.check_status().await {
        warn!("Speech service not ready ({e}), announcements muted until it is");
    }
    sink.clone().spawn_health_check(Duration::from_secs(10));
    Ok(sink)
}

async fn run(config: Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    info!("vehicle-voice starting");

    let prefs = Arc::new(SharedPreferences::from_config(&config));
    let toasts: Arc<dyn ToastSink> = Arc::new(DesktopNotifier::new(config.feedback.notifications));
    let sink = speech_sink(&config.speech, toasts.clone()).await?;
    let mut announcer = Announcer::new(sink, prefs.clone());
    if config.history.enabled {
        announcer = announcer.with_history(HistoryLog::new(config.history.resolve_dir()));
    }
    let announcer = Arc::new(announcer);

    let calibration = CalibrationFlag::default();
    let vehicle = SharedVehicle::default();
    let facade = NotificationFacade::new(
        announcer.clone(),
        toasts,
        prefs.clone(),
        Arc::new(calibration.clone()),
        vehicle.clone(),
    );

    let (tx, rx) = mpsc::channel(64);

    if config.api.enabled {
        let state = ApiState {
            inbound: tx.clone(),
            prefs,
            calibration,
            vehicle: vehicle.clone(),
            link: facade.subscribe_link(),
            scheduler: facade.scheduler(),
            announcer,
        };
        start_api(state, config.api.port).await;
    }

    let source = spawn_mavlink_source(&config.link, vehicle, tx);

    tokio::select! {
        _ = facade.run(rx) => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for Ctrl-C")?;
            info!("Shutting down");
        }
    }
    source.abort();
    Ok(())
}

fn print_history(config: &Config, date: Option<String>) {
    let log = HistoryLog::new(config.history.resolve_dir());
    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    println!("{}", log.report(&date));

    let dates = log.list_dates();
    if !dates.is_empty() && !dates.contains(&date) {
        println!("\nDays with records: {}", dates.join(", "));
    }
}

async fn check(config: &Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    println!("config: ok");
    println!("link: {} (heartbeat timeout {}ms)", config.link.url, config.link.heartbeat_timeout_ms);

    if config.speech.backend == "http" {
        let sink = HttpSpeechSink::start(&config.speech, Arc::new(DesktopNotifier::new(false)))
            .context("building speech client")?;
        sink.check_status()
            .await
            .with_context(|| format!("speech service at {}", config.speech.api_url))?;
        println!("speech: ok ({})", config.speech.api_url);
    } else {
        println!("speech: stdout");
    }
    Ok(())
}
