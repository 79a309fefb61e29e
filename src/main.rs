// FallWatch: Host Demo
//
// Replays a scripted fall through the engine with console collaborators:
//   1. Load config (defaults, or a TOML file).
//   2. Start the engine against the replay sensor source.
//   3. Optionally answer the alert after a delay, or hold the SOS button.
//   4. Stop after the escalation window and print the counters.

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fallwatch::drivers::alert::{AlertActions, AlertPresenter};
use fallwatch::drivers::foreground::ForegroundFlag;
use fallwatch::drivers::outbound::MessageChannel;
use fallwatch::drivers::replay::ReplaySource;
use fallwatch::{Collaborators, Engine, EngineConfig, SendError};

#[derive(Debug, Parser)]
#[command(name = "fallwatch", about = "Replay a scripted fall through the detection engine")]
struct Cli {
    /// TOML file overriding detection and escalation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the escalation delay (ms).
    #[arg(long)]
    escalation_delay_ms: Option<u64>,

    /// Treat the application as visible when the fall is detected.
    #[arg(long)]
    foreground: bool,

    /// Simulate a user who never granted the notification permission.
    #[arg(long)]
    deny_permission: bool,

    /// Dismiss the fall alert this many ms after it appears.
    #[arg(long)]
    dismiss_after_ms: Option<u64>,

    /// Hold the SOS button for this many ms at start.
    #[arg(long)]
    sos_hold_ms: Option<u64>,
}

struct ConsolePresenter {
    permitted: bool,
    dismiss_after: Option<Duration>,
}

impl AlertPresenter for ConsolePresenter {
    fn notifications_permitted(&self) -> bool {
        self.permitted
    }

    fn show_confirmation(&mut self) {
        log::info!("[ui] Did you fall? (confirm / cancel)");
    }

    fn show_initial_alert(&mut self, actions: AlertActions) {
        log::info!(
            "[notification] Fall detected! Tap to open or dismiss if this was a false trigger ({})",
            actions.token()
        );
        if let Some(delay) = self.dismiss_after {
            // Stand-in for the user swiping the notification away.
            thread::spawn(move || {
                thread::sleep(delay);
                log::info!("[notification] dismissed by user");
                actions.dismiss();
            });
        }
    }

    fn show_escalated_alert(&mut self) {
        log::warn!("[notification] No response. Contacting emergency services");
    }

    fn clear(&mut self) {
        log::info!("[notification] cleared");
    }

    fn show_send_failed(&mut self, error: &SendError) {
        log::error!("[ui] Emergency message failed: {error}");
    }

    fn show_sos_countdown(&mut self, remaining_secs: u64) {
        log::info!("[ui] Keep pressing... {remaining_secs}s");
    }
}

struct ConsoleChannel {
    contact: String,
}

impl MessageChannel for ConsoleChannel {
    fn send(&mut self, message: String) -> Result<(), SendError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "smsto:{} {}", self.contact, message)
            .and_then(|()| stdout.flush())
            .map_err(|e| SendError::Rejected(e.to_string()))
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(delay) = cli.escalation_delay_ms {
        config.escalation_delay_ms = delay;
    }
    config.validate()?;

    let run_for = config.escalation_delay()
        + cli.sos_hold_ms.map_or(Duration::ZERO, Duration::from_millis)
        + Duration::from_secs(2);

    let collaborators = Collaborators {
        sensors: Box::new(ReplaySource::new(ReplaySource::fall_script())),
        presenter: Box::new(ConsolePresenter {
            permitted: !cli.deny_permission,
            dismiss_after: cli.dismiss_after_ms.map(Duration::from_millis),
        }),
        foreground: Box::new(ForegroundFlag::new(cli.foreground)),
        channel: Box::new(ConsoleChannel {
            contact: config.emergency_contact.clone(),
        }),
    };

    let mut engine = Engine::start(config, collaborators)?;
    let handle = engine.handle();

    if let Some(hold_ms) = cli.sos_hold_ms {
        handle.press_sos()?;
        thread::sleep(Duration::from_millis(hold_ms));
        handle.release_sos()?;
    }

    thread::sleep(run_for);
    engine.stop();

    let diag = engine.diagnostics();
    log::info!(
        "Samples {} (dropped {}), falls {}, alerts {}, escalations {}",
        diag.samples_processed,
        diag.samples_dropped,
        diag.falls_detected,
        diag.alerts_opened,
        diag.escalations,
    );
    log::info!(
        "Sent {}, permission denials {}, send failures {}, unavailable sensors {:?}",
        diag.emergencies_sent,
        diag.permission_denials,
        diag.send_failures,
        diag.unavailable_sensors,
    );
    Ok(())
}
