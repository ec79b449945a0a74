mod app;
mod cli;
mod config;
mod dispatch;
mod error;
mod fixture;
mod input;
mod menu;
mod model;
mod pagination;
mod sort;
mod store;
mod transport;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, Completion};
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfig;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use fixture::{FixtureData, FixtureTransport};
use futures::StreamExt;
use model::ResourceKind;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use transport::Transport;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = RuntimeConfig::resolve(&args)?;
    if let Some(source) = &config.source {
        info!(source = %source, "runtime config loaded");
    }

    let (data, backend) = match &config.fixtures {
        Some(path) => (
            FixtureData::load(path)?,
            format!("fixtures {}", path.display()),
        ),
        None => (FixtureData::demo(), "built-in demo".to_string()),
    };
    info!(
        backend = %backend,
        page_size = config.page_size,
        latency_ms = config.latency.as_millis() as u64,
        "starting"
    );
    let transport: Arc<dyn Transport> = Arc::new(FixtureTransport::new(data, config.latency));

    let mut app = App::new(config.page_size, backend);
    run(&mut app, transport, config.start_namespace, config.start_view).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // Logs never reach the terminal the UI draws on.
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(
    app: &mut App,
    transport: Arc<dyn Transport>,
    start_namespace: Option<String>,
    start_view: ResourceKind,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, transport, start_namespace, start_view).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    transport: Arc<dyn Transport>,
    start_namespace: Option<String>,
    start_view: ResourceKind,
) -> Result<()> {
    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
    let mut reader = EventStream::new();

    let command = app.start_in(start_namespace, start_view);
    dispatch_command(command, &transport, &completion_tx);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            dispatch_command(command, &transport, &completion_tx);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_completion = completion_rx.recv() => {
                if let Some(completion) = maybe_completion {
                    let command = app.handle_completion(completion);
                    dispatch_command(command, &transport, &completion_tx);
                }
            }
        }
    }

    Ok(())
}

/// Runs each request on its own task; results come back as completions on
/// the loop's channel in whatever order the backend answers.
fn dispatch_command(
    command: AppCommand,
    transport: &Arc<dyn Transport>,
    completions: &mpsc::UnboundedSender<Completion>,
) {
    let AppCommand::Send(requests) = command else {
        return;
    };

    for outbound in requests {
        let transport = Arc::clone(transport);
        let completions = completions.clone();
        tokio::spawn(async move {
            let result = transport.execute(&outbound.request).await;
            if completions.send(Completion::of(&outbound, result)).is_err() {
                debug!(request = %outbound.request, "completion dropped after shutdown");
            }
        });
    }
}
