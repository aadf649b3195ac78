mod app;
mod command;
mod event;
mod markdown;
mod session_log;
mod theme;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use atchat::config::data_dir;
use atchat::*;
use clap::Parser;
use crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use app::App;
use event::AppEvent;
use session_log::SessionLogger;

#[derive(Parser)]
#[command(name = "atchat", version, about = "Chat with a relayed model, attaching workspace files with @name")]
struct Args {
    /// Workspace root (repeatable; only the first is used). Defaults to the current directory
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Relay endpoint that forwards prompts to the model
    #[arg(long, env = "ATCHAT_RELAY_URL")]
    relay_url: Option<String>,

    /// Seconds to wait for a relay reply
    #[arg(long, env = "ATCHAT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Disable mouse scroll support (re-enables terminal text selection)
    #[arg(long)]
    no_mouse: bool,

    /// Run headlessly: submit prompt, print the reply to stdout, exit
    #[arg(short = 'p', long = "print")]
    print_prompt: Option<String>,
}

fn cleanup_terminal(mouse: bool) {
    let _ = crossterm::execute!(std::io::stdout(), crossterm::event::DisableBracketedPaste);
    if mouse {
        let _ = crossterm::execute!(std::io::stdout(), crossterm::event::DisableMouseCapture);
    }
    ratatui::restore();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = data_dir()?;

    // Set up file-based tracing (logs go to ~/.atchat/atchat.log)
    {
        std::fs::create_dir_all(&data_dir).ok();
        let log_file = std::fs::File::create(data_dir.join("atchat.log"))?;

        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::try_from_env("ATCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(log_file)
            .with_ansi(false)
            .init();
    }

    let args = Args::parse();

    let mut roots = args.roots.clone();
    if roots.is_empty() {
        roots.push(std::env::current_dir()?);
    }
    if let Some(first) = roots.first()
        && !first.is_dir()
    {
        anyhow::bail!("workspace root {} is not a directory", first.display());
    }
    let workspace = Arc::new(Workspace::new(roots));

    // CLI env/flags override stored config
    let mut config = ChatConfig::load()?.unwrap_or_default();
    if let Some(url) = &args.relay_url {
        config.relay_url = url.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_secs = secs;
    }
    if args.print_prompt.is_none() {
        config.save()?;
    }

    let client = RelayClient::new(
        config.relay_url.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;
    tracing::info!(relay = client.url(), root = ?workspace.root(), "starting");

    let (session_tx, session_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let bridge = LocalBridge::new(Arc::clone(&workspace), session_tx.clone());
    let relay = SpawnedRelay::new(client, session_tx);
    let session = ChatSession::new(Arc::new(bridge), Arc::new(relay));

    if let Some(prompt) = args.print_prompt {
        let outcome = run_headless(session, session_rx, prompt).await?;
        if let Some(reply) = &outcome.reply {
            if outcome.failed {
                eprintln!("{reply}");
            } else {
                println!("{reply}");
            }
        }
        if outcome.failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut logger = SessionLogger::new(
        &data_dir.join("sessions"),
        workspace.root(),
        &config.relay_url,
    )?;
    let mut app = App::new(
        config.relay_url.clone(),
        workspace.root(),
        Some(data_dir.join("history")),
    );
    app.load_history();

    let terminal = ratatui::init();
    let mouse = !args.no_mouse;
    let _ = crossterm::execute!(std::io::stdout(), crossterm::event::EnableBracketedPaste);
    if mouse {
        let _ = crossterm::execute!(std::io::stdout(), crossterm::event::EnableMouseCapture);
    }

    let result = run_app(terminal, &mut app, session, session_rx, &mut logger).await;

    cleanup_terminal(mouse);
    app.save_history();

    result
}

/// Result of a headless exchange: the last assistant message, and whether
/// the mentioned file was missing or the relay failed.
#[derive(Debug, PartialEq, Eq)]
struct HeadlessOutcome {
    reply: Option<String>,
    failed: bool,
}

/// Submit one prompt without a terminal UI and wait for the session to settle.
async fn run_headless(
    mut session: ChatSession,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    prompt: String,
) -> anyhow::Result<HeadlessOutcome> {
    session.submit(&prompt)?;

    let mut failed = false;
    while session.is_busy() {
        let Some(event) = events.recv().await else {
            anyhow::bail!("session channel closed before a reply arrived");
        };
        let failure = match &event {
            SessionEvent::Host(HostMessage::FileNotFound { .. }) => true,
            SessionEvent::Relay(RelayReply { result: Err(e), .. }) => {
                tracing::warn!("relay failed: {e}");
                true
            }
            _ => false,
        };
        if session.handle_event(event) == EventOutcome::Applied && failure {
            failed = true;
        }
    }

    Ok(HeadlessOutcome {
        reply: session
            .transcript()
            .last_assistant()
            .map(|m| m.content.clone()),
        failed,
    })
}

/// Bring the view up to date with the session: new transcript messages become
/// blocks and log records, and the spinner follows the state.
fn sync_view(app: &mut App, session: &ChatSession, logger: &mut SessionLogger) {
    for message in app.sync_transcript(session.transcript()) {
        logger.log_message(message);
    }
    let state = session.state();
    app.busy = (!state.is_idle()).then(|| state.label());
}

/// Handle Enter when no suggestion is highlighted. Returns `true` to quit.
/// Slash commands run even while a reply is pending; prompts do not.
fn submit_input(app: &mut App, session: &mut ChatSession, logger: &mut SessionLogger) -> bool {
    if app.input.trim().is_empty() {
        return false;
    }

    if let Some(cmd) = command::parse(&app.input) {
        app.take_input();
        match cmd {
            command::Command::Exit => return true,
            command::Command::Refresh => {
                session.request_file_list();
                app.push_system("Refreshing file list…");
            }
            command::Command::Help => app.push_system(command::help_text()),
        }
        return false;
    }

    if session.is_busy() {
        // Keep the draft so it can be sent once the reply lands
        app.push_system(format!(
            "Still {}; your message was not sent.",
            session.state().label()
        ));
        return false;
    }

    let input = app.take_input();
    match session.submit(&input) {
        Ok(Submission::AwaitingFile { filename }) => {
            tracing::debug!(%filename, "submitted with mention");
        }
        Ok(Submission::AwaitingRelay) => {}
        Err(SubmitError::Empty) => {}
        Err(e) => app.push_system(e.to_string()),
    }
    sync_view(app, session, logger);
    false
}

async fn run_app(
    mut terminal: DefaultTerminal,
    app: &mut App,
    mut session: ChatSession,
    mut session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    logger: &mut SessionLogger,
) -> anyhow::Result<()> {
    // Unified event channel
    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();

    // Stop flag for the event reader thread
    let stop = Arc::new(AtomicBool::new(false));

    // Terminal event reader polls with a timeout so it can observe the stop flag
    let term_tx = app_tx.clone();
    let stop_reader = Arc::clone(&stop);
    tokio::task::spawn_blocking(move || {
        while !stop_reader.load(Ordering::Relaxed) {
            if crossterm::event::poll(Duration::from_millis(50)).unwrap_or(false) {
                match crossterm::event::read() {
                    Ok(ev) => {
                        if term_tx.send(AppEvent::Terminal(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    });

    // Host and relay replies
    let session_tx = app_tx.clone();
    tokio::spawn(async move {
        while let Some(ev) = session_rx.recv().await {
            if session_tx.send(AppEvent::Session(ev)).is_err() {
                break;
            }
        }
    });

    // Tick timer for spinner animation
    let tick_tx = app_tx.clone();
    let stop_tick = Arc::clone(&stop);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            if stop_tick.load(Ordering::Relaxed) || tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // SIGTERM handler for graceful shutdown
    #[cfg(unix)]
    {
        let sigterm_tx = app_tx.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                let _ = sigterm_tx.send(AppEvent::Quit);
            }
        });
    }

    session.request_file_list();

    loop {
        // Draw only when dirty
        if app.dirty {
            // Pre-compute height cache before the immutable borrow in draw
            let size = terminal.size()?;
            let vh = ui::history_viewport_height(app, size.width, size.height);
            let vw = size.width as usize;
            // Clamp scroll_offset (especially for scroll_to_bottom's usize::MAX)
            let max_scroll = app.total_content_height(vw).saturating_sub(vh);
            app.scroll_offset = app.scroll_offset.min(max_scroll);

            terminal.draw(|frame| ui::draw(frame, app))?;
            app.dirty = false;
        }

        let Some(event) = app_rx.recv().await else {
            break;
        };

        match event {
            AppEvent::Terminal(TermEvent::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                app.dirty = true;
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

                if ctrl && key.code == KeyCode::Char('c') {
                    break;
                }
                if ctrl && key.code == KeyCode::Char('y') {
                    copy_last_reply(app);
                    continue;
                }
                if ctrl && key.code == KeyCode::Char('r') {
                    session.request_file_list();
                    continue;
                }

                // ── Scroll keys ──
                {
                    let size = terminal.size()?;
                    let vh = ui::history_viewport_height(app, size.width, size.height);
                    let vw = size.width as usize;
                    match key.code {
                        KeyCode::Char('u') if ctrl => {
                            app.scroll_up(vh / 2);
                            continue;
                        }
                        KeyCode::Char('d') if ctrl => {
                            app.scroll_down(vh / 2, vh, vw);
                            continue;
                        }
                        KeyCode::PageUp => {
                            app.scroll_up(vh);
                            continue;
                        }
                        KeyCode::PageDown => {
                            app.scroll_down(vh, vh, vw);
                            continue;
                        }
                        _ => {}
                    }
                }

                match key.code {
                    KeyCode::Esc => app.dismiss_suggestions(),
                    KeyCode::Tab | KeyCode::Enter if app.has_suggestions() => {
                        app.complete_suggestion();
                        app.update_suggestions(session.files());
                    }
                    KeyCode::Up if app.has_suggestions() => app.suggestion_up(),
                    KeyCode::Down if app.has_suggestions() => app.suggestion_down(),
                    KeyCode::Enter => {
                        if submit_input(app, &mut session, logger) {
                            break;
                        }
                    }
                    code => edit_input(app, code, ctrl, session.files()),
                }
            }
            AppEvent::Terminal(TermEvent::Paste(text)) => {
                app.dirty = true;
                app.insert_str(&text.replace(['\r', '\n'], " "));
                app.update_suggestions(session.files());
            }
            AppEvent::Terminal(TermEvent::Mouse(mouse)) => {
                use crossterm::event::MouseEventKind;
                match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll_up(3);
                        app.dirty = true;
                    }
                    MouseEventKind::ScrollDown => {
                        let size = terminal.size()?;
                        let vh = ui::history_viewport_height(app, size.width, size.height);
                        app.scroll_down(3, vh, size.width as usize);
                        app.dirty = true;
                    }
                    _ => {}
                }
            }
            AppEvent::Terminal(_) => {
                // Resize events, etc.
                app.dirty = true;
            }
            AppEvent::Session(event) => {
                let is_listing = matches!(event, SessionEvent::Host(HostMessage::FileList { .. }));
                if session.handle_event(event) == EventOutcome::Applied {
                    if is_listing {
                        app.file_count = Some(session.files().len());
                        app.update_suggestions(session.files());
                    }
                    sync_view(app, &session, logger);
                    app.dirty = true;
                }
            }
            AppEvent::Tick => {
                if app.busy.is_some() {
                    app.tick += 1;
                    app.dirty = true;
                }
            }
            AppEvent::Quit => break,
        }
    }

    // Signal reader thread and tick timer to stop
    stop.store(true, Ordering::Relaxed);

    Ok(())
}

/// Caret movement, deletion, typing and history recall. Suggestions are
/// recomputed after every change to the draft.
fn edit_input(app: &mut App, code: KeyCode, ctrl: bool, files: &FileList) {
    match code {
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),
        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        _ => return,
    }
    app.update_suggestions(files);
}

/// Copy the last assistant reply to the system clipboard.
fn copy_last_reply(app: &mut App) {
    let Some(text) = app.last_reply().map(str::to_string) else {
        return;
    };
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
        Ok(()) => app.push_system("Copied last reply to clipboard."),
        Err(e) => app.push_error(format!("clipboard unavailable: {e}")),
    }
}
