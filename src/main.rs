mod app;
mod config;
mod group;
mod irc;
mod logging;
mod ui;

use crate::app::action::Action;
use crate::app::event::{AppEvent, ServerId};
use crate::app::handler;
use crate::app::state::*;
use crate::group::GroupRegistry;
use crate::group::template::TemplateSet;
use crate::irc::manager::IrcManager;
use crate::logging::ChatLogger;
use anyhow::{Context, Result};
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::io;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    let cfg = config::load_config()?;

    match logging::init_tracing() {
        Ok(path) => info!(log = %path.display(), "crabmux starting"),
        Err(e) => eprintln!("Diagnostics disabled: {:#}", e),
    }

    let templates = TemplateSet::load(cfg.ui.pevents_path.as_deref(), cfg.ui.indent_nicks)
        .context("Failed to load event templates")?;
    let definitions = config::load_groups()?;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = AppState::new(cfg, GroupRegistry::new(templates));
    app.groups.load(&mut app.client, definitions, Instant::now());

    let result = run_app(&mut terminal, &mut app).await;

    app.groups.unload(&mut app.client);
    restore_terminal()?;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Start (or restart) the connection to a configured server.
async fn connect_server(app: &mut AppState, irc_manager: &mut IrcManager, name: &str) {
    let Some(cfg) = app.client.config.server(name).cloned() else {
        app.client
            .notify(format!("No server named '{}' in config.toml", name), true);
        return;
    };

    let server_id = match app.client.server_by_name(&cfg.name).map(|s| (s.id, s.status)) {
        Some((id, ConnectionStatus::Disconnected)) => {
            if let Some(srv) = app.client.get_server_mut(id) {
                srv.status = ConnectionStatus::Connecting;
            }
            id
        }
        Some((id, _)) => {
            app.client.set_active_buffer(BufferKey::ServerStatus(id));
            return;
        }
        None => {
            let id = app.client.allocate_server_id();
            app.client.add_server(ServerState::from_config(id, &cfg));
            id
        }
    };

    let key = BufferKey::ServerStatus(server_id);
    app.client
        .system_message(&key, format!("Connecting to {}:{}...", cfg.host, cfg.port));
    app.client.set_active_buffer(key.clone());

    if let Err(e) = irc_manager.connect(server_id, &cfg).await {
        warn!(server = %cfg.name, error = %e, "connect failed");
        app.client
            .error_message(&key, format!("Connection failed: {:#}", e));
        handler::mark_disconnected(app, server_id);
    }
}

fn report(app: &mut AppState, server_id: ServerId, what: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(server_id, error = %e, "{} failed", what);
        let key = BufferKey::ServerStatus(server_id);
        app.client.error_message(&key, format!("{} failed: {}", what, e));
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

    let mut irc_manager = IrcManager::new(event_tx.clone());
    let mut chat_logger = ChatLogger::new(&app.client.config.logging);

    let term_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            if term_tx.send(AppEvent::Terminal(event)).is_err() {
                break;
            }
        }
    });

    let tick_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(50));
        loop {
            interval.tick().await;
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    let auto: Vec<String> = app
        .client
        .config
        .servers
        .iter()
        .filter(|s| s.auto_connect)
        .map(|s| s.name.clone())
        .collect();
    for name in &auto {
        connect_server(app, &mut irc_manager, name).await;
    }

    if app.client.servers.is_empty() {
        let server_id = app.client.allocate_server_id();
        let mut welcome = ServerState::from_config(server_id, &config::ServerConfig::new("welcome", "", 0));
        welcome.status = ConnectionStatus::Disconnected;
        app.client.add_server(welcome);
        app.client.set_active_buffer(BufferKey::ServerStatus(server_id));
    }

    let view: &AppState = app;
    terminal.draw(|f| ui::render(f, view))?;

    while let Some(event) = event_rx.recv().await {
        let actions = handler::handle_event(app, event);

        for (key, msg) in app.client.new_messages.drain(..) {
            chat_logger.log_message(&key, &msg);
        }

        for action in actions {
            match action {
                Action::SendMessage { server_id, target, text } => {
                    let result = irc_manager.send_privmsg(server_id, &target, &text);
                    report(app, server_id, "Send", result);
                }
                Action::SendAction { server_id, target, text } => {
                    let result = irc_manager.send_action(server_id, &target, &text);
                    report(app, server_id, "Send", result);
                }
                Action::JoinChannel { server_id, channel } => {
                    let result = irc_manager.send_join(server_id, &channel);
                    report(app, server_id, "Join", result);
                }
                Action::PartChannel { server_id, channel, reason } => {
                    let result = irc_manager.send_part(server_id, &channel, reason.as_deref());
                    report(app, server_id, "Part", result);
                }
                Action::ChangeNick { server_id, nick } => {
                    let result = irc_manager.send_nick(server_id, &nick);
                    report(app, server_id, "Nick change", result);
                }
                Action::SendMode { server_id, target, modes } => {
                    let result = irc_manager.send_mode(server_id, &target, &modes);
                    report(app, server_id, "Mode", result);
                }
                Action::SetTopic { server_id, channel, text } => {
                    let result = irc_manager.send_topic(server_id, &channel, &text);
                    report(app, server_id, "Topic", result);
                }
                Action::SendNotice { server_id, target, text } => {
                    let result = irc_manager.send_notice(server_id, &target, &text);
                    report(app, server_id, "Notice", result);
                }
                Action::SendRaw { server_id, command } => {
                    let result = irc_manager.send_raw(server_id, &command);
                    report(app, server_id, "Raw send", result);
                }
                Action::ConnectServer { name } => {
                    connect_server(app, &mut irc_manager, &name).await;
                }
                Action::DisconnectServer { server_id } => {
                    irc_manager.disconnect(server_id, None);
                    handler::mark_disconnected(app, server_id);
                    let key = BufferKey::ServerStatus(server_id);
                    app.client.system_message(&key, "Disconnected.".to_string());
                }
                Action::SaveGroups => {
                    if let Err(e) = config::save_groups(&app.groups.definitions()) {
                        warn!(error = %e, "saving groups failed");
                        app.client.notify(format!("Could not save groups: {:#}", e), true);
                    }
                }
                Action::Quit { message } => {
                    app.client.quit_message = message;
                    app.client.should_quit = true;
                }
            }
        }

        // Messages added while performing actions.
        for (key, msg) in app.client.new_messages.drain(..) {
            chat_logger.log_message(&key, &msg);
        }

        if app.client.should_quit {
            irc_manager.send_quit_all(app.client.quit_message.as_deref());
            info!("quitting");
            break;
        }

        if app.client.dirty {
            let view: &AppState = app;
            terminal.draw(|f| ui::render(f, view))?;
            app.client.dirty = false;
        }
    }

    Ok(())
}
