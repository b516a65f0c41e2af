use crate::app::event::{AppEvent, ServerId};
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use futures::StreamExt;
use irc::client::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct IrcConnection {
    pub server_id: ServerId,
    pub sender: irc::client::Sender,
}

/// Connect to a configured server and forward everything it sends as
/// [`AppEvent`]s until the stream ends.
pub async fn spawn_connection(
    server_id: ServerId,
    cfg: &ServerConfig,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) -> Result<IrcConnection> {
    let config = Config {
        server: Some(cfg.host.clone()),
        port: Some(cfg.port),
        use_tls: Some(cfg.tls),
        nickname: Some(cfg.nickname.clone()),
        realname: cfg.realname.clone(),
        password: cfg.password.clone(),
        nick_password: cfg.nick_password.clone(),
        channels: cfg.channels.clone(),
        dangerously_accept_invalid_certs: Some(cfg.accept_invalid_certs),
        ..Config::default()
    };

    let mut client = Client::from_config(config)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", cfg.host, cfg.port))?;
    client.identify().context("Failed to register with the server")?;

    let sender = client.sender();
    let mut stream = client.stream()?;

    let _ = event_tx.send(AppEvent::IrcConnected { server_id });

    let name = cfg.name.clone();
    tokio::spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(message) => {
                    if event_tx.send(AppEvent::IrcMessage { server_id, message }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(server = %name, error = %e, "connection error");
                    let _ = event_tx.send(AppEvent::IrcError {
                        server_id,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }
        debug!(server = %name, "stream closed");
        let _ = event_tx.send(AppEvent::IrcDisconnected {
            server_id,
            reason: "Connection closed".to_string(),
        });
    });

    Ok(IrcConnection { server_id, sender })
}
