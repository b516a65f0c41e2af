use crate::app::event::{AppEvent, ServerId};
use crate::config::ServerConfig;
use crate::irc::connection::{spawn_connection, IrcConnection};
use anyhow::Result;
use irc::client::prelude::Command;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Live connections by server id, and the outgoing side of each.
pub struct IrcManager {
    connections: HashMap<ServerId, IrcConnection>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl IrcManager {
    pub fn new(event_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            connections: HashMap::new(),
            event_tx,
        }
    }

    pub async fn connect(&mut self, server_id: ServerId, cfg: &ServerConfig) -> Result<()> {
        let conn = spawn_connection(server_id, cfg, self.event_tx.clone()).await?;
        self.connections.insert(conn.server_id, conn);
        Ok(())
    }

    pub fn disconnect(&mut self, server_id: ServerId, message: Option<&str>) {
        if let Some(conn) = self.connections.remove(&server_id) {
            let _ = conn.sender.send_quit(message.unwrap_or("Leaving"));
        }
    }

    fn send(&self, server_id: ServerId, command: Command) -> Result<()> {
        if let Some(conn) = self.connections.get(&server_id) {
            conn.sender.send(command)?;
        }
        Ok(())
    }

    pub fn send_privmsg(&self, server_id: ServerId, target: &str, text: &str) -> Result<()> {
        // No CTCP injection through plain messages.
        let clean = text.replace('\x01', "");
        self.send(server_id, Command::PRIVMSG(target.to_string(), clean))
    }

    pub fn send_action(&self, server_id: ServerId, target: &str, text: &str) -> Result<()> {
        let clean = text.replace('\x01', "");
        let ctcp = format!("\x01ACTION {}\x01", clean);
        self.send(server_id, Command::PRIVMSG(target.to_string(), ctcp))
    }

    pub fn send_join(&self, server_id: ServerId, channel: &str) -> Result<()> {
        self.send(server_id, Command::JOIN(channel.to_string(), None, None))
    }

    pub fn send_part(&self, server_id: ServerId, channel: &str, reason: Option<&str>) -> Result<()> {
        self.send(
            server_id,
            Command::PART(channel.to_string(), reason.map(|r| r.to_string())),
        )
    }

    pub fn send_nick(&self, server_id: ServerId, nick: &str) -> Result<()> {
        self.send(server_id, Command::NICK(nick.to_string()))
    }

    pub fn send_mode(&self, server_id: ServerId, target: &str, modes: &str) -> Result<()> {
        // The irc crate only has typed MODE commands, so build the line.
        let line = format!("MODE {} {}", target, modes);
        self.send_raw(server_id, line.trim_end())
    }

    pub fn send_topic(&self, server_id: ServerId, channel: &str, text: &str) -> Result<()> {
        self.send(
            server_id,
            Command::TOPIC(channel.to_string(), Some(text.to_string())),
        )
    }

    pub fn send_notice(&self, server_id: ServerId, target: &str, text: &str) -> Result<()> {
        self.send(server_id, Command::NOTICE(target.to_string(), text.to_string()))
    }

    pub fn send_raw(&self, server_id: ServerId, command: &str) -> Result<()> {
        self.send(server_id, Command::Raw(command.to_string(), vec![]))
    }

    pub fn send_quit_all(&mut self, message: Option<&str>) {
        let msg = message.unwrap_or("Leaving");
        for (_id, conn) in self.connections.drain() {
            let _ = conn.sender.send_quit(msg);
        }
    }
}
