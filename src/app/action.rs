use crate::app::event::ServerId;

/// Side effects the event handler asks the main loop to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SendMessage { server_id: ServerId, target: String, text: String },
    SendAction { server_id: ServerId, target: String, text: String },
    JoinChannel { server_id: ServerId, channel: String },
    PartChannel { server_id: ServerId, channel: String, reason: Option<String> },
    ChangeNick { server_id: ServerId, nick: String },
    ConnectServer { name: String },
    DisconnectServer { server_id: ServerId },
    SendMode { server_id: ServerId, target: String, modes: String },
    SetTopic { server_id: ServerId, channel: String, text: String },
    SendNotice { server_id: ServerId, target: String, text: String },
    SendRaw { server_id: ServerId, command: String },
    /// Persist group definitions to `groups.toml`.
    SaveGroups,
    Quit { message: Option<String> },
}
