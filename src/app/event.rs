use crossterm::event::Event as CrosstermEvent;

/// Index of a server entry in [`ClientState`](crate::app::state::ClientState).
pub type ServerId = usize;

/// Everything the main loop reacts to, in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    Terminal(CrosstermEvent),
    IrcMessage { server_id: ServerId, message: irc::client::prelude::Message },
    /// Registration went through; channels may now be joined.
    IrcConnected { server_id: ServerId },
    IrcDisconnected { server_id: ServerId, reason: String },
    IrcError { server_id: ServerId, error: String },
    /// 50 ms heartbeat. Expires status messages.
    Tick,
}
