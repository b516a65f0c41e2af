//! IRC side of the client: slash-command parsing, connections and sending.

pub mod commands;
pub mod connection;
pub mod manager;
