//! The client around the groups: buffers and servers, input and IRC event
//! handling, and the actions handed back to the main loop.

pub mod action;
pub mod event;
pub mod handler;
pub mod state;
