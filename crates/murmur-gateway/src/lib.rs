//! Realtime fan-out: a registry of live WebSocket connections and the loop that
//! serves each one. Pushes are hints only; nothing here is persisted or retried.

pub mod connection;
pub mod dispatcher;
