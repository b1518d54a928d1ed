//! WebSocket chat gateway: JSON-RPC requests in, streamed `{event, data}`
//! frames out.

pub mod actix_ws;
pub mod events;
pub mod methods;
pub mod protocol;
