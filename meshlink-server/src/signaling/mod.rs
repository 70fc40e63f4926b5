mod signaling_service;
mod ws_handler;

pub use signaling_service::*;
pub(crate) use ws_handler::ws_handler;
