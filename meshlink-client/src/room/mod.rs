mod direct;
mod hooks;
mod relay;
mod room_command;

pub(crate) use direct::DirectRoom;
pub use hooks::{
    BroadcastCallback, ErrorCallback, JoinCallback, LeaveCallback, ReadyCallback, ReadyChannel,
};
pub(crate) use hooks::Hook;
pub(crate) use relay::RelayRoom;
pub(crate) use room_command::RoomCommand;
