pub mod common;
pub mod control_plane;
pub mod handlers;
pub mod permissions;
pub mod workflow;
