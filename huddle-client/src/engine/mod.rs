mod engine_command;
mod engine_event;
mod negotiation_engine;
mod room_role;

pub use engine_command::*;
pub use engine_event::*;
pub use negotiation_engine::*;
pub use room_role::*;
