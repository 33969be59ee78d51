mod client;
mod events;
mod output;

pub use client::*;
pub use events::*;
pub use output::*;
