mod config;
mod relay_service;
mod ws_handler;

pub use config::*;
pub use relay_service::*;
pub use ws_handler::*;
