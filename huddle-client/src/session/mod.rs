mod candidate_queue;
mod peer_session;
mod rtc_transport;
mod transport;

pub use candidate_queue::*;
pub use peer_session::*;
pub use rtc_transport::*;
pub use transport::*;
