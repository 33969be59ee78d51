pub mod signal_helpers;

pub use mock_signaling::*;
pub use mock_transport::*;
pub use signal_helpers::*;
