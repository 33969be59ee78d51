mod call;
mod roster;

pub use call::*;
pub use roster::*;
