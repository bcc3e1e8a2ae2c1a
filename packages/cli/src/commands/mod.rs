pub mod init;
pub mod inspect;
pub mod replay;
pub mod search;

pub use init::{init, InitArgs};
pub use inspect::{inspect, InspectArgs};
pub use replay::{replay, ReplayArgs};
pub use search::{search, SearchArgs};
