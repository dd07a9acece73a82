pub mod navigation;
pub mod notices;
pub mod state;

pub use navigation::{Destination, Screen, Tab};
pub use notices::{Notice, NoticeKind, Notices};
pub use state::{App, AppEvent, Workspace};
