mod pause;
mod site;

pub use pause::{PauseAction, PauseLogEntry};
pub use site::SiteHistory;
