// storyloom-studio: story storage, configuration, autosave and the explicit
// editing session built on storyloom-common.

pub mod autosave;
pub mod config;
pub mod logging;
pub mod session;
pub mod store;
