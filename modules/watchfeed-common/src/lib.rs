pub mod config;
pub mod error;
pub mod feed;
pub mod types;
pub mod urls;

pub use config::MonitorConfig;
pub use error::WatchfeedError;
pub use feed::*;
pub use types::*;
pub use urls::*;
