mod config;
mod error;
mod format;
mod init;
mod level;
mod stream;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LogFormat;
pub use init::init_logger;
pub use level::LogLevel;
pub use stream::{LogSink, LogStreamer, NoopLogSink};
