//! # teamtalk-observability
//!
//! Structured Logging fuer den TeamTalk-Client via tracing-subscriber
//! (Text oder JSON, Level per Umgebung ueberschreibbar).

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingFehler};
