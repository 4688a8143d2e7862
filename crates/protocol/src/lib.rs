//! teamtalk-protocol – Textprotokoll des TeamTalk-5-Servers
//!
//! Dieses Crate definiert die typisierten Parameterwerte, den
//! Nachrichten-Codec (`parse`/`build`), den Zeilen-Codec fuer TCP und die
//! Protokollkonstanten.

pub mod error;
pub mod konstanten;
pub mod message;
pub mod value;
pub mod wire;

pub use error::{ProtokollFehler, ProtokollResult};
pub use message::{build, parse, ProtocolMessage};
pub use value::{ListItem, Params, Value};
pub use wire::{Eingang, ZeilenCodec};
