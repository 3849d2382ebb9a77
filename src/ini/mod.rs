//! INI-style text documents and plain-text sniffing.
//!
//! - [`document`] - the order- and case-preserving [`IniDocument`]
//! - [`sniff`] - [`classify_as_text`], used to reject binary uploads early

pub mod document;
pub mod sniff;

pub use document::{IniDocument, Section};
pub use sniff::{classify_as_text, is_text};
