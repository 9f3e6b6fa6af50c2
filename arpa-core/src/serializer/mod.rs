//! Serialiser (component I, spec §4.9): ARPA text emission/parsing and a
//! length-prefixed binary mirror.

pub mod binary;
pub mod text;

pub use binary::{dump_bin, load_bin};
pub use text::{emit_arpa, parse_arpa};
