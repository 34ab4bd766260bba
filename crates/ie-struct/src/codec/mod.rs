//! Binary reading and writing of structure trees.
//!
//! Resources are little-endian with fixed-width fields; text is NUL-padded
//! Windows-1252.

pub(crate) mod decode;
pub mod primitives;
pub mod text;

pub use primitives::{Reader, Writer, get_uint, put_uint, sign_extend};
pub use text::{TextError, decode_text, encode_text};
