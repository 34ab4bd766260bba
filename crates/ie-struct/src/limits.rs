//! Record sizes and decoding limits.

/// Size of a variable record.
pub const VARIABLE_SIZE: usize = 84;

/// Size of a compact (version 1) effect record.
pub const EFFECT_V1_SIZE: usize = 48;

/// Size of an extended (version 2) effect record.
pub const EFFECT_V2_SIZE: usize = 264;

/// Size of the `EFF V2.0` file header.
pub const EFF_HEADER_SIZE: usize = 8;

/// Size of a stand-alone `EFF V2.0` file.
pub const EFF_FILE_SIZE: usize = EFF_HEADER_SIZE + EFFECT_V2_SIZE;

/// Size of an effect table header: entry count and effect version.
pub const EFFECT_TABLE_HEADER_SIZE: usize = 8;

/// Size of a variable table header: entry count only.
pub const VARIABLE_TABLE_HEADER_SIZE: usize = 4;

/// Maximum number of entries a table header may declare.
///
/// The count is read from untrusted input and bounds the node allocation.
pub const MAX_TABLE_ENTRIES: usize = 65_535;

/// Highest opcode known to the original engine releases.
pub const MAX_OPCODE_CLASSIC: u32 = 317;

/// Highest opcode known to Enhanced Edition builds.
pub const MAX_OPCODE_ENHANCED: u32 = 511;

/// Signature of `EFF` files and extended effects.
pub const EFF_SIGNATURE: &[u8; 4] = b"EFF ";

/// Version tag of `EFF` files and extended effects.
pub const EFF_VERSION: &[u8; 4] = b"V2.0";
