/// 1-based reference position, as stored in the POS column.
pub type Position = u32;
pub type MappingQuality = u8;

// Fast hash maps using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::{HashMap, HashMapExt}`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub use ahash::HashMapExt;
