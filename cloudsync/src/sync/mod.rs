//! Content identity primitives: dependency hashing and wire encoding.

pub mod codec;
pub mod hash;

pub use codec::{decode_content, encode_content};
pub use hash::hash_path;
