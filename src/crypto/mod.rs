pub mod classical;
pub mod codec;
pub mod combiner;

pub use codec::{base64_decode, base64_encode, eq_slices, hex_decode, hex_encode, wipe};
