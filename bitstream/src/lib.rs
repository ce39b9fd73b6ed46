//! Varint codec and three-cursor bit buffers for the deltasync codec.
//!
//! A sync buffer is laid out as a varint length prefix followed by three
//! regions that are filled independently: header bits (presence / change
//! flags), packed data bits and a byte-aligned payload. Region sizes are
//! counted up front with [`WriteState`], turned into a [`BufferGeometry`],
//! and then written with [`BitBufferWriter`] and read back with
//! [`BitBufferReader`].
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - Every cursor is checked against its region's reservation.
//! - **No domain knowledge** - This crate knows nothing about schemas, fields or tracking.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitBufferReader, BitBufferWriter, WriteState};
//!
//! let mut state = WriteState::new();
//! state.register_header_bits(1).register_bits(1).register_varint(300);
//! let geometry = state.geometry(0);
//!
//! let mut buf = vec![0u8; geometry.total_len()];
//! let mut writer = BitBufferWriter::new(&mut buf, geometry).unwrap();
//! writer.write_header_bit(true).unwrap();
//! writer.write_bit(false).unwrap();
//! writer.write_varint(300).unwrap();
//! let len = writer.finish().unwrap();
//!
//! let mut reader = BitBufferReader::open(&buf[..len], 0, 1, 1).unwrap();
//! assert!(reader.read_header_bit().unwrap());
//! assert!(!reader.read_bit().unwrap());
//! assert_eq!(reader.read_varint().unwrap(), 300);
//! reader.finish().unwrap();
//! ```

mod bits;
mod error;
mod reader;
mod state;
mod varint;
mod writer;

pub use error::{BitError, BitResult, Region};
pub use reader::{read_prefix, BitBufferReader};
pub use state::{BufferGeometry, WriteState};
pub use varint::{
    decode_varint, encode_varint, f32_from_raw, f32_to_raw, f64_from_raw, f64_to_raw,
    varint_len_from_header, varint_size, varint_to_vec, zigzag_decode, zigzag_encode,
    MAX_VARINT_BYTES,
};
pub use writer::BitBufferWriter;
