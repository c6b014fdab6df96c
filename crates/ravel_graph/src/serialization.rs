// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append/consume byte buffer used by the scene format.
//!
//! Values are written with bincode's fixed-width little-endian encoding and
//! read back in the same order. Raw payloads carry a `u64` length prefix.
//! Reads are bounded by the bytes left in the buffer, so a corrupt length
//! prefix fails instead of allocating.

use crate::value::ValueError;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// Growable byte buffer with a read cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl ByteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes for reading from the start
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            cursor: 0,
        }
    }

    /// Append a value
    pub fn add<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializationError> {
        codec().serialize_into(&mut self.data, value)?;
        Ok(())
    }

    /// Consume a value written by [`add`](Self::add)
    pub fn get<T: DeserializeOwned>(&mut self) -> Result<T, SerializationError> {
        let mut remaining = &self.data[self.cursor..];
        let available = remaining.len();
        let value = codec()
            .with_limit(available as u64)
            .deserialize_from(&mut remaining)?;
        let consumed = available - remaining.len();
        self.cursor += consumed;
        Ok(value)
    }

    /// Append a length-prefixed byte block
    pub fn add_raw(&mut self, bytes: &[u8]) -> Result<(), SerializationError> {
        self.add(&(bytes.len() as u64))?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Consume a length-prefixed byte block
    pub fn get_raw(&mut self) -> Result<Vec<u8>, SerializationError> {
        let len: u64 = self.get()?;
        let len = usize::try_from(len)
            .map_err(|_| SerializationError::Shape(format!("block length {len} exceeds address space")))?;
        Ok(self.take(len)?.to_vec())
    }

    /// Append bytes without a prefix
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Consume exactly `len` unprefixed bytes
    pub fn take(&mut self, len: usize) -> Result<&[u8], SerializationError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(SerializationError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.data[start..self.cursor])
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Whether every byte has been read
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Read position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Total bytes written
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Everything written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Error during scene serialization
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// Encoding or decoding a field failed
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Buffer ran out
    #[error("Buffer ended early: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes requested
        needed: usize,
        /// Bytes left
        remaining: usize,
    },

    /// Scene names a node type this build does not know
    #[error("Unknown node type tag: {0}")]
    UnknownNodeType(u8),

    /// An output payload could not be restored
    #[error("Invalid value payload: {0}")]
    Value(#[from] ValueError),

    /// Data is well-formed but does not fit the graph
    #[error("Malformed scene: {0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mixed_sequence_reads_back_in_order() {
        let mut buffer = ByteBuffer::new();
        buffer.add(&7u32).unwrap();
        buffer.add("node").unwrap();
        buffer.add_raw(&[1, 2, 3]).unwrap();
        buffer.add(&[0.5f32, 1.5]).unwrap();

        let mut reader = ByteBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(reader.get::<u32>().unwrap(), 7);
        assert_eq!(reader.get::<String>().unwrap(), "node");
        assert_eq!(reader.get_raw().unwrap(), vec![1, 2, 3]);
        assert_eq!(reader.get::<[f32; 2]>().unwrap(), [0.5, 1.5]);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_fixed_width_encoding() {
        let mut buffer = ByteBuffer::new();
        buffer.add(&1u64).unwrap();
        buffer.add(&1u8).unwrap();
        assert_eq!(buffer.len(), 9);
    }

    #[test]
    fn test_take_past_end_fails() {
        let mut buffer = ByteBuffer::from_bytes(vec![0u8; 3]);
        let err = buffer.take(4).unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedEnd { needed: 4, remaining: 3 }));
        assert!(buffer.get::<u64>().is_err());
    }

    #[test]
    fn test_oversized_string_length_is_an_error() {
        let mut bytes = (1u64 << 40).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let mut buffer = ByteBuffer::from_bytes(bytes);
        assert!(matches!(buffer.get::<String>(), Err(SerializationError::Codec(_))));
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_oversized_vec_length_is_an_error() {
        let mut buffer = ByteBuffer::new();
        buffer.add(&u64::MAX).unwrap();
        buffer.add(&1u32).unwrap();
        let mut reader = ByteBuffer::from_bytes(buffer.into_bytes());
        assert!(reader.get::<Vec<u32>>().is_err());
    }

    proptest! {
        #[test]
        fn prop_values_read_back_in_write_order(
            a in any::<u32>(),
            b in any::<f32>().prop_filter("comparable", |f| !f.is_nan()),
            s in ".{0,32}",
            raw in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut buffer = ByteBuffer::new();
            buffer.add(&a).unwrap();
            buffer.add(&b).unwrap();
            buffer.add(&s).unwrap();
            buffer.add_raw(&raw).unwrap();

            let mut reader = ByteBuffer::from_bytes(buffer.as_bytes());
            prop_assert_eq!(reader.get::<u32>().unwrap(), a);
            prop_assert_eq!(reader.get::<f32>().unwrap(), b);
            prop_assert_eq!(reader.get::<String>().unwrap(), s);
            prop_assert_eq!(reader.get_raw().unwrap(), raw);
            prop_assert!(reader.is_exhausted());
        }
    }
}
