#![forbid(unsafe_code)]
//! Order-preserving encoders and a bounds-checked slice cursor.

pub mod ord {
    //! Order-preserving encoders for numeric and string keys.
    //!
    //! Every encoder here is self-delimiting, so an encoded field followed by
    //! further fields still sorts by the field first.

    use crate::error::{GraphError, Result};

    const U64_LEN: usize = core::mem::size_of::<u64>();
    const SIGN_BIT: u64 = 1 << 63;

    /// Escape marker emitted after a literal `0x00` inside escaped bytes.
    const ESCAPE: u8 = 0x01;
    /// Second terminator byte; `0x00 0x00` closes an escaped sequence.
    const TERMINATOR: u8 = 0x00;

    /// Appends a big-endian u64.
    pub fn put_u64(dst: &mut Vec<u8>, v: u64) {
        dst.extend_from_slice(&v.to_be_bytes());
    }

    /// Decodes a big-endian u64 from the front of `src`.
    pub fn get_u64(src: &[u8]) -> Result<u64> {
        let head = src.get(..U64_LEN).ok_or_else(|| {
            GraphError::corruption(format!(
                "u64 source shorter than 8 bytes (have {})",
                src.len()
            ))
        })?;
        let mut arr = [0u8; U64_LEN];
        arr.copy_from_slice(head);
        Ok(u64::from_be_bytes(arr))
    }

    /// Appends a signed i64 with the sign bit flipped so negatives sort first.
    pub fn put_i64(dst: &mut Vec<u8>, v: i64) {
        put_u64(dst, (v as u64) ^ SIGN_BIT);
    }

    /// Decodes an i64 written by [`put_i64`].
    pub fn get_i64(src: &[u8]) -> Result<i64> {
        Ok((get_u64(src)? ^ SIGN_BIT) as i64)
    }

    /// Appends an f64 in total order. NaN is rejected.
    pub fn put_f64(dst: &mut Vec<u8>, v: f64) -> Result<()> {
        if v.is_nan() {
            return Err(GraphError::invalid("NaN cannot be encoded as an ordered key"));
        }
        put_u64(dst, encode_f64_bits(v));
        Ok(())
    }

    /// Decodes an f64 written by [`put_f64`].
    pub fn get_f64(src: &[u8]) -> Result<f64> {
        Ok(f64::from_bits(decode_f64_bits(get_u64(src)?)))
    }

    /// Appends `bytes` with `0x00` escaped as `0x00 0x01` and a `0x00 0x00` terminator.
    ///
    /// Lexicographic order of the output equals lexicographic order of the
    /// input, and no encoding is a prefix of another.
    pub fn put_escaped(dst: &mut Vec<u8>, bytes: &[u8]) {
        dst.reserve(bytes.len() + 2);
        for &byte in bytes {
            dst.push(byte);
            if byte == 0x00 {
                dst.push(ESCAPE);
            }
        }
        dst.push(0x00);
        dst.push(TERMINATOR);
    }

    /// Decodes escaped bytes, returning the payload and the number of bytes consumed.
    pub fn split_escaped(src: &[u8]) -> Result<(Vec<u8>, usize)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < src.len() {
            if src[i] != 0x00 {
                out.push(src[i]);
                i += 1;
                continue;
            }
            match src.get(i + 1) {
                Some(&TERMINATOR) => return Ok((out, i + 2)),
                Some(&ESCAPE) => {
                    out.push(0x00);
                    i += 2;
                }
                Some(other) => {
                    return Err(GraphError::corruption(format!(
                        "invalid escape sequence 0x00 0x{other:02x}"
                    )))
                }
                None => break,
            }
        }
        Err(GraphError::corruption("escaped bytes missing terminator"))
    }

    /// Appends an order-preserving UTF-8 string.
    pub fn put_str(dst: &mut Vec<u8>, s: &str) {
        put_escaped(dst, s.as_bytes());
    }

    /// Decodes a string written by [`put_str`], returning it with the bytes consumed.
    pub fn split_str(src: &[u8]) -> Result<(String, usize)> {
        let (bytes, used) = split_escaped(src)?;
        let s = String::from_utf8(bytes)
            .map_err(|_| GraphError::corruption("ordered string is not valid UTF-8"))?;
        Ok((s, used))
    }

    fn encode_f64_bits(v: f64) -> u64 {
        let bits = v.to_bits();
        if bits & SIGN_BIT != 0 {
            !bits
        } else {
            bits ^ SIGN_BIT
        }
    }

    fn decode_f64_bits(encoded: u64) -> u64 {
        if encoded & SIGN_BIT != 0 {
            encoded ^ SIGN_BIT
        } else {
            !encoded
        }
    }
}

pub mod buf {
    //! A slice-backed cursor for parsing keys field by field.

    use core::fmt;

    use super::ord;
    use crate::error::{GraphError, Result};

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        buf: &'a [u8],
        off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, failing if the buffer is too short.
        pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
            let end = self
                .off
                .checked_add(n)
                .ok_or_else(|| GraphError::corruption("cursor offset overflow"))?;
            if end > self.buf.len() {
                return Err(GraphError::corruption(format!(
                    "cursor take beyond buffer: need {}, remaining {}",
                    n,
                    self.remaining()
                )));
            }
            let slice = &self.buf[self.off..end];
            self.off = end;
            Ok(slice)
        }

        /// Reads one byte.
        pub fn u8(&mut self) -> Result<u8> {
            Ok(self.take(1)?[0])
        }

        /// Reads a big-endian u64.
        pub fn u64(&mut self) -> Result<u64> {
            ord::get_u64(self.take(8)?)
        }

        /// Reads an order-preserving string.
        pub fn str(&mut self) -> Result<String> {
            let (s, used) = ord::split_str(self.rest())?;
            self.off += used;
            Ok(s)
        }

        /// Reads escaped bytes.
        pub fn escaped(&mut self) -> Result<Vec<u8>> {
            let (bytes, used) = ord::split_escaped(self.rest())?;
            self.off += used;
            Ok(bytes)
        }

        /// Returns the unread tail without advancing.
        pub fn rest(&self) -> &'a [u8] {
            &self.buf[self.off..]
        }

        /// Current offset into the underlying buffer.
        pub fn offset(&self) -> usize {
            self.off
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}
