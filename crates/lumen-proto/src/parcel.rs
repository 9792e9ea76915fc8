//! Parcel codec: linear byte buffer plus object table.
//!
//! A [`Parcel`] is written sequentially and read back through a
//! [`ParcelReader`] cursor in the same order. There are no field tags.
//!
//! # Wire Format
//!
//! ```text
//! i32 / u32 / f32 / bool  4 bytes, little-endian (bool is 0 or 1)
//! i64 / u64               8 bytes, little-endian
//! string                  [i32 byte length][UTF-8 bytes][NUL][pad to 4]
//! blob                    [raw bytes][pad to 4]
//! sequence                [i32 count][element]*
//! object                  [u32 kind][u32 index]   kind 0 = null, 1 = object
//! ```
//!
//! Object markers index into the parcel's object table, which travels next to
//! the byte buffer and holds one owning [`ObjectRef`] per written reference.
//!
//! # Security
//!
//! - **Bounded Reads**: every read checks the remaining length first and fails
//!   with [`ProtocolError::Truncated`] instead of reading past the end.
//! - **Count Validation**: sequence counts are checked against
//!   [`CodecLimits::max_sequence_len`] and against the remaining bytes before
//!   any element is decoded or any capacity is reserved.
//! - **Bounded Writes**: writes fail with [`ProtocolError::ParcelTooLarge`]
//!   once the buffer would exceed [`CodecLimits::max_parcel_bytes`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::{CodecLimits, ObjectRef, ProtocolError, Result, Status, records::WireRecord};

/// Object marker kind for a null reference
const KIND_NULL: u32 = 0;

/// Object marker kind for an entry in the object table
const KIND_OBJECT: u32 = 1;

/// Size of an object marker in the byte buffer
pub const OBJECT_MARKER_SIZE: usize = 8;

/// Round a length up to the 4-byte alignment unit
#[must_use]
pub const fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

/// Outgoing or received transaction payload
#[derive(Debug, Clone, Default)]
pub struct Parcel {
    data: BytesMut,
    objects: Vec<ObjectRef>,
    limits: CodecLimits,
}

impl Parcel {
    /// Create an empty parcel with default limits
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty parcel with explicit limits
    #[must_use]
    pub fn with_limits(limits: CodecLimits) -> Self {
        Self { data: BytesMut::new(), objects: Vec::new(), limits }
    }

    /// Create a reply parcel holding only a transaction status
    #[must_use]
    pub fn from_status(status: Status) -> Self {
        let mut data = BytesMut::with_capacity(4);
        data.put_i32_le(status.to_raw());
        Self { data, objects: Vec::new(), limits: CodecLimits::default() }
    }

    /// Rebuild a parcel from raw bytes and an object table
    ///
    /// # Errors
    ///
    /// `ProtocolError::ParcelTooLarge` if `data` exceeds the limits.
    pub fn from_parts(data: &[u8], objects: Vec<ObjectRef>, limits: CodecLimits) -> Result<Self> {
        if data.len() > limits.max_parcel_bytes {
            return Err(ProtocolError::ParcelTooLarge {
                size: data.len(),
                max: limits.max_parcel_bytes,
            });
        }
        Ok(Self { data: BytesMut::from(data), objects, limits })
    }

    /// Split into the frozen byte buffer and the object table
    #[must_use]
    pub fn into_parts(self) -> (Bytes, Vec<ObjectRef>) {
        (self.data.freeze(), self.objects)
    }

    /// Bytes written so far
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Object table
    #[must_use]
    pub fn objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    /// Limits applied to this parcel and its readers
    #[must_use]
    pub fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// Length of the byte buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cursor over this parcel, starting at the first byte
    #[must_use]
    pub fn reader(&self) -> ParcelReader<'_> {
        ParcelReader { data: &self.data, objects: &self.objects, pos: 0, limits: self.limits }
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        let size = self.data.len().saturating_add(additional);
        if size > self.limits.max_parcel_bytes {
            return Err(ProtocolError::ParcelTooLarge { size, max: self.limits.max_parcel_bytes });
        }
        self.data.reserve(additional);
        Ok(())
    }

    fn put_padded(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
        self.data.put_bytes(0, pad4(bytes.len()) - bytes.len());
    }

    /// Write a signed 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.reserve(4)?;
        self.data.put_i32_le(value);
        Ok(())
    }

    /// Write an unsigned 32-bit integer
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.reserve(4)?;
        self.data.put_u32_le(value);
        Ok(())
    }

    /// Write a signed 64-bit integer
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.reserve(8)?;
        self.data.put_i64_le(value);
        Ok(())
    }

    /// Write an unsigned 64-bit integer
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.reserve(8)?;
        self.data.put_u64_le(value);
        Ok(())
    }

    /// Write a 32-bit float
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.reserve(4)?;
        self.data.put_f32_le(value);
        Ok(())
    }

    /// Write a boolean as a 32-bit integer
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_i32(i32::from(value))
    }

    /// Write a status code
    pub fn write_status(&mut self, status: Status) -> Result<()> {
        self.write_i32(status.to_raw())
    }

    /// Write a length-prefixed, NUL-terminated UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| ProtocolError::ParcelTooLarge {
            size: value.len(),
            max: self.limits.max_parcel_bytes,
        })?;

        self.reserve(4 + pad4(value.len() + 1))?;
        self.data.put_i32_le(len);
        self.data.put_slice(value.as_bytes());
        self.data.put_u8(0);
        self.data.put_bytes(0, pad4(value.len() + 1) - (value.len() + 1));
        Ok(())
    }

    /// Write a fixed-size block in place, padded to 4 bytes
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(pad4(bytes.len()))?;
        self.put_padded(bytes);
        Ok(())
    }

    /// Write an `i32` element count followed by each element
    pub fn write_sequence<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        let max = self.limits.max_sequence_len.min(i32::MAX as usize);
        let count = i32::try_from(items.len())
            .ok()
            .filter(|_| items.len() <= max)
            .ok_or(ProtocolError::SequenceTooLong { count: items.len(), max })?;

        self.write_i32(count)?;
        for item in items {
            write(self, item)?;
        }
        Ok(())
    }

    /// Write a structured record
    pub fn write_record<T: WireRecord>(&mut self, record: &T) -> Result<()> {
        record.write_to(self)
    }

    /// Write a count-prefixed sequence of structured records
    pub fn write_records<T: WireRecord>(&mut self, records: &[T]) -> Result<()> {
        self.write_sequence(records, |parcel, record| parcel.write_record(record))
    }

    /// Write an object reference (or null) into the object table
    pub fn write_object(&mut self, object: Option<&ObjectRef>) -> Result<()> {
        self.reserve(OBJECT_MARKER_SIZE)?;
        match object {
            None => {
                self.data.put_u32_le(KIND_NULL);
                self.data.put_u32_le(0);
            },
            Some(object) => {
                let index = u32::try_from(self.objects.len()).map_err(|_| {
                    ProtocolError::BadObjectIndex { index: u32::MAX, len: self.objects.len() }
                })?;
                self.objects.push(object.clone());
                self.data.put_u32_le(KIND_OBJECT);
                self.data.put_u32_le(index);
            },
        }
        Ok(())
    }
}

/// Read cursor over a [`Parcel`].
///
/// Reads consume fields in write order. A failed scalar, string, count or
/// object read leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ParcelReader<'a> {
    data: &'a [u8],
    objects: &'a [ObjectRef],
    pos: usize,
    limits: CodecLimits,
}

impl<'a> ParcelReader<'a> {
    /// Replace the limits used to validate counts
    #[must_use]
    pub fn with_limits(self, limits: CodecLimits) -> Self {
        Self { limits, ..self }
    }

    /// Bytes not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Current byte offset
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consume `len` bytes plus padding
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let needed = len.checked_add(3).map_or(usize::MAX, |n| n & !3);
        let remaining = self.remaining();
        if needed > remaining {
            return Err(ProtocolError::Truncated { needed, remaining });
        }

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += needed;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a signed 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a signed 64-bit integer
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read an unsigned 64-bit integer
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a boolean. Any nonzero value is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_i32().map(|value| value != 0)
    }

    /// Read a status code
    pub fn read_status(&mut self) -> Result<Status> {
        self.read_i32().map(Status::from_raw)
    }

    /// Read a length-prefixed, NUL-terminated UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let result = self.read_string_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_string_inner(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;

        let bytes = self.take(len + 1)?;
        let (text, terminator) = bytes.split_at(len);
        if terminator != [0] {
            return Err(ProtocolError::MissingTerminator);
        }

        std::str::from_utf8(text).map(str::to_owned).map_err(|_| ProtocolError::InvalidUtf8)
    }

    /// Borrow a fixed-size block of `len` bytes without copying
    pub fn read_blob_in_place(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Read an `i32` element count and validate it for elements that occupy
    /// at least `min_wire_size` bytes each
    pub fn read_count(&mut self, min_wire_size: usize) -> Result<usize> {
        let start = self.pos;
        let raw = self.read_i32()?;

        let checked = usize::try_from(raw)
            .map_err(|_| ProtocolError::NegativeLength(raw))
            .and_then(|count| self.check_count(count, min_wire_size));
        if checked.is_err() {
            self.pos = start;
        }
        checked
    }

    fn check_count(&self, count: usize, min_wire_size: usize) -> Result<usize> {
        let max = self.limits.max_sequence_len;
        if count > max {
            return Err(ProtocolError::SequenceTooLong { count, max });
        }

        let needed = count.saturating_mul(min_wire_size);
        let remaining = self.remaining();
        if needed > remaining {
            return Err(ProtocolError::SequenceOverrun { count, needed, remaining });
        }
        Ok(count)
    }

    /// Read a count-prefixed sequence with a custom element reader
    pub fn read_sequence_with<T>(
        &mut self,
        min_wire_size: usize,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_count(min_wire_size)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    /// Read a count-prefixed sequence of structured records
    pub fn read_sequence<T: WireRecord>(&mut self) -> Result<Vec<T>> {
        self.read_sequence_with(T::MIN_WIRE_SIZE, T::read_from)
    }

    /// Read a structured record. On error the cursor is left where it was.
    pub fn read_record<T: WireRecord>(&mut self) -> Result<T> {
        let start = self.pos;
        let result = T::read_from(self);
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read an object reference. The returned handle is a new owner.
    pub fn read_object(&mut self) -> Result<Option<ObjectRef>> {
        let start = self.pos;
        let result = self.read_object_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_object_inner(&mut self) -> Result<Option<ObjectRef>> {
        let kind = self.read_u32()?;
        let index = self.read_u32()?;
        match kind {
            KIND_NULL => Ok(None),
            KIND_OBJECT => usize::try_from(index)
                .ok()
                .and_then(|i| self.objects.get(i))
                .cloned()
                .map(Some)
                .ok_or(ProtocolError::BadObjectIndex { index, len: self.objects.len() }),
            other => Err(ProtocolError::InvalidObjectKind(other)),
        }
    }
}
