//! Primitive wire codec.
//!
//! Fixed-width little-endian integers, booleans, coordinate pairs, narrow ids,
//! the packed alliance word, counted unit-id lists and the fixed chat buffer.
//! Every `get` returns `None` when too few bytes remain; callers restore the
//! [`Reader`] cursor themselves before trying another interpretation.

mod wire;

pub use wire::{WireType, WireValue};

use crate::config::CommandConfig;
use crate::state::{
    AllianceTable, OrderId, TechId, TilePos, UnitId, UnitTypeId, UpgradeId, VisionMask, Xy,
};

// ============================================================================
// Cursor types
// ============================================================================

/// Byte cursor over an immutable buffer.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Starts a cursor at `position` within `bytes`.
    pub fn at(bytes: &'a [u8], position: usize) -> Self {
        Self {
            bytes,
            position: position.min(bytes.len()),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewinds (or advances) the cursor to a previously observed position.
    #[inline]
    pub fn restore(&mut self, position: usize) {
        self.position = position.min(self.bytes.len());
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consumes exactly `len` bytes, or nothing.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(len)?;
        let bytes = self.bytes.get(self.position..end)?;
        self.position = end;
        Some(bytes)
    }

    /// Consumes a fixed-size array, or nothing.
    pub fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.take(N)?.try_into().ok()
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    pub fn get<T: WireCodec>(&mut self) -> Option<T> {
        T::get(self)
    }
}

/// Growable byte sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put<T: WireCodec>(&mut self, value: &T) {
        value.put(self);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ============================================================================
// Fixed-size values
// ============================================================================

/// A value with a fixed-size wire representation.
pub trait WireCodec: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn put(&self, writer: &mut Writer);

    fn get(reader: &mut Reader<'_>) -> Option<Self>;
}

macro_rules! le_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireCodec for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn put(&self, writer: &mut Writer) {
                    writer.put_bytes(&self.to_le_bytes());
                }

                #[inline]
                fn get(reader: &mut Reader<'_>) -> Option<Self> {
                    reader.take_array().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

le_codec!(u8, u16, u32, i16, i32);

macro_rules! newtype_codec {
    ($($ty:ident($repr:ty)),* $(,)?) => {
        $(
            impl WireCodec for $ty {
                const SIZE: usize = <$repr as WireCodec>::SIZE;

                #[inline]
                fn put(&self, writer: &mut Writer) {
                    self.0.put(writer);
                }

                #[inline]
                fn get(reader: &mut Reader<'_>) -> Option<Self> {
                    <$repr>::get(reader).map($ty)
                }
            }
        )*
    };
}

newtype_codec!(
    UnitId(u16),
    UnitTypeId(u16),
    TechId(u8),
    UpgradeId(u8),
    OrderId(u8),
    VisionMask(u16),
);

/// One byte; any nonzero value decodes as `true`.
impl WireCodec for bool {
    const SIZE: usize = 1;

    fn put(&self, writer: &mut Writer) {
        (*self as u8).put(writer);
    }

    fn get(reader: &mut Reader<'_>) -> Option<Self> {
        u8::get(reader).map(|byte| byte != 0)
    }
}

/// Two unsigned 16-bit components; positions outside `0..=65535` wrap on encode.
impl WireCodec for Xy {
    const SIZE: usize = 2 * u16::SIZE;

    fn put(&self, writer: &mut Writer) {
        (self.x as u16).put(writer);
        (self.y as u16).put(writer);
    }

    fn get(reader: &mut Reader<'_>) -> Option<Self> {
        let x = u16::get(reader)?;
        let y = u16::get(reader)?;
        Some(Xy::new(x as i32, y as i32))
    }
}

impl WireCodec for TilePos {
    const SIZE: usize = 2 * u16::SIZE;

    fn put(&self, writer: &mut Writer) {
        self.x.put(writer);
        self.y.put(writer);
    }

    fn get(reader: &mut Reader<'_>) -> Option<Self> {
        let x = u16::get(reader)?;
        let y = u16::get(reader)?;
        Some(TilePos::new(x, y))
    }
}

/// Twelve 2-bit stances packed low-to-high into one word.
impl WireCodec for AllianceTable {
    const SIZE: usize = u32::SIZE;

    fn put(&self, writer: &mut Writer) {
        self.pack().put(writer);
    }

    fn get(reader: &mut Reader<'_>) -> Option<Self> {
        u32::get(reader).map(AllianceTable::unpack)
    }
}

// ============================================================================
// Variable-size values
// ============================================================================

/// Largest encoded unit list: a count byte plus 255 ids.
pub const MAX_UNIT_LIST_SIZE: usize = 1 + u8::MAX as usize * UnitId::SIZE;

/// Writes a count byte followed by the ids. Lists longer than 255 are cut.
pub fn put_unit_list(writer: &mut Writer, ids: &[UnitId]) {
    let count = ids.len().min(u8::MAX as usize);
    (count as u8).put(writer);
    for id in &ids[..count] {
        id.put(writer);
    }
}

/// Reads a count byte then exactly that many ids.
pub fn get_unit_list(reader: &mut Reader<'_>) -> Option<Vec<UnitId>> {
    let count = u8::get(reader)? as usize;
    (0..count).map(|_| UnitId::get(reader)).collect()
}

/// Writes `text` into the fixed, zero-padded chat buffer, truncating at
/// [`CommandConfig::TEXT_LEN`] bytes.
pub fn put_text(writer: &mut Writer, text: &str) {
    let mut buf = [0u8; CommandConfig::TEXT_LEN];
    let bytes = text.as_bytes();
    let len = bytes.len().min(buf.len());
    buf[..len].copy_from_slice(&bytes[..len]);
    writer.put_bytes(&buf);
}

/// Reads the fixed chat buffer, stopping at the first zero byte and dropping
/// control bytes. Not byte-for-byte reversible.
pub fn get_text(reader: &mut Reader<'_>) -> Option<String> {
    let buf = reader.take(CommandConfig::TEXT_LEN)?;
    let filtered: Vec<u8> = buf
        .iter()
        .copied()
        .take_while(|&byte| byte != 0)
        .filter(|&byte| byte >= 32)
        .collect();
    Some(String::from_utf8_lossy(&filtered).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Owner, Stance};

    #[test]
    fn integers_are_little_endian() {
        let mut writer = Writer::new();
        writer.put(&0x1234u16);
        writer.put(&-2i32);
        assert_eq!(hex::encode(writer.as_bytes()), "3412feffffff");

        let mut reader = Reader::new(writer.as_bytes());
        assert_eq!(reader.get::<u16>(), Some(0x1234));
        assert_eq!(reader.get::<i32>(), Some(-2));
        assert!(reader.is_empty());
    }

    #[test]
    fn short_read_consumes_nothing() {
        let bytes = [0x01, 0x02, 0x03];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.get::<u8>(), Some(1));
        assert_eq!(reader.get::<u32>(), None);
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        let bytes = [0x00, 0x01, 0x7f];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.get::<bool>(), Some(false));
        assert_eq!(reader.get::<bool>(), Some(true));
        assert_eq!(reader.get::<bool>(), Some(true));
    }

    #[test]
    fn xy_uses_unsigned_halves() {
        let mut writer = Writer::new();
        writer.put(&Xy::new(40_000, 300));
        assert_eq!(hex::encode(writer.as_bytes()), "409c2c01");
        assert_eq!(
            Reader::new(writer.as_bytes()).get::<Xy>(),
            Some(Xy::new(40_000, 300))
        );

        let bytes = [0xff, 0xff, 0x00, 0x00];
        assert_eq!(Reader::new(&bytes).get::<Xy>(), Some(Xy::new(65_535, 0)));
    }

    #[test]
    fn alliance_word_unpacks_low_to_high() {
        let bytes = 0b1001u32.to_le_bytes();
        let table = Reader::new(&bytes).get::<AllianceTable>().unwrap();
        assert_eq!(table.stance(Owner(0)), Stance::Allied);
        assert_eq!(table.stance(Owner(1)), Stance::AlliedVictory);
        assert_eq!(table.stance(Owner(2)), Stance::Enemy);
    }

    #[test]
    fn unit_list_fails_when_count_exceeds_payload() {
        let bytes = [3, 0x01, 0x00, 0x02, 0x00];
        let mut reader = Reader::new(&bytes);
        assert_eq!(get_unit_list(&mut reader), None);

        let bytes = [2, 0x01, 0x00, 0x02, 0x00];
        let mut reader = Reader::new(&bytes);
        assert_eq!(
            get_unit_list(&mut reader),
            Some(vec![UnitId(1), UnitId(2)])
        );
    }

    #[test]
    fn text_stops_at_nul_and_drops_control_bytes() {
        let mut buf = [0u8; CommandConfig::TEXT_LEN];
        buf[..9].copy_from_slice(b"gl\x07 hf\tgg");
        buf[10] = b'x';
        let mut reader = Reader::new(&buf);
        assert_eq!(get_text(&mut reader).as_deref(), Some("gl hfgg"));
        assert!(reader.is_empty());
    }

    #[test]
    fn text_is_padded_to_fixed_width() {
        let mut writer = Writer::new();
        put_text(&mut writer, "hi");
        assert_eq!(writer.len(), CommandConfig::TEXT_LEN);
        assert_eq!(&writer.as_bytes()[..3], b"hi\0");
    }
}
