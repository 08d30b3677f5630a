//! Typed views over single subrecords
//!
//! Every field type is bound to exactly one [`Tag`] through [`Field::TAG`]. Decoding checks the tag
//! and the minimum payload size, encoding produces the payload for a fresh [`Subrecord`].
//!
//! The macros in this module generate the common shapes:
//!
//! - [`string_field!`] variable length text, optionally NUL terminated
//! - [`scalar_field!`] a single little endian number
//! - [`struct_field!`] a fixed size [`binrw`] structure
//!
//! Text is kept as the raw bytes of the plugin, see [`Text`].

use std::{borrow::Cow, fmt};
use tracing::warn;

use crate::{
    error::{Error, Result},
    subrecord::Subrecord,
    tag::Tag,
};

/// A strongly typed value stored in a subrecord with a fixed tag
pub trait Field: Sized {
    /// The only tag this field can be read from or written to
    const TAG: Tag;

    /// Decode the payload of a subrecord already known to carry [`Self::TAG`]
    fn decode(data: &[u8]) -> Result<Self>;

    /// Encode the value into a subrecord payload
    fn encode(&self) -> Result<Vec<u8>>;

    fn from_subrecord(subrecord: &Subrecord) -> Result<Self> {
        if subrecord.tag != Self::TAG {
            return Err(Error::TagMismatch {
                expected: Self::TAG,
                actual: subrecord.tag,
            });
        }
        Self::decode(&subrecord.data)
    }

    fn to_subrecord(&self) -> Result<Subrecord> {
        Ok(Subrecord::new(Self::TAG, self.encode()?))
    }
}

/// Fail unless `data` holds at least `required` bytes
pub fn require_len(tag: Tag, data: &[u8], required: usize) -> Result<()> {
    if data.len() < required {
        return Err(Error::FieldTooShort {
            tag,
            required,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Warn about payload bytes past the `size` a fixed field reads
pub fn warn_trailing(tag: Tag, data: &[u8], size: usize) {
    if data.len() > size {
        warn!(
            "ignoring {} trailing bytes in {}, expected {}",
            data.len() - size,
            tag,
            size
        );
    }
}

/// Text as stored in a plugin
///
/// Plugins carry no encoding marker and most were written in a Windows code page, so the bytes
/// are kept as they are and written back unchanged. [`Text::to_string_lossy`] gives a readable
/// view.
#[derive(Clone, PartialEq, Eq, Hash, Default, derive_more::AsRef, derive_more::Deref)]
pub struct Text(Vec<u8>);

impl Text {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The text as UTF-8 if it is valid, otherwise every byte read as Latin-1
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match std::str::from_utf8(&self.0) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => Cow::Owned(self.0.iter().map(|b| char::from(*b)).collect()),
        }
    }
}

impl From<Vec<u8>> for Text {
    fn from(value: Vec<u8>) -> Self {
        Text(value)
    }
}

impl From<&[u8]> for Text {
    fn from(value: &[u8]) -> Self {
        Text(value.to_vec())
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Text(value.into_bytes())
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text(value.as_bytes().to_vec())
    }
}

impl PartialEq<str> for Text {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Text {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// Read a zero padded string, stopping at the first NUL
pub fn read_padded_string(raw: &[u8]) -> Text {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    Text::from(&raw[..end])
}

/// Write `bytes` followed by NUL padding up to `width` bytes
pub fn write_padded_string(out: &mut Vec<u8>, bytes: &[u8], width: usize) -> Result<()> {
    if bytes.len() > width {
        return Err(Error::ValueTooLong {
            width,
            len: bytes.len(),
        });
    }
    out.extend_from_slice(bytes);
    out.resize(out.len() + width - bytes.len(), 0);
    Ok(())
}

/// Store a field that may appear at most once in a self delimiting group.
///
/// Returns `false` without consuming anything when the slot is already taken, which ends the
/// group.
pub(crate) fn take_once<F: Field>(slot: &mut Option<F>, subrecord: &Subrecord) -> Result<bool> {
    if slot.is_some() {
        return Ok(false);
    }
    *slot = Some(F::from_subrecord(subrecord)?);
    Ok(true)
}

/// Store a scalar field of a record, replacing and warning about an earlier value.
pub(crate) fn assign<F: Field>(slot: &mut Option<F>, subrecord: &Subrecord, record: Tag) -> Result<()> {
    if slot.is_some() {
        warn!("duplicate {} in {}, keeping the last one", subrecord.tag, record);
    }
    *slot = Some(F::from_subrecord(subrecord)?);
    Ok(())
}

/// Append the subrecord for an optional field
pub(crate) fn push_field<F: Field>(out: &mut Vec<Subrecord>, field: &Option<F>) -> Result<()> {
    if let Some(field) = field {
        out.push(field.to_subrecord()?);
    }
    Ok(())
}

/// Define a string field where the whole payload is the value.
///
/// A single trailing NUL is treated as a terminator and remembered so that the payload can be
/// reproduced exactly. Any other bytes are kept as they are.
#[macro_export]
macro_rules! string_field {
    ($(#[$meta:meta])* $name:ident, $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            pub value: $crate::field::Text,
            pub terminated: bool,
        }

        impl $name {
            /// Create a value written without a NUL terminator
            pub fn new(value: impl Into<$crate::field::Text>) -> Self {
                Self {
                    value: value.into(),
                    terminated: false,
                }
            }

            /// Create a value written with a NUL terminator
            pub fn terminated(value: impl Into<$crate::field::Text>) -> Self {
                Self {
                    value: value.into(),
                    terminated: true,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.value, f)
            }
        }

        impl $crate::field::Field for $name {
            const TAG: $crate::tag::Tag = $tag;

            fn decode(data: &[u8]) -> $crate::error::Result<Self> {
                let (body, terminated) = match data.split_last() {
                    Some((0, body)) => (body, true),
                    _ => (data, false),
                };
                Ok(Self {
                    value: $crate::field::Text::from(body),
                    terminated,
                })
            }

            fn encode(&self) -> $crate::error::Result<Vec<u8>> {
                let mut out = Vec::with_capacity(self.value.len() + 1);
                out.extend_from_slice(self.value.as_bytes());
                if self.terminated {
                    out.push(0);
                }
                Ok(out)
            }
        }
    };
}

/// Define a field holding one little endian number.
#[macro_export]
macro_rules! scalar_field {
    ($(#[$meta:meta])* $name:ident($ty:ty), $tag:expr) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Default,
            derive_more::Constructor,
            derive_more::Deref,
            derive_more::From,
        )]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $ty);

        impl $crate::field::Field for $name {
            const TAG: $crate::tag::Tag = $tag;

            fn decode(data: &[u8]) -> $crate::error::Result<Self> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                $crate::field::require_len(Self::TAG, data, SIZE)?;
                $crate::field::warn_trailing(Self::TAG, data, SIZE);
                let mut bytes = [0u8; SIZE];
                bytes.copy_from_slice(&data[..SIZE]);
                Ok(Self(<$ty>::from_le_bytes(bytes)))
            }

            fn encode(&self) -> $crate::error::Result<Vec<u8>> {
                Ok(self.0.to_le_bytes().to_vec())
            }
        }
    };
}

/// Implement [`Field`] for a fixed size [`binrw`] structure with a little endian layout.
#[macro_export]
macro_rules! struct_field {
    ($name:ty, $tag:expr, $size:expr) => {
        impl $crate::field::Field for $name {
            const TAG: $crate::tag::Tag = $tag;

            fn decode(data: &[u8]) -> $crate::error::Result<Self> {
                $crate::field::require_len(Self::TAG, data, $size)?;
                $crate::field::warn_trailing(Self::TAG, data, $size);
                Ok(<$name as binrw::BinRead>::read(&mut std::io::Cursor::new(
                    &data[..$size],
                ))?)
            }

            fn encode(&self) -> $crate::error::Result<Vec<u8>> {
                let mut out = std::io::Cursor::new(Vec::with_capacity($size));
                binrw::BinWrite::write(self, &mut out)?;
                Ok(out.into_inner())
            }
        }
    };
}

#[cfg(test)]
mod test {
    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::tag;

    string_field!(
        /// Test name
        TestName,
        tag::NAME
    );
    scalar_field!(
        /// Test scale
        TestScale(f32),
        tag::XSCL
    );

    #[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq)]
    #[brw(little)]
    struct TestGrid {
        x: i32,
        y: i32,
    }
    struct_field!(TestGrid, tag::CNDT, 8);

    #[test]
    fn decode_unterminated_string() -> Result<()> {
        let subrecord = Subrecord::new(tag::NAME, b"lantern_01".to_vec());
        let name = TestName::from_subrecord(&subrecord)?;

        assert_eq!(name, TestName::new("lantern_01"));
        assert_eq!(name.to_subrecord()?, subrecord);

        Ok(())
    }

    #[test]
    fn decode_terminated_string() -> Result<()> {
        let subrecord = Subrecord::new(tag::NAME, b"Balmora\0".to_vec());
        let name = TestName::from_subrecord(&subrecord)?;

        assert_eq!(name.value, "Balmora");
        assert!(name.terminated);
        assert_eq!(name.to_subrecord()?, subrecord);

        Ok(())
    }

    #[test]
    fn decode_code_page_string() -> Result<()> {
        let subrecord = Subrecord::new(tag::NAME, b"Ch\xe2teau\0".to_vec());
        let name = TestName::from_subrecord(&subrecord)?;

        assert_eq!(name.value.as_bytes(), b"Ch\xe2teau");
        assert_eq!(name.to_string(), "Ch\u{e2}teau");
        assert_eq!(name.to_subrecord()?, subrecord);

        Ok(())
    }

    #[test]
    fn decode_wrong_tag() {
        let subrecord = Subrecord::new(tag::RGNN, b"Bitter Coast Region".to_vec());
        assert!(matches!(
            TestName::from_subrecord(&subrecord),
            Err(Error::TagMismatch { expected, actual }) if expected == tag::NAME && actual == tag::RGNN
        ));
    }

    #[test]
    fn decode_short_scalar() {
        let subrecord = Subrecord::new(tag::XSCL, vec![0x00, 0x00, 0x80]);
        assert!(matches!(
            TestScale::from_subrecord(&subrecord),
            Err(Error::FieldTooShort { required: 4, actual: 3, .. })
        ));
    }

    #[test]
    #[traced_test]
    fn decode_long_scalar() -> Result<()> {
        let subrecord = Subrecord::new(tag::XSCL, vec![0x00, 0x00, 0xC0, 0x3F, 0xAA, 0xBB]);
        let scale = TestScale::from_subrecord(&subrecord)?;

        assert_eq!(*scale, 1.5);
        assert!(logs_contain("ignoring 2 trailing bytes in XSCL, expected 4"));

        Ok(())
    }

    #[test]
    #[traced_test]
    fn decode_long_struct() -> Result<()> {
        let grid = TestGrid::decode(&[1, 0, 0, 0, 2, 0, 0, 0, 3])?;

        assert_eq!(grid, TestGrid { x: 1, y: 2 });
        assert!(logs_contain("ignoring 1 trailing bytes in CNDT, expected 8"));

        Ok(())
    }

    #[test]
    fn decode_scalar() -> Result<()> {
        let subrecord = Subrecord::new(tag::XSCL, vec![0x00, 0x00, 0xC0, 0x3F]);
        let scale = TestScale::from_subrecord(&subrecord)?;

        assert_eq!(*scale, 1.5);
        assert_eq!(scale.encode()?, subrecord.data);

        Ok(())
    }

    #[test]
    fn decode_struct() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0xFE, 0xFF, 0xFF, 0xFF,
            0x03, 0x00, 0x00, 0x00,
        ];

        let grid = TestGrid::decode(&data)?;
        assert_eq!(grid, TestGrid { x: -2, y: 3 });
        assert_eq!(grid.encode()?, data);

        Ok(())
    }

    #[test]
    fn padded_string_exact_width() -> Result<()> {
        let mut out = Vec::new();
        write_padded_string(&mut out, b"abcd", 4)?;
        assert_eq!(out, b"abcd");

        let mut out = Vec::new();
        write_padded_string(&mut out, b"ab", 4)?;
        assert_eq!(out, b"ab\0\0");
        assert_eq!(read_padded_string(&out), "ab");

        Ok(())
    }

    #[test]
    fn padded_string_too_long() {
        let mut out = Vec::new();
        assert!(matches!(
            write_padded_string(&mut out, b"abcde", 4),
            Err(Error::ValueTooLong { width: 4, len: 5 })
        ));
    }
}
