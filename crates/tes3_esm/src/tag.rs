//! Four character codes identifying records and subrecords

use binrw::{BinRead, BinWrite};
use std::{fmt, str::FromStr};

use crate::error::Error;

/// A four byte record or subrecord identifier such as `CELL` or `NAME`
#[derive(BinRead, BinWrite, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Create a tag from its four bytes
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }

    const fn from_name(name: &str) -> Self {
        let b = name.as_bytes();
        assert!(b.len() == 4, "tags are four characters");
        Tag([b[0], b[1], b[2], b[3]])
    }

    /// The raw bytes of the tag
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Tag {
    fn from(value: [u8; 4]) -> Self {
        Tag(value)
    }
}

impl FromStr for Tag {
    type Err = Error;

    /// Parse four characters, where `\xNN` stands for one byte as [`Tag`]'s `Display` writes it
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTag(s.to_owned());
        let mut bytes = Vec::with_capacity(4);
        let mut rest = s.as_bytes();
        while let Some((&b, tail)) = rest.split_first() {
            if !b.is_ascii() {
                return Err(invalid());
            }
            match tail {
                [b'x', hi, lo, tail @ ..] if b == b'\\' => {
                    let digit = |d: u8| char::from(d).to_digit(16).ok_or_else(invalid);
                    bytes.push((digit(*hi)? * 16 + digit(*lo)?) as u8);
                    rest = tail;
                }
                _ => {
                    bytes.push(b);
                    rest = tail;
                }
            }
        }
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Tag(bytes))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if (b.is_ascii_graphic() && b != b'\\') || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl PartialEq<[u8; 4]> for Tag {
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

macro_rules! tags {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub const $name: Tag = Tag::from_name(stringify!($name));
        )*
    };
}

tags!(
    /// File header record
    TES3,
    /// File header data
    HEDR,
    /// Master file name
    MAST,
    /// Generic data block, meaning depends on the record
    DATA,
    /// Interior or exterior cell record
    CELL,
    /// Landscape record
    LAND,
    /// Identifier or name
    NAME,
    /// Region name
    RGNN,
    /// Map color
    NAM5,
    /// Water height
    WHGT,
    /// Ambient lighting
    AMBI,
    /// Moved reference
    MVRF,
    /// Cell or faction name, meaning depends on the group
    CNAM,
    /// Moved reference destination grid
    CNDT,
    /// Form reference
    FRMR,
    /// Temporary reference count
    NAM0,
    /// Reference blocked flag
    UNAM,
    /// Reference scale
    XSCL,
    /// Owning NPC
    ANAM,
    /// Global variable
    BNAM,
    /// Faction rank
    INDX,
    /// Soul
    XSOL,
    /// Enchantment charge
    XCHG,
    /// Health, uses or grid coordinates, meaning depends on the record
    INTV,
    /// Gold value
    NAM9,
    /// Travel destination
    DODT,
    /// Travel destination cell
    DNAM,
    /// Lock level
    FLTV,
    /// Key
    KNAM,
    /// Trap
    TNAM,
    /// Reference disabled marker
    ZNAM,
    /// Vertex normals
    VNML,
    /// Vertex heights
    VHGT,
    /// World map heights
    WNAM,
    /// Vertex colors
    VCLR,
    /// Vertex textures
    VTEX,
    /// Lua script list record
    LUAL,
    /// Lua script path
    LUAS,
    /// Lua script attachment flags and targets
    LUAF,
    /// Lua world data
    LUAW,
    /// Lua event
    LUAE,
    /// Lua data
    LUAD,
    /// Lua timer
    LUAT,
    /// Lua callback
    LUAC,
    /// Lua per record script data
    LUAR,
    /// Lua per reference script data
    LUAI,
    /// Lua menu script data record
    LUAM,
);

/// The record type tags that omwscripts files may attach a script to
pub mod targets {
    use super::Tag;

    tags!(
        ACTI, ARMO, BOOK, CLOT, CONT, CREA, DOOR, INGR, LIGH, MISC, NPC_, ALCH, WEAP, APPA, LOCK,
        PROB, REPA,
    );
}
