//! Serde support for [`Tag`] and [`Text`]
//!
//! A tag is written as its four character text with non-printable bytes escaped as `\xNN`. Text
//! is written as a string when it is valid UTF-8 and as bytes otherwise.

use std::fmt;

use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{field::Text, tag::Tag};

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_bytes(self.as_bytes()),
        }
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Text;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string or a byte array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Text, E> {
        Ok(v.into())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Text, E> {
        Ok(v.into())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Text, E> {
        Ok(v.into())
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Text, E> {
        Ok(v.into())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Text, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(bytes.into())
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TextVisitor)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tag_with_control_byte() -> serde_json::Result<()> {
        let tag = Tag::new(b"NPC\0");
        let json = serde_json::to_string(&tag)?;
        assert_eq!(json, r#""NPC\\x00""#);
        assert_eq!(serde_json::from_str::<Tag>(&json)?, tag);
        Ok(())
    }

    #[test]
    fn text_outside_utf8() -> serde_json::Result<()> {
        let text = Text::from(&b"Ch\xe2teau"[..]);
        let json = serde_json::to_string(&text)?;
        assert_eq!(json, "[67,104,226,116,101,97,117]");
        assert_eq!(serde_json::from_str::<Text>(&json)?, text);

        let text = Text::from("Balmora");
        let json = serde_json::to_string(&text)?;
        assert_eq!(json, r#""Balmora""#);
        assert_eq!(serde_json::from_str::<Text>(&json)?, text);
        Ok(())
    }
}
