//! Contains the types for collation configuration.

use std::convert::TryFrom;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use typed_builder::TypedBuilder;

use crate::error::{Error, ErrorKind};

/// A collation configuration, applied per statement within bulk-shaped write commands.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct Collation {
    /// The ICU locale.
    #[builder(!default)]
    pub locale: String,

    /// The level of comparison to perform.
    pub strength: Option<CollationStrength>,

    /// Whether to include a separate level for case differences.
    pub case_level: Option<bool>,

    /// Whether to compare numeric strings as numbers or strings.
    pub numeric_ordering: Option<bool>,

    /// Whether strings with diacritics sort from the back of the string.
    pub backwards: Option<bool>,
}

/// The level of comparison to perform. Serialized as the integer level the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollationStrength {
    /// Differences between base characters only (level 1).
    Primary,

    /// Accents are considered secondary differences (level 2).
    Secondary,

    /// Case differences are distinguished (level 3).
    Tertiary,

    /// Distinguishes words with and without punctuation (level 4).
    Quaternary,

    /// Unicode code point tiebreaker when levels 1-4 are equal (level 5).
    Identical,
}

impl From<CollationStrength> for u32 {
    fn from(strength: CollationStrength) -> Self {
        match strength {
            CollationStrength::Primary => 1,
            CollationStrength::Secondary => 2,
            CollationStrength::Tertiary => 3,
            CollationStrength::Quaternary => 4,
            CollationStrength::Identical => 5,
        }
    }
}

impl TryFrom<u32> for CollationStrength {
    type Error = Error;

    fn try_from(level: u32) -> std::result::Result<Self, Self::Error> {
        Ok(match level {
            1 => CollationStrength::Primary,
            2 => CollationStrength::Secondary,
            3 => CollationStrength::Tertiary,
            4 => CollationStrength::Quaternary,
            5 => CollationStrength::Identical,
            _ => {
                return Err(ErrorKind::InvalidArgument {
                    message: format!("invalid collation strength: {}", level),
                }
                .into())
            }
        })
    }
}

impl Serialize for CollationStrength {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(u32::from(*self) as i32)
    }
}

impl<'de> Deserialize<'de> for CollationStrength {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = u32::deserialize(deserializer)?;
        Self::try_from(level).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_strength_as_integer() {
        let collation = Collation::builder()
            .locale("en_US")
            .strength(CollationStrength::Secondary)
            .numeric_ordering(true)
            .build();
        let serialized = bson::to_document(&collation).unwrap();
        assert_eq!(
            serialized,
            doc! { "locale": "en_US", "strength": 2, "numericOrdering": true }
        );
    }

    #[test]
    fn rejects_out_of_range_strength() {
        assert!(CollationStrength::try_from(0).is_err());
        assert!(CollationStrength::try_from(6).is_err());
        assert_eq!(
            CollationStrength::try_from(3).unwrap(),
            CollationStrength::Tertiary
        );
    }
}
