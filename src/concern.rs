//! Contains the types for write concerns.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::error::{ErrorKind, Result};

/// Specifies the level of acknowledgement requested from the server for write operations.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct WriteConcern {
    /// Requests acknowledgement that the operation has propagated to a specific number or variety
    /// of servers.
    pub w: Option<Acknowledgment>,

    /// Specifies a time limit for the write concern. If an operation has not propagated to the
    /// requested level within the time limit, an error will return.
    ///
    /// Note that an error being returned due to a write concern error does not imply that the
    /// write would not have finished propagating if allowed more time to finish, and the
    /// server will not roll back the writes that occurred before the timeout was reached.
    #[serde(rename = "wtimeout", alias = "wtimeoutMS")]
    #[serde(serialize_with = "crate::serde_util::serialize_duration_option_as_int_millis")]
    #[serde(deserialize_with = "crate::serde_util::deserialize_duration_option_from_u64_millis")]
    #[serde(default)]
    pub w_timeout: Option<Duration>,

    /// Requests acknowledgement that the operation has propagated to the on-disk journal.
    #[serde(rename = "j", alias = "journal")]
    pub journal: Option<bool>,

    /// Requests that the server flush data to disk before acknowledging. Deprecated on modern
    /// servers in favor of `journal` but still accepted on the wire.
    pub fsync: Option<bool>,
}

/// The type of the `w` field in a [`WriteConcern`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Acknowledgment {
    /// Requires acknowledgement that the write has reached the specified number of nodes.
    ///
    /// Note: specifying 0 here indicates that the write concern is unacknowledged.
    Nodes(u32),

    /// Requires acknowledgement that the write has reached the majority of nodes.
    Majority,

    /// Requires acknowledgement according to the given custom write concern.
    Custom(String),
}

impl Serialize for Acknowledgment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Acknowledgment::Majority => serializer.serialize_str("majority"),
            // Node counts beyond i32 range widen rather than wrap.
            Acknowledgment::Nodes(n) => match i32::try_from(*n) {
                Ok(n) => serializer.serialize_i32(n),
                Err(_) => serializer.serialize_i64(i64::from(*n)),
            },
            Acknowledgment::Custom(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Acknowledgment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntOrString {
            Int(u32),
            String(String),
        }
        match IntOrString::deserialize(deserializer)? {
            IntOrString::String(s) => Ok(s.into()),
            IntOrString::Int(i) => Ok(i.into()),
        }
    }
}

impl From<u32> for Acknowledgment {
    fn from(i: u32) -> Self {
        Acknowledgment::Nodes(i)
    }
}

impl From<&str> for Acknowledgment {
    fn from(s: &str) -> Self {
        if s == "majority" {
            Acknowledgment::Majority
        } else {
            Acknowledgment::Custom(s.to_string())
        }
    }
}

impl From<String> for Acknowledgment {
    fn from(s: String) -> Self {
        Acknowledgment::from(s.as_str())
    }
}

impl WriteConcern {
    /// A `WriteConcern` requesting [`Acknowledgment::Nodes`].
    pub fn nodes(v: u32) -> Self {
        Acknowledgment::Nodes(v).into()
    }

    /// A `WriteConcern` requesting [`Acknowledgment::Majority`].
    pub fn majority() -> Self {
        Acknowledgment::Majority.into()
    }

    /// A `WriteConcern` with a custom acknowledgment.
    pub fn custom(s: impl AsRef<str>) -> Self {
        Acknowledgment::from(s.as_ref()).into()
    }

    /// Whether the write concern was created with no values specified. If true, the write concern
    /// should be considered the server's default.
    pub(crate) fn is_empty(&self) -> bool {
        self.w.is_none() && self.w_timeout.is_none() && self.journal.is_none() && self.fsync.is_none()
    }

    /// Resolves the write concern to apply to a command: an explicitly provided concern with any
    /// field present wins wholesale; otherwise the default source's concern is inherited. Presence
    /// is what counts, not value: `journal: Some(false)` suppresses the default just as
    /// `journal: Some(true)` does. Neither input is mutated.
    pub(crate) fn resolve(
        explicit: Option<&WriteConcern>,
        default: Option<&WriteConcern>,
    ) -> Option<WriteConcern> {
        match explicit {
            Some(concern) if !concern.is_empty() => Some(concern.clone()),
            _ => default.filter(|concern| !concern.is_empty()).cloned(),
        }
    }

    /// Validates the write concern. A write concern is invalid if the `w` field is 0 and the `j`
    /// field is `true`.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.w == Some(Acknowledgment::Nodes(0)) && self.journal == Some(true) {
            return Err(ErrorKind::InvalidArgument {
                message: "write concern cannot have w=0 and j=true".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<Acknowledgment> for WriteConcern {
    fn from(w: Acknowledgment) -> Self {
        WriteConcern {
            w: Some(w),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_applies_when_nothing_specified() {
        let default = WriteConcern::nodes(2);
        let resolved = WriteConcern::resolve(None, Some(&default));
        assert_eq!(resolved, Some(WriteConcern::nodes(2)));

        let empty = WriteConcern::default();
        let resolved = WriteConcern::resolve(Some(&empty), Some(&default));
        assert_eq!(resolved, Some(WriteConcern::nodes(2)));
    }

    #[test]
    fn explicit_wins_over_default() {
        let explicit = WriteConcern::nodes(1);
        let default = WriteConcern::nodes(2);
        let resolved = WriteConcern::resolve(Some(&explicit), Some(&default));
        assert_eq!(resolved, Some(WriteConcern::nodes(1)));
    }

    #[test]
    fn present_but_false_journal_counts_as_specified() {
        let explicit = WriteConcern::builder().journal(false).build();
        let default = WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .journal(true)
            .build();
        let resolved = WriteConcern::resolve(Some(&explicit), Some(&default)).unwrap();
        assert_eq!(resolved.journal, Some(false));
        assert_eq!(resolved.w, None);
    }

    #[test]
    fn unacknowledged_with_journal_is_invalid() {
        let concern = WriteConcern::builder()
            .w(Acknowledgment::Nodes(0))
            .journal(true)
            .build();
        assert!(concern.validate().is_err());
        assert!(WriteConcern::nodes(0).validate().is_ok());
    }

    #[test]
    fn node_counts_beyond_i32_range_do_not_wrap() {
        let serialized = bson::to_document(&WriteConcern::nodes(u32::MAX)).unwrap();
        assert_eq!(
            serialized.get("w"),
            Some(&crate::bson::Bson::Int64(i64::from(u32::MAX)))
        );

        let serialized = bson::to_document(&WriteConcern::nodes(2)).unwrap();
        assert_eq!(serialized.get("w"), Some(&crate::bson::Bson::Int32(2)));
    }

    #[test]
    fn serializes_in_wire_form() {
        let concern = WriteConcern::builder()
            .w(Acknowledgment::Majority)
            .w_timeout(Duration::from_millis(100))
            .journal(true)
            .build();
        let serialized = bson::to_document(&concern).unwrap();
        assert_eq!(
            serialized,
            doc! { "w": "majority", "wtimeout": 100i64, "j": true }
        );
    }
}
