use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A compiled build of the game. Each build places the same routines and
/// globals at different addresses, so every patch needs to know which one
/// it is working against.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "0-00")]
    NtscU0_00,
    #[serde(rename = "0-01")]
    NtscU0_01,
    #[serde(rename = "0-02")]
    NtscU0_02,
    #[serde(rename = "kor")]
    NtscK,
    #[serde(rename = "jpn")]
    NtscJ,
    #[serde(rename = "pal")]
    Pal,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("unrecognized game version: {0:?}")]
pub struct UnknownVersion(pub String);

impl Version {
    pub const ALL: [Version; 6] = [
        Version::NtscU0_00,
        Version::NtscU0_01,
        Version::NtscU0_02,
        Version::NtscK,
        Version::NtscJ,
        Version::Pal,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Version::NtscU0_00 => "0-00",
            Version::NtscU0_01 => "0-01",
            Version::NtscU0_02 => "0-02",
            Version::NtscK => "kor",
            Version::NtscJ => "jpn",
            Version::Pal => "pal",
        }
    }
}

impl FromStr for Version {
    type Err = UnknownVersion;

    // Tags are matched exactly; "PAL" is not "pal".
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Version::ALL
            .iter()
            .copied()
            .find(|v| v.tag() == tag)
            .ok_or_else(|| UnknownVersion(tag.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::{UnknownVersion, Version};

    #[test]
    fn tags_round_trip_through_from_str() {
        for version in Version::ALL {
            assert_eq!(version.tag().parse::<Version>(), Ok(version));
        }
    }

    #[test]
    fn tags_are_unique() {
        for (i, a) in Version::ALL.iter().enumerate() {
            for b in &Version::ALL[i + 1..] {
                assert_ne!(a.tag(), b.tag());
            }
        }
    }

    #[test]
    fn tag_match_is_case_sensitive() {
        assert_eq!(
            "PAL".parse::<Version>(),
            Err(UnknownVersion("PAL".to_string()))
        );
        assert!("".parse::<Version>().is_err());
        assert!("0-03".parse::<Version>().is_err());
    }

    #[test]
    fn serializes_as_tag() {
        let json = serde_json::to_string(&Version::NtscU0_00).unwrap();
        assert_eq!(json, "\"0-00\"");
        let back: Version = serde_json::from_str("\"jpn\"").unwrap();
        assert_eq!(back, Version::NtscJ);
    }
}
