use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Release-channel letters that separate the build number from the revision, e.g. the `f` in
/// `2019.4.3f1`.
const RELEASE_TAGS: [char; 6] = ['a', 'b', 'c', 'f', 'p', 'x'];

/// Engine version as four numeric parts, missing trailing parts are zero.
///
/// `2019.4.3f1` parses as `2019.4.3.1` and compares numerically part by part.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct UnityVersion([u32; 4]);

impl UnityVersion {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self([major, minor, build, revision])
    }

    pub fn major(&self) -> u32 {
        self.0[0]
    }

    pub fn minor(&self) -> u32 {
        self.0[1]
    }

    pub fn parts(&self) -> [u32; 4] {
        self.0
    }
}

impl FromStr for UnityVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .map(|c| if RELEASE_TAGS.contains(&c) { '.' } else { c })
            .collect();

        // Regional suffixes such as `f1c1` add parts past the revision, which are dropped
        let mut parts = [0; 4];
        for (slot, part) in parts.iter_mut().zip(normalised.split('.')) {
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidVersion(s.to_owned()))?;
        }

        Ok(Self(parts))
    }
}

impl TryFrom<String> for UnityVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnityVersion> for String {
    fn from(value: UnityVersion) -> Self {
        value.to_string()
    }
}

impl Display for UnityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [major, minor, build, revision] = self.0;
        write!(f, "{major}.{minor}.{build}.{revision}")
    }
}
