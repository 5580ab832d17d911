// Shared domain types: REST API version, admin state, VLAN switching mode,
// resource presence tracking, and the open attribute map every resource
// caches from the device.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// The last-fetched attribute map of a resource.
///
/// The switch schema is only partially typed; known fields are surfaced as
/// struct fields while everything else round-trips through this map as
/// explicit JSON variant values.
pub type Attributes = Map<String, Value>;

/// Supported REST API versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V10_09,
    V10_10,
}

impl ApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V10_09 => "v10.09",
            Self::V10_10 => "v10.10",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v10.09" => Ok(Self::V10_09),
            "v10.10" => Ok(Self::V10_10),
            other => Err(Error::validation(format!(
                "unsupported API version {other:?} - supported versions are v10.09 and v10.10"
            ))),
        }
    }
}

/// Administrative state of a VLAN or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Up,
    #[default]
    Down,
}

impl AdminState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(Error::validation(format!(
                "invalid admin state {other:?} - valid options are 'up' or 'down'"
            ))),
        }
    }
}

/// Switching mode of a Layer-2 interface.
///
/// `Trunk` is accepted as input and normalized to `NativeTagged` or
/// `NativeUntagged` during reconciliation, mirroring what the device
/// stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VlanMode {
    #[default]
    Access,
    Trunk,
    NativeTagged,
    NativeUntagged,
}

impl VlanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Trunk => "trunk",
            Self::NativeTagged => "native-tagged",
            Self::NativeUntagged => "native-untagged",
        }
    }

    /// Whether this is one of the trunking modes.
    pub fn is_trunk(self) -> bool {
        !matches!(self, Self::Access)
    }
}

impl fmt::Display for VlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VlanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "trunk" => Ok(Self::Trunk),
            "native-tagged" => Ok(Self::NativeTagged),
            "native-untagged" => Ok(Self::NativeUntagged),
            other => Err(Error::validation(format!(
                "invalid VLAN mode {other:?} - valid options are 'access', 'trunk', \
                 'native-tagged' or 'native-untagged'"
            ))),
        }
    }
}

/// Whether a desired-state object corresponds to an existing remote
/// resource.
///
/// Set only by the outcome of `get`/`create`/`delete`; a failed fetch
/// always resets it, so `Present` is never reported stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceState {
    /// No successful probe yet, or the last operation failed ambiguously.
    #[default]
    Unknown,
    /// The device reported the resource does not exist.
    Absent,
    /// The last `get`/`create` confirmed the resource exists.
    Present,
}

impl ResourceState {
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

/// Build a single-entry reference map `{ "<key>": "<resource-path>" }`,
/// the form the REST API uses for VLAN and VRF cross-references.
pub(crate) fn reference(key: impl ToString, uri: impl Into<String>) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(uri.into()));
    Value::Object(map)
}

/// Extract the key of a single-entry reference map, if the value is one.
pub(crate) fn reference_key(value: &Value) -> Option<&str> {
    value
        .as_object()
        .and_then(|map| map.keys().next())
        .map(String::as_str)
}
