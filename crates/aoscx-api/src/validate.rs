// Pure input validators.
//
// Everything here runs before any network call and fails with
// `Error::Validation`; nothing in this module touches the client.

use std::net::IpAddr;
use std::sync::LazyLock;

use ipnet::IpNet;
use regex::Regex;

use crate::error::Error;

/// Physical port names follow the `<slot>/<unit>/<port>` pattern.
static INTERFACE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+/\d+/\d+$").expect("interface name pattern is valid"));

/// Validate a physical interface name (e.g. `1/1/1`).
pub fn interface_name(name: &str) -> Result<(), Error> {
    if INTERFACE_NAME.is_match(name) {
        return Ok(());
    }
    Err(Error::validation(format!(
        "invalid interface name {name:?} - expected <slot>/<unit>/<port>, e.g. 1/1/1"
    )))
}

/// Validate an IPv4 or IPv6 address, with or without a `/prefix` suffix.
pub fn ip_address(address: &str) -> Result<(), Error> {
    let valid = if address.contains('/') {
        address.parse::<IpNet>().is_ok()
    } else {
        address.parse::<IpAddr>().is_ok()
    };
    if valid {
        return Ok(());
    }
    Err(Error::validation(format!(
        "invalid IP address {address:?} - expected an address or address/prefix"
    )))
}

/// Validate a VLAN id (1-4094).
pub fn vlan_id(id: u16) -> Result<(), Error> {
    if (1..=4094).contains(&id) {
        return Ok(());
    }
    Err(Error::validation(format!(
        "invalid VLAN id {id} - must be between 1 and 4094"
    )))
}
