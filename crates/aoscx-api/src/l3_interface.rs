// Layer-3 routed view of an interface.
//
// IPv4 addresses are inline fields on the interface row; IPv6 addresses
// are independent sub-resources under `.../ip6_addresses` and are
// reconciled as a set difference against what the device currently holds.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{SwitchClient, decode_object};
use crate::error::{Error, status_text};
use crate::interface::Interface;
use crate::types::{Attributes, ResourceState, reference_key};
use crate::validate;

/// Fixed sub-resource defaults for every provisioned IPv6 address:
/// a global-unicast node address usable for RA prefix derivation but not
/// as an RA route source.
const IP6_PREFERRED_LIFETIME_SECS: u32 = 604_800;
const IP6_VALID_LIFETIME_SECS: u32 = 2_592_000;

pub(crate) fn ip6_address_body(address: &str) -> Value {
    json!({
        "address": address,
        "type": "global-unicast",
        "preferred_lifetime": IP6_PREFERRED_LIFETIME_SECS,
        "valid_lifetime": IP6_VALID_LIFETIME_SECS,
        "node_address": true,
        "ra_prefix": true,
        "ra_route": false,
    })
}

/// Build the `ip4_address`/`ip4_address_secondary` fields.
///
/// Index 0 is the primary address; the rest are secondaries. Every entry
/// is syntax-checked before anything is emitted; an empty list clears
/// both fields.
pub(crate) fn ip4_attributes(ipv4: &[String]) -> Result<Attributes, Error> {
    let mut attrs = Attributes::new();
    match ipv4 {
        [] => {
            attrs.insert("ip4_address".into(), Value::Null);
            attrs.insert("ip4_address_secondary".into(), Value::Null);
        }
        [primary, secondary @ ..] => {
            validate::ip_address(primary)?;
            attrs.insert("ip4_address".into(), json!(primary));
            if secondary.is_empty() {
                attrs.insert("ip4_address_secondary".into(), Value::Null);
            } else {
                for address in secondary {
                    validate::ip_address(address)?;
                }
                attrs.insert("ip4_address_secondary".into(), json!(secondary));
            }
        }
    }
    Ok(attrs)
}

/// Three-way reconciliation of an interface's IPv6 address sub-resources.
///
/// Fetches the currently configured set, deletes every address not in
/// `desired`, then creates every desired address not currently present;
/// addresses in both sets are left untouched. Deletes issued before a
/// later validation or create failure are not rolled back.
pub(crate) async fn reconcile_ip6(
    client: &SwitchClient,
    interface: &str,
    desired: &[String],
) -> Result<(), Error> {
    let collection = client.ip6_path(interface, None);
    let (status, body) = client.get(&collection).await?;
    if status != StatusCode::OK {
        return Err(Error::remote(
            status,
            format!("failed to list IPv6 addresses on {interface}"),
        ));
    }
    let current = decode_object(&body)?;

    for address in current.keys() {
        if desired.iter().any(|d| d == address) {
            continue;
        }
        debug!(interface, address, "removing stale IPv6 address");
        let path = client.ip6_path(interface, Some(address));
        let (status, _) = client.send_empty(Method::DELETE, &path).await?;
        if status != StatusCode::NO_CONTENT {
            return Err(Error::remote(
                status,
                format!("failed to remove IPv6 address {address} from {interface}"),
            ));
        }
    }

    for address in desired {
        validate::ip_address(address)?;
        if current.contains_key(address) {
            continue;
        }
        debug!(interface, address, "adding IPv6 address");
        let (status, _) = client
            .send_json(Method::POST, &collection, &ip6_address_body(address))
            .await?;
        if status != StatusCode::CREATED {
            return Err(Error::remote(
                status,
                format!("failed to add IPv6 address {address} to {interface}"),
            ));
        }
    }

    Ok(())
}

/// Fetch the configured IPv6 address keys of an interface.
pub(crate) async fn fetch_ip6(
    client: &SwitchClient,
    interface: &str,
) -> Result<Vec<String>, Error> {
    let collection = client.ip6_path(interface, None);
    let (status, body) = client.get(&collection).await?;
    if status != StatusCode::OK {
        return Err(Error::remote(
            status,
            format!("failed to list IPv6 addresses on {interface}"),
        ));
    }
    let current = decode_object(&body)?;
    let mut addresses: Vec<String> = current.keys().filter(|k| !k.is_empty()).cloned().collect();
    addresses.sort_unstable();
    Ok(addresses)
}

/// Desired routed configuration for one interface.
#[derive(Debug, Clone, Default)]
pub struct L3Interface {
    pub interface: Interface,
    /// Ordered: index 0 is the primary address, the rest are secondary.
    pub ipv4: Vec<String>,
    /// Each entry becomes an independent `ip6_addresses` sub-resource.
    pub ipv6: Vec<String>,
    /// VRF name; defaults to `"default"`. Referenced by URI, never
    /// existence-checked.
    pub vrf: Option<String>,
    state: ResourceState,
}

impl L3Interface {
    pub fn new(interface: Interface) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }

    /// Presence of the routed configuration, as last observed.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    fn check_identity(&self) -> Result<(), Error> {
        if self.interface.name.is_empty() {
            return Err(Error::validation(
                "interface name is required to configure an L3 interface",
            ));
        }
        self.interface.check_values()
    }

    /// Build the routed attribute map. An interface is either L2 or L3,
    /// never both, so the switching fields are explicitly cleared.
    fn routed_attributes(&self, client: &SwitchClient) -> Result<Attributes, Error> {
        let mut attrs = self.interface.base_attributes();
        attrs.insert("routing".into(), Value::Bool(true));
        attrs.insert("vlan_mode".into(), Value::Null);
        attrs.insert("vlan_tag".into(), Value::Null);

        let vrf = self.vrf.as_deref().unwrap_or("default");
        attrs.insert("vrf".into(), json!(client.vrf_uri(vrf)));

        attrs.extend(ip4_attributes(&self.ipv4)?);

        if self.ipv6.is_empty() {
            attrs.insert("ip6_addresses".into(), Value::Null);
        }
        Ok(attrs)
    }

    /// Apply the routed configuration.
    ///
    /// Ensures the interface row exists (auto-creating it if missing),
    /// patches the routed attributes, then provisions each IPv6 address
    /// sub-resource. IPv6 creation is create-only here — no prior state is
    /// consulted — and per-address failures are aggregated into one error.
    pub async fn create(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        Interface::ensure_exists(client, &self.interface.name, self.interface.admin_state)
            .await?;

        let attrs = self.routed_attributes(client)?;
        for address in &self.ipv6 {
            validate::ip_address(address)?;
        }

        debug!(name = %self.interface.name, "configuring L3 interface");
        let path = client.interface_path(&self.interface.name);
        let (status, _) = client
            .send_json(Method::PATCH, &path, &Value::Object(attrs))
            .await?;
        if status != StatusCode::NO_CONTENT {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to configure routing on interface {}", self.interface.name),
            ));
        }

        let collection = client.ip6_path(&self.interface.name, None);
        let mut failed: Vec<String> = Vec::new();
        let mut last_status = StatusCode::CREATED;
        for address in &self.ipv6 {
            let (status, _) = client
                .send_json(Method::POST, &collection, &ip6_address_body(address))
                .await?;
            if status != StatusCode::CREATED {
                failed.push(format!("{address} ({})", status_text(status)));
                last_status = status;
            }
        }
        if !failed.is_empty() {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                last_status,
                format!(
                    "IPv6 addresses failed to create on {}: {}",
                    self.interface.name,
                    failed.join(", ")
                ),
            ));
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Update the routed configuration.
    ///
    /// IPv6 sub-resources are reconciled as a set difference against the
    /// device (see [`reconcile_ip6`]); the interface row is then patched,
    /// or merged over the current writable attributes and replaced with a
    /// PUT (success = 200) when `use_put` is set.
    pub async fn update(&mut self, client: &SwitchClient, use_put: bool) -> Result<(), Error> {
        self.check_identity()?;

        let mut attrs = if use_put {
            let mut current = Self::new(Interface::new(&self.interface.name));
            current.get(client).await?;
            current.interface.details
        } else {
            Attributes::new()
        };

        // Validate everything local before mutating remote sub-resources.
        let desired = self.routed_attributes(client)?;
        reconcile_ip6(client, &self.interface.name, &self.ipv6).await?;
        attrs.extend(desired);

        let method = if use_put { Method::PUT } else { Method::PATCH };
        let expected = if use_put {
            StatusCode::OK
        } else {
            StatusCode::NO_CONTENT
        };

        debug!(name = %self.interface.name, ?method, "updating L3 interface");
        let path = client.interface_path(&self.interface.name);
        let (status, _) = client
            .send_json(method, &path, &Value::Object(attrs))
            .await?;
        if status != expected {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to update routing on interface {}", self.interface.name),
            ));
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Reset the interface to an empty configuration (PUT `{}`).
    pub async fn delete(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        let mut base = Interface::new(&self.interface.name);
        base.delete(client).await?;
        self.state = ResourceState::Absent;
        Ok(())
    }

    /// Fetch the writable routed attributes plus the IPv6 sub-resources.
    pub async fn get(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;

        let path = format!(
            "{}?selector=writable",
            client.interface_path(&self.interface.name)
        );
        let (status, body) = client.get(&path).await?;

        if status != StatusCode::OK {
            self.state = if status == StatusCode::NOT_FOUND {
                ResourceState::Absent
            } else {
                ResourceState::Unknown
            };
            return Err(Error::remote(
                status,
                format!("failed to fetch L3 interface {}", self.interface.name),
            ));
        }

        self.state = ResourceState::Unknown;
        let attrs = decode_object(&body)?;
        let mut ipv4 = Vec::new();
        if let Some(Value::String(primary)) = attrs.get("ip4_address") {
            ipv4.push(primary.clone());
            if let Some(Value::Array(secondary)) = attrs.get("ip4_address_secondary") {
                ipv4.extend(secondary.iter().filter_map(Value::as_str).map(str::to_owned));
            }
        }
        self.ipv4 = ipv4;

        for (key, value) in attrs {
            match (key.as_str(), &value) {
                ("description", Value::String(description)) => {
                    self.interface.description = Some(description.clone());
                }
                ("admin", Value::String(admin)) => {
                    if let Ok(admin) = admin.parse() {
                        self.interface.admin_state = admin;
                    }
                }
                ("vrf", Value::Object(_)) => {
                    if let Some(vrf) = reference_key(&value) {
                        self.vrf = Some(vrf.to_owned());
                    }
                }
                _ => {}
            }
            self.interface.details.insert(key, value);
        }

        self.ipv6 = fetch_ip6(client, &self.interface.name).await?;

        self.state = ResourceState::Present;
        Ok(())
    }
}
