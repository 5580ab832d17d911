// Switched VLAN interface (SVI): a routed interface bound to a VLAN.
//
// The interface name is derived as `vlan{id}`. Unlike L2 access binding,
// the referenced VLAN must already exist — creating a gateway for a VLAN
// nobody defined is treated as a caller error.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{SwitchClient, decode_object};
use crate::error::{Error, status_text};
use crate::l3_interface::{fetch_ip6, ip4_attributes, ip6_address_body, reconcile_ip6};
use crate::types::{Attributes, ResourceState, reference_key};
use crate::validate;
use crate::vlan::Vlan;

/// Desired state of a VLAN's Layer-3 gateway interface.
#[derive(Debug, Clone, Default)]
pub struct VlanInterface {
    pub vlan: Vlan,
    pub description: Option<String>,
    /// Ordered: index 0 is the primary address, the rest are secondary.
    pub ipv4: Vec<String>,
    /// Each entry becomes an independent `ip6_addresses` sub-resource.
    pub ipv6: Vec<String>,
    /// VRF name; defaults to `"default"`.
    pub vrf: Option<String>,
    /// Last-fetched raw attributes.
    pub details: Attributes,
    state: ResourceState,
}

impl VlanInterface {
    pub fn new(vlan: Vlan) -> Self {
        Self {
            vlan,
            ..Self::default()
        }
    }

    /// The derived interface name, `vlan{id}`.
    pub fn interface_name(&self) -> String {
        format!("vlan{}", self.vlan.vlan_id)
    }

    /// Presence of the remote resource, as last observed.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    fn check_identity(&self) -> Result<(), Error> {
        validate::vlan_id(self.vlan.vlan_id)
    }

    /// Routed attributes shared by create and update. Admin state comes
    /// from the owned VLAN.
    fn routed_attributes(&self, client: &SwitchClient) -> Result<Attributes, Error> {
        let admin = self.vlan.admin_state.unwrap_or_default();
        let mut attrs = Attributes::new();
        attrs.insert(
            "description".into(),
            json!(self.description.clone().unwrap_or_default()),
        );
        attrs.insert("admin".into(), json!(admin));
        attrs.insert("user_config".into(), json!({ "admin": admin }));

        let vrf = self.vrf.as_deref().unwrap_or("default");
        attrs.insert("vrf".into(), json!(client.vrf_uri(vrf)));

        attrs.extend(ip4_attributes(&self.ipv4)?);
        Ok(attrs)
    }

    /// Best-effort removal of a just-created SVI after a later step
    /// failed; returns a note describing the undo outcome.
    async fn rollback_create(&self, client: &SwitchClient) -> String {
        let name = self.interface_name();
        let path = client.interface_path(&name);
        match client.send_empty(Method::DELETE, &path).await {
            Ok((status, _))
                if status == StatusCode::NO_CONTENT || status == StatusCode::OK =>
            {
                format!("; rolled back interface {name}")
            }
            Ok((status, _)) => format!(
                "; rollback of interface {name} failed ({})",
                status_text(status)
            ),
            Err(err) => format!("; rollback of interface {name} failed: {err}"),
        }
    }

    /// Create the SVI.
    ///
    /// The referenced VLAN must already exist (no auto-create). POSTs a
    /// new interface of type `vlan` bound to the VLAN's URI, then
    /// provisions the IPv6 sub-resources; the first IPv6 failure aborts
    /// and undoes the base interface on a best-effort basis.
    pub async fn create(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;

        let mut vlan = Vlan::by_id(self.vlan.vlan_id);
        vlan.get(client).await.map_err(|err| {
            Error::reconciliation(format!(
                "VLAN {} must exist before its SVI is created: {err}",
                self.vlan.vlan_id
            ))
        })?;

        let name = self.interface_name();
        let mut body = self.routed_attributes(client)?;
        for address in &self.ipv6 {
            validate::ip_address(address)?;
        }
        body.insert("name".into(), json!(name));
        body.insert("type".into(), json!("vlan"));
        body.insert(
            "interfaces".into(),
            json!([client.vlan_uri(self.vlan.vlan_id)]),
        );

        debug!(name = %name, "creating VLAN interface");
        let path = client.rest_path("system/interfaces");
        let (status, _) = client
            .send_json(Method::POST, &path, &Value::Object(body))
            .await?;
        if status != StatusCode::CREATED {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to create VLAN interface {name}"),
            ));
        }

        let collection = client.ip6_path(&name, None);
        for address in &self.ipv6 {
            let (status, _) = client
                .send_json(Method::POST, &collection, &ip6_address_body(address))
                .await?;
            if status != StatusCode::CREATED {
                self.state = ResourceState::Unknown;
                let mut detail =
                    format!("failed to add IPv6 address {address} to {name}");
                detail.push_str(&self.rollback_create(client).await);
                return Err(Error::Remote {
                    status: status_text(status),
                    detail,
                });
            }
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Update the SVI.
    ///
    /// IPv6 sub-resources follow the same set-difference reconciliation as
    /// L3 interfaces, scoped to the `vlan{id}` resource path. The row is
    /// then patched (204), or merged over the current writable attributes
    /// and replaced with a PUT (200) when `use_put` is set.
    pub async fn update(&mut self, client: &SwitchClient, use_put: bool) -> Result<(), Error> {
        self.check_identity()?;
        let name = self.interface_name();

        let mut attrs = if use_put {
            let mut current = Self::new(Vlan::by_id(self.vlan.vlan_id));
            current.get(client).await.map_err(|err| {
                Error::reconciliation(format!(
                    "VLAN interface {name} is missing, cannot merge for full replace: {err}"
                ))
            })?;
            current.details
        } else {
            Attributes::new()
        };

        let mut desired = self.routed_attributes(client)?;
        desired.insert("routing".into(), Value::Bool(true));
        desired.insert("vlan_mode".into(), Value::Null);
        desired.insert("vlan_tag".into(), Value::Null);
        if self.ipv6.is_empty() {
            desired.insert("ip6_addresses".into(), Value::Null);
        }

        reconcile_ip6(client, &name, &self.ipv6).await?;
        attrs.extend(desired);

        let method = if use_put { Method::PUT } else { Method::PATCH };
        let expected = if use_put {
            StatusCode::OK
        } else {
            StatusCode::NO_CONTENT
        };

        debug!(name = %name, ?method, "updating VLAN interface");
        let path = client.interface_path(&name);
        let (status, _) = client
            .send_json(method, &path, &Value::Object(attrs))
            .await?;
        if status != expected {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to update VLAN interface {name}"),
            ));
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Remove the SVI. Unlike physical ports this is a real DELETE;
    /// success = 204 (200 tolerated).
    pub async fn delete(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        let name = self.interface_name();

        debug!(name = %name, "deleting VLAN interface");
        let path = client.interface_path(&name);
        let (status, _) = client.send_empty(Method::DELETE, &path).await?;

        if status != StatusCode::NO_CONTENT && status != StatusCode::OK {
            return Err(Error::remote(
                status,
                format!("failed to delete VLAN interface {name}"),
            ));
        }

        self.state = ResourceState::Absent;
        Ok(())
    }

    /// Fetch the writable attributes plus the IPv6 sub-resources.
    ///
    /// A body with at most one field means the row is a bare placeholder;
    /// the SVI is then reported as absent.
    pub async fn get(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        let name = self.interface_name();

        let path = format!("{}?selector=writable", client.interface_path(&name));
        let (status, body) = client.get(&path).await?;

        if status != StatusCode::OK {
            self.state = if status == StatusCode::NOT_FOUND {
                ResourceState::Absent
            } else {
                ResourceState::Unknown
            };
            return Err(Error::remote(
                status,
                format!("failed to fetch VLAN interface {name}"),
            ));
        }

        let attrs = decode_object(&body)?;
        if attrs.len() <= 1 {
            self.state = ResourceState::Absent;
            return Err(Error::remote(
                status,
                format!("VLAN interface {name} is not materialized on the switch"),
            ));
        }

        self.state = ResourceState::Unknown;
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
                    self.description = Some(description.clone());
                    self.vlan.description = Some(description.clone());
                }
                ("admin", Value::String(admin)) => {
                    self.vlan.admin_state = admin.parse().ok();
                }
                ("vrf", Value::Object(_)) => {
                    if let Some(vrf) = reference_key(&value) {
                        self.vrf = Some(vrf.to_owned());
                    }
                }
                _ => {}
            }
            self.details.insert(key, value);
        }

        self.ipv6 = fetch_ip6(client, &name).await?;

        self.state = ResourceState::Present;
        Ok(())
    }
}
