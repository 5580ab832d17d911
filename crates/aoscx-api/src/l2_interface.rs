// Layer-2 switching view of an interface.
//
// Not a separate remote resource: reconciliation resolves the referenced
// VLANs, then patches the switching attributes onto the interface row.
// Access mode may provision its single VLAN; trunk modes must never
// provision membership VLANs (see `AutoCreate`).

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{SwitchClient, decode_object};
use crate::error::Error;
use crate::interface::Interface;
use crate::types::{Attributes, ResourceState, VlanMode, reference, reference_key};
use crate::vlan::{AutoCreate, Vlan};

/// A trunk member VLAN that failed to resolve and was left out of the
/// committed membership set.
#[derive(Debug, Clone)]
pub struct TrunkSkip {
    pub vlan_id: u16,
    pub reason: String,
}

/// Desired switching configuration for one interface.
#[derive(Debug, Clone, Default)]
pub struct L2Interface {
    pub interface: Interface,
    pub vlan_mode: VlanMode,
    /// Access VLAN in access mode, native VLAN in trunk modes.
    /// Defaults to 1; a native VLAN of 1 is sent as absent.
    pub vlan_tag: Option<u16>,
    /// Explicit trunk membership; mutually exclusive with
    /// `trunk_allowed_all`.
    pub vlan_ids: Vec<u16>,
    /// Trunk carries all VLANs (emitted as an empty membership map).
    pub trunk_allowed_all: bool,
    /// Tag the native VLAN (`native-tagged` vs `native-untagged`).
    pub native_tagged: bool,
    state: ResourceState,
    trunk_warnings: Vec<TrunkSkip>,
}

impl L2Interface {
    pub fn new(interface: Interface) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }

    /// Presence of the switching configuration, as last observed.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Trunk member VLANs skipped during the last create/update because
    /// they did not resolve. Empty after access-mode reconciliation.
    pub fn trunk_warnings(&self) -> &[TrunkSkip] {
        &self.trunk_warnings
    }

    fn check_identity(&self) -> Result<(), Error> {
        if self.interface.name.is_empty() {
            return Err(Error::validation(
                "interface name is required to configure an L2 interface",
            ));
        }
        self.interface.check_values()
    }

    /// Resolve referenced VLANs and build the switching attribute map.
    ///
    /// Returns the map plus the VLAN auto-created on this call, if any,
    /// so a failed commit can undo it.
    async fn switching_attributes(
        &mut self,
        client: &SwitchClient,
    ) -> Result<(Attributes, Option<Vlan>), Error> {
        let mut attrs = self.interface.base_attributes();
        attrs.insert("routing".into(), Value::Bool(false));
        self.trunk_warnings.clear();

        let mut auto_created = None;

        if self.vlan_mode == VlanMode::Access {
            let tag = self.vlan_tag.unwrap_or(1);
            self.vlan_tag = Some(tag);

            let (vlan, created) = Vlan::resolve(client, tag, AutoCreate::Allowed).await?;
            if created {
                auto_created = Some(vlan.clone());
            }
            let uri = vlan.uri().map_or_else(|| client.vlan_uri(tag), str::to_owned);
            attrs.insert("vlan_tag".into(), reference(tag, uri));
            attrs.insert("vlan_mode".into(), Value::String("access".into()));
        } else {
            // Normalize the trunk family down to what the device stores.
            self.vlan_mode = if self.native_tagged {
                VlanMode::NativeTagged
            } else {
                VlanMode::NativeUntagged
            };

            match self.vlan_tag {
                None | Some(1) => {
                    // VLAN 1 is the implicit native VLAN; send no reference.
                    attrs.insert("vlan_tag".into(), Value::Null);
                }
                Some(tag) => {
                    let (vlan, _) = Vlan::resolve(client, tag, AutoCreate::Denied).await?;
                    let uri = vlan.uri().map_or_else(|| client.vlan_uri(tag), str::to_owned);
                    attrs.insert("vlan_tag".into(), reference(tag, uri));
                }
            }

            let mut trunks = Attributes::new();
            if !self.trunk_allowed_all {
                for &member in &self.vlan_ids {
                    match Vlan::resolve(client, member, AutoCreate::Denied).await {
                        Ok((vlan, _)) => {
                            let uri = vlan
                                .uri()
                                .map_or_else(|| client.vlan_uri(member), str::to_owned);
                            trunks.insert(member.to_string(), Value::String(uri));
                        }
                        Err(err) => {
                            warn!(vlan_id = member, %err, "skipping unresolved trunk member");
                            self.trunk_warnings.push(TrunkSkip {
                                vlan_id: member,
                                reason: err.to_string(),
                            });
                        }
                    }
                }
            }
            // An empty membership map means "all VLANs allowed".
            attrs.insert("vlan_trunks".into(), Value::Object(trunks));
            attrs.insert("vlan_mode".into(), Value::String(self.vlan_mode.as_str().into()));
        }

        Ok((attrs, auto_created))
    }

    /// Send the switching attributes and interpret the outcome. When the
    /// commit fails after a VLAN was auto-created in the same call, the
    /// VLAN is removed again on a best-effort basis and the undo outcome
    /// is reported alongside the original failure.
    async fn commit(
        &mut self,
        client: &SwitchClient,
        attrs: Attributes,
        auto_created: Option<Vlan>,
        method: Method,
    ) -> Result<(), Error> {
        let expected = if method == Method::PUT {
            StatusCode::OK
        } else {
            StatusCode::NO_CONTENT
        };

        let path = client.interface_path(&self.interface.name);
        let (status, _) = client
            .send_json(method, &path, &Value::Object(attrs))
            .await?;

        if status != expected {
            self.state = ResourceState::Unknown;
            let mut detail = format!(
                "failed to configure switching on interface {}",
                self.interface.name
            );
            if let Some(mut vlan) = auto_created {
                match vlan.delete(client).await {
                    Ok(()) => {
                        detail.push_str(&format!("; rolled back auto-created VLAN {}", vlan.vlan_id));
                    }
                    Err(undo) => {
                        detail.push_str(&format!(
                            "; rollback of auto-created VLAN {} also failed: {undo}",
                            vlan.vlan_id
                        ));
                    }
                }
            }
            return Err(Error::Remote {
                status: crate::error::status_text(status),
                detail,
            });
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Apply the switching configuration.
    ///
    /// Ensures the interface row exists (creating it in the requested
    /// admin state if missing), resolves the referenced VLANs, then
    /// patches `vlan_mode`/`vlan_tag`/`vlan_trunks` with `routing: false`.
    pub async fn create(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        Interface::ensure_exists(client, &self.interface.name, self.interface.admin_state)
            .await?;

        let (attrs, auto_created) = self.switching_attributes(client).await?;
        debug!(name = %self.interface.name, mode = %self.vlan_mode, "configuring L2 interface");
        self.commit(client, attrs, auto_created, Method::PATCH).await
    }

    /// Update the switching configuration.
    ///
    /// With `use_put` the current writable attribute set is fetched first
    /// and the desired changes are merged over it before a full replace
    /// (PUT, success = 200) — use this to clear fields a PATCH would leave
    /// untouched. Otherwise a partial PATCH (success = 204) is sent.
    pub async fn update(&mut self, client: &SwitchClient, use_put: bool) -> Result<(), Error> {
        self.check_identity()?;

        let mut attrs = if use_put {
            let mut current = Self::new(Interface::new(&self.interface.name));
            current.get(client).await?;
            current.interface.details
        } else {
            Attributes::new()
        };

        let (desired, auto_created) = self.switching_attributes(client).await?;
        attrs.extend(desired);

        let method = if use_put { Method::PUT } else { Method::PATCH };
        debug!(name = %self.interface.name, ?method, "updating L2 interface");
        self.commit(client, attrs, auto_created, method).await
    }

    /// Reset the interface to an empty configuration (PUT `{}`).
    pub async fn delete(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_identity()?;
        let mut base = Interface::new(&self.interface.name);
        base.delete(client).await?;
        self.state = ResourceState::Absent;
        Ok(())
    }

    /// Fetch the writable switching attributes.
    ///
    /// Decodes the `vlan_tag` reference map into the scalar tag and the
    /// `vlan_trunks` map into the membership list; an empty membership map
    /// means the trunk allows all VLANs.
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
                format!("failed to fetch L2 interface {}", self.interface.name),
            ));
        }

        self.state = ResourceState::Unknown;
        let attrs = decode_object(&body)?;
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
                ("vlan_mode", Value::String(mode)) => {
                    if let Ok(mode) = mode.parse::<VlanMode>() {
                        self.vlan_mode = mode;
                        self.native_tagged = mode == VlanMode::NativeTagged;
                    }
                }
                ("vlan_tag", Value::Object(_)) => {
                    if let Some(tag) = reference_key(&value).and_then(|k| k.parse().ok()) {
                        self.vlan_tag = Some(tag);
                    }
                }
                ("vlan_trunks", Value::Object(trunks)) => {
                    if trunks.is_empty() {
                        self.trunk_allowed_all = true;
                        self.vlan_ids = Vec::new();
                    } else {
                        let mut ids: Vec<u16> =
                            trunks.keys().filter_map(|k| k.parse().ok()).collect();
                        ids.sort_unstable();
                        self.trunk_allowed_all = false;
                        self.vlan_ids = ids;
                    }
                }
                _ => {}
            }
            self.interface.details.insert(key, value);
        }

        self.state = ResourceState::Present;
        Ok(())
    }
}
