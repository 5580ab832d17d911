// VLAN resource: CRUD against `/system/vlans/{id}` plus the shared
// resolution routine the interface modules use before binding a VLAN by
// reference.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{SwitchClient, decode_object};
use crate::error::Error;
use crate::types::{AdminState, Attributes, ResourceState};
use crate::validate;

/// Whether a resolution routine may provision a missing VLAN.
///
/// Access-mode binding is allowed to auto-create its single VLAN; trunk
/// and native-VLAN resolution must never provision membership VLANs
/// silently. The asymmetry is deliberate policy, so it travels as an
/// explicit parameter rather than being baked into call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoCreate {
    Allowed,
    Denied,
}

/// Desired state of a VLAN.
#[derive(Debug, Clone, Default)]
pub struct Vlan {
    pub vlan_id: u16,
    pub name: String,
    pub description: Option<String>,
    pub admin_state: Option<AdminState>,
    /// Last-fetched raw attributes.
    pub details: Attributes,
    state: ResourceState,
    uri: Option<String>,
}

impl Vlan {
    pub fn new(vlan_id: u16, name: impl Into<String>) -> Self {
        Self {
            vlan_id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Desired state referencing an existing VLAN by id only.
    pub fn by_id(vlan_id: u16) -> Self {
        Self {
            vlan_id,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_admin_state(mut self, admin_state: AdminState) -> Self {
        self.admin_state = Some(admin_state);
        self
    }

    /// Presence of the remote resource, as last observed.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// The resource path other objects use to reference this VLAN.
    /// Cached by `create` and `get`.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn check_values(&self) -> Result<(), Error> {
        validate::vlan_id(self.vlan_id)?;
        if self.name.is_empty() {
            return Err(Error::validation(
                "VLAN name is required to create or update a VLAN",
            ));
        }
        Ok(())
    }

    /// Create the VLAN. `POST /system/vlans`, success = 201.
    pub async fn create(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_values()?;

        let mut body = Attributes::new();
        body.insert("id".into(), json!(self.vlan_id));
        body.insert("name".into(), json!(self.name));
        body.insert("type".into(), json!("static"));
        if let Some(ref description) = self.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(admin) = self.admin_state {
            body.insert("admin".into(), json!(admin));
        }

        debug!(vlan_id = self.vlan_id, "creating VLAN");
        let path = client.rest_path("system/vlans");
        let (status, _) = client
            .send_json(Method::POST, &path, &Value::Object(body))
            .await?;

        if status != StatusCode::CREATED {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to create VLAN {}", self.vlan_id),
            ));
        }

        self.uri = Some(client.vlan_uri(self.vlan_id));
        self.state = ResourceState::Present;
        Ok(())
    }

    /// Partially update the VLAN. `PATCH /system/vlans/{id}`, success = 204.
    pub async fn update(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_values()?;

        let body = json!({
            "name": self.name,
            "description": self.description.clone().unwrap_or_default(),
            "admin": self.admin_state.unwrap_or_default(),
            "type": "static",
        });

        debug!(vlan_id = self.vlan_id, "updating VLAN");
        let path = client.rest_path(&format!("system/vlans/{}", self.vlan_id));
        let (status, _) = client.send_json(Method::PATCH, &path, &body).await?;

        if status != StatusCode::NO_CONTENT {
            return Err(Error::remote(
                status,
                format!("failed to update VLAN {}", self.vlan_id),
            ));
        }
        Ok(())
    }

    /// Remove the VLAN. `DELETE /system/vlans/{id}`, success = 204.
    pub async fn delete(&mut self, client: &SwitchClient) -> Result<(), Error> {
        debug!(vlan_id = self.vlan_id, "deleting VLAN");
        let path = client.rest_path(&format!("system/vlans/{}", self.vlan_id));
        let (status, _) = client.send_empty(Method::DELETE, &path).await?;

        if status != StatusCode::NO_CONTENT {
            return Err(Error::remote(
                status,
                format!("failed to delete VLAN {}", self.vlan_id),
            ));
        }

        self.state = ResourceState::Absent;
        Ok(())
    }

    /// Fetch the VLAN. Populates name/description/admin and the raw
    /// attribute map; any failure resets the presence state.
    pub async fn get(&mut self, client: &SwitchClient) -> Result<(), Error> {
        let path = client.rest_path(&format!("system/vlans/{}", self.vlan_id));
        let (status, body) = client.get(&path).await?;

        if status != StatusCode::OK {
            self.state = if status == StatusCode::NOT_FOUND {
                ResourceState::Absent
            } else {
                ResourceState::Unknown
            };
            return Err(Error::remote(
                status,
                format!("failed to fetch VLAN {}", self.vlan_id),
            ));
        }

        self.state = ResourceState::Unknown;
        let attrs = decode_object(&body)?;
        for (key, value) in attrs {
            match (key.as_str(), &value) {
                ("name", Value::String(name)) => self.name = name.clone(),
                ("description", Value::String(description)) => {
                    self.description = Some(description.clone());
                }
                ("admin", Value::String(admin)) => {
                    self.admin_state = admin.parse().ok();
                }
                _ => {}
            }
            self.details.insert(key, value);
        }

        self.uri = Some(client.vlan_uri(self.vlan_id));
        self.state = ResourceState::Present;
        Ok(())
    }

    /// Resolve a VLAN that another resource wants to reference by URI.
    ///
    /// Fetches the VLAN; if it is absent and `auto_create` allows it, the
    /// VLAN is provisioned with the device-default name `VLAN{id}`.
    /// Returns the resolved VLAN and whether it was created by this call.
    /// An absent VLAN under `AutoCreate::Denied` is a reconciliation
    /// error; other fetch failures propagate unchanged.
    pub(crate) async fn resolve(
        client: &SwitchClient,
        vlan_id: u16,
        auto_create: AutoCreate,
    ) -> Result<(Self, bool), Error> {
        let mut vlan = Self::by_id(vlan_id);
        match vlan.get(client).await {
            Ok(()) => Ok((vlan, false)),
            Err(err) if vlan.state == ResourceState::Absent => match auto_create {
                AutoCreate::Allowed => {
                    debug!(vlan_id, "VLAN absent, auto-creating");
                    vlan.name = format!("VLAN{vlan_id}");
                    vlan.create(client).await.map_err(|create_err| {
                        Error::reconciliation(format!(
                            "VLAN {vlan_id} was absent and auto-create failed: {create_err}"
                        ))
                    })?;
                    Ok((vlan, true))
                }
                AutoCreate::Denied => Err(Error::reconciliation(format!(
                    "VLAN {vlan_id} does not exist on the switch: {err}"
                ))),
            },
            Err(err) => Err(err),
        }
    }
}
