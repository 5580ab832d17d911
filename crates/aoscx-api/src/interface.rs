// Base interface resource: CRUD against `/system/interfaces/{name}`.
//
// Physical ports always exist on the device; "delete" therefore resets the
// configuration to an empty state instead of removing the row.

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{SwitchClient, decode_object};
use crate::error::Error;
use crate::types::{AdminState, Attributes, ResourceState};
use crate::validate;

/// Desired state of a physical or logical port.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub name: String,
    pub description: Option<String>,
    pub admin_state: AdminState,
    /// Last-fetched raw attributes; every returned field is merged here.
    pub details: Attributes,
    state: ResourceState,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_admin_state(mut self, admin_state: AdminState) -> Self {
        self.admin_state = admin_state;
        self
    }

    /// Presence of the remote resource, as last observed.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Validate the identity fields before any request.
    pub fn check_values(&self) -> Result<(), Error> {
        validate::interface_name(&self.name)
    }

    /// Description, admin, and the `user_config` admin mirror the device
    /// expects on every interface write.
    pub(crate) fn base_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(
            "description".into(),
            json!(self.description.clone().unwrap_or_default()),
        );
        attrs.insert("admin".into(), json!(self.admin_state));
        attrs.insert(
            "user_config".into(),
            json!({ "admin": self.admin_state }),
        );
        attrs
    }

    /// Create the interface row. `POST /system/interfaces`, success = 201.
    pub async fn create(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_values()?;

        let mut body = self.base_attributes();
        body.insert("name".into(), json!(self.name));

        debug!(name = %self.name, "creating interface");
        let path = client.rest_path("system/interfaces");
        let (status, _) = client
            .send_json(Method::POST, &path, &Value::Object(body))
            .await?;

        if status != StatusCode::CREATED {
            self.state = ResourceState::Unknown;
            return Err(Error::remote(
                status,
                format!("failed to create interface {}", self.name),
            ));
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Partially update description/admin. PATCH, success = 204.
    pub async fn update(&mut self, client: &SwitchClient) -> Result<(), Error> {
        self.check_values()?;

        let body = Value::Object(self.base_attributes());
        debug!(name = %self.name, "updating interface");
        let path = client.interface_path(&self.name);
        let (status, _) = client.send_json(Method::PATCH, &path, &body).await?;

        if status != StatusCode::NO_CONTENT {
            return Err(Error::remote(
                status,
                format!("failed to update interface {}", self.name),
            ));
        }
        Ok(())
    }

    /// Reset the interface to an empty configuration.
    ///
    /// Ports cannot be removed from the device, so this is a PUT of an
    /// empty body; success = 200 or 204. The row still exists afterwards.
    pub async fn delete(&mut self, client: &SwitchClient) -> Result<(), Error> {
        debug!(name = %self.name, "resetting interface configuration");
        let path = client.interface_path(&self.name);
        let (status, _) = client.send_json(Method::PUT, &path, &json!({})).await?;

        if status != StatusCode::NO_CONTENT && status != StatusCode::OK {
            return Err(Error::remote(
                status,
                format!("failed to reset interface {}", self.name),
            ));
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Fetch the interface; merges every attribute into `details` and
    /// surfaces description/admin as typed fields.
    pub async fn get(&mut self, client: &SwitchClient) -> Result<(), Error> {
        let path = client.interface_path(&self.name);
        let (status, body) = client.get(&path).await?;

        if status != StatusCode::OK {
            self.state = if status == StatusCode::NOT_FOUND {
                ResourceState::Absent
            } else {
                ResourceState::Unknown
            };
            return Err(Error::remote(
                status,
                format!("failed to fetch interface {}", self.name),
            ));
        }

        self.state = ResourceState::Unknown;
        let attrs = decode_object(&body)?;
        for (key, value) in attrs {
            match (key.as_str(), &value) {
                ("description", Value::String(description)) => {
                    self.description = Some(description.clone());
                }
                ("admin", Value::String(admin)) => {
                    if let Ok(admin) = admin.parse() {
                        self.admin_state = admin;
                    }
                }
                _ => {}
            }
            self.details.insert(key, value);
        }

        self.state = ResourceState::Present;
        Ok(())
    }

    /// Make sure the interface row exists before L2/L3 attributes are
    /// patched onto it, creating it in the requested admin state when the
    /// existence probe reports 404. Other probe failures propagate.
    pub(crate) async fn ensure_exists(
        client: &SwitchClient,
        name: &str,
        admin_state: AdminState,
    ) -> Result<(), Error> {
        let mut probe = Self::new(name);
        match probe.get(client).await {
            Ok(()) => Ok(()),
            Err(_) if probe.state == ResourceState::Absent => {
                debug!(name, "interface absent, auto-creating");
                let mut interface = Self::new(name).with_admin_state(admin_state);
                interface.create(client).await
            }
            Err(err) => Err(err),
        }
    }
}
