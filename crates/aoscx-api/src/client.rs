// Session client for the AOS-CX REST API.
//
// Wraps `reqwest::Client` with cookie-based session auth, CSRF token
// handling, versioned path construction, and raw request helpers. Resource
// modules (vlan, interface, ...) interpret status codes themselves; this
// module only moves bytes and attaches the authentication material.

use std::sync::RwLock;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ApiVersion, Attributes};

/// Authenticated session against a single switch.
///
/// Holds the base URL, REST API version, session cookie (in the underlying
/// client's jar) and the anti-forgery token captured at login. All request
/// helpers return `(status, raw body)` so each resource can apply its own
/// per-verb success contract.
#[derive(Debug)]
pub struct SwitchClient {
    http: reqwest::Client,
    base_url: Url,
    version: ApiVersion,
    /// Anti-forgery token, captured from the login response when the
    /// firmware sends one. Attached to every mutating request.
    csrf_token: RwLock<Option<String>>,
}

impl SwitchClient {
    /// Authenticate against the switch and return a ready session.
    ///
    /// `POST /rest/{version}/login?username=..&password=..`; the session
    /// cookie lands in the transport's cookie jar (one is created if the
    /// config doesn't carry one).
    pub async fn connect(
        base_url: Url,
        username: &str,
        password: &SecretString,
        version: ApiVersion,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        let client = Self {
            http,
            base_url,
            version,
            csrf_token: RwLock::new(None),
        };
        client.login(username, password).await?;
        Ok(client)
    }

    /// Create a session from a pre-built `reqwest::Client`, skipping login.
    ///
    /// Used in tests and by callers that manage authentication themselves.
    pub fn from_reqwest(
        base_url: &str,
        version: ApiVersion,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            version,
            csrf_token: RwLock::new(None),
        })
    }

    /// The switch base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The negotiated REST API version.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    // ── Authentication ───────────────────────────────────────────────

    async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.url_for(&self.rest_path("login"))?;
        debug!("logging in at {}", url.path());

        let resp = self
            .http
            .post(url)
            .query(&[("username", username), ("password", password.expose_secret())])
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        if let Some(token) = resp
            .headers()
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
        {
            *self
                .csrf_token
                .write()
                .expect("CSRF lock poisoned") = Some(token.to_owned());
        }

        debug!("login successful");
        Ok(())
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<(), Error> {
        let (status, _) = self
            .send_empty(Method::POST, &self.rest_path("logout"))
            .await?;
        if status != StatusCode::OK {
            return Err(Error::remote(status, "logout rejected"));
        }
        Ok(())
    }

    // ── Path builders ────────────────────────────────────────────────

    /// Versioned REST path: `/rest/{version}/{suffix}`.
    pub(crate) fn rest_path(&self, suffix: &str) -> String {
        format!("/rest/{}/{suffix}", self.version.as_str())
    }

    /// Resource path of a VLAN, used as its cross-reference URI.
    pub(crate) fn vlan_uri(&self, vlan_id: u16) -> String {
        self.rest_path(&format!("system/vlans/{vlan_id}"))
    }

    /// Resource path of a VRF, used as its cross-reference URI.
    pub(crate) fn vrf_uri(&self, name: &str) -> String {
        self.rest_path(&format!("system/vrfs/{name}"))
    }

    /// Resource path of an interface. Names like `1/1/1` contain slashes
    /// and must travel as a single escaped segment.
    pub(crate) fn interface_path(&self, name: &str) -> String {
        self.rest_path(&format!("system/interfaces/{}", urlencoding::encode(name)))
    }

    /// Path of an interface's IPv6 address collection, or of one address
    /// sub-resource when `address` is given.
    pub(crate) fn ip6_path(&self, interface: &str, address: Option<&str>) -> String {
        let collection = format!(
            "system/interfaces/{}/ip6_addresses",
            urlencoding::encode(interface)
        );
        match address {
            Some(addr) => self.rest_path(&format!("{collection}/{}", urlencoding::encode(addr))),
            None => self.rest_path(&collection),
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<reqwest::Body>,
        content_type: Option<&str>,
    ) -> Result<(StatusCode, String), Error> {
        let url = self.url_for(path)?;
        debug!("{} {}", method, url.path());

        let mut req = self.http.request(method.clone(), url).header(ACCEPT, "*/*");

        if method != Method::GET {
            let token = self
                .csrf_token
                .read()
                .expect("CSRF lock poisoned")
                .clone();
            if let Some(token) = token {
                req = req.header("x-csrf-token", token);
            }
        }
        if let Some(ct) = content_type {
            req = req.header(CONTENT_TYPE, ct);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;
        Ok((status, text))
    }

    /// GET, returning the status and raw body.
    pub(crate) async fn get(&self, path: &str) -> Result<(StatusCode, String), Error> {
        self.send(Method::GET, path, None, None).await
    }

    /// GET with a plain-text accept header (running-config downloads).
    pub(crate) async fn get_text(&self, path: &str) -> Result<(StatusCode, String), Error> {
        let url = self.url_for(path)?;
        debug!("GET {} (text)", url.path());

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .map_err(Error::Transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(Error::Transport)?;
        Ok((status, text))
    }

    /// Send a JSON body with the given verb.
    pub(crate) async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<(StatusCode, String), Error> {
        let encoded = serde_json::to_vec(body).map_err(|e| Error::Decode {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?;
        self.send(method, path, Some(encoded.into()), Some("application/json"))
            .await
    }

    /// Send a bodyless request (DELETE, logout POST).
    pub(crate) async fn send_empty(
        &self,
        method: Method,
        path: &str,
    ) -> Result<(StatusCode, String), Error> {
        self.send(method, path, None, None).await
    }

    /// POST a raw text payload (full-configuration uploads).
    pub(crate) async fn post_text(
        &self,
        path: &str,
        body: String,
    ) -> Result<(StatusCode, String), Error> {
        self.send(Method::POST, path, Some(body.into()), Some("text/plain"))
            .await
    }
}

/// Decode a response body into the open attribute map, failing with
/// `Error::Decode` (and keeping the raw body) on malformed JSON.
pub(crate) fn decode_object(body: &str) -> Result<Attributes, Error> {
    serde_json::from_str::<Attributes>(body).map_err(|e| Error::Decode {
        message: e.to_string(),
        body: body.to_owned(),
    })
}
