// Read-only chassis subsystem accessor.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::client::SwitchClient;
use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub base_mac_address: String,
    #[serde(default)]
    pub device_version: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub vendor: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RebootStatistics {
    #[serde(default)]
    pub configuration: u32,
    #[serde(default)]
    pub error: u32,
    #[serde(default)]
    pub hotswap: u32,
    #[serde(default)]
    pub thermal: u32,
    #[serde(default)]
    pub user: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Selftest {
    #[serde(default)]
    pub status: String,
}

/// Chassis subsystem state as reported on v10.09 firmware. Unknown fields
/// are ignored; the schema varies between platforms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chassis {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub admin_state: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub thermal_state: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub product_info: ProductInfo,
    #[serde(default)]
    pub reboot_statistics: RebootStatistics,
    #[serde(default)]
    pub selftest: Selftest,
}

impl SwitchClient {
    /// Fetch chassis information by subsystem id (the first chassis is 1).
    ///
    /// `GET /system/subsystems/chassis,{id}`
    pub async fn chassis(&self, id: u32) -> Result<Chassis, Error> {
        let path = self.rest_path(&format!("system/subsystems/chassis,{id}"));
        let (status, body) = self.get(&path).await?;
        if status != StatusCode::OK {
            return Err(Error::remote(status, format!("failed to fetch chassis {id}")));
        }
        serde_json::from_str(&body).map_err(|e| Error::Decode {
            message: e.to_string(),
            body,
        })
    }
}
