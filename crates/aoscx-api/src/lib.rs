// aoscx-api: Async Rust client for the Aruba AOS-CX switch REST API.
//
// Maps desired-state objects (VLAN, interface, L2/L3 views, SVI, full
// configuration) onto the versioned REST surface, reconciling dependent
// resources so each operation converges the device safely.

pub mod chassis;
pub mod client;
pub mod error;
pub mod full_config;
pub mod interface;
pub mod l2_interface;
pub mod l3_interface;
pub mod transport;
pub mod types;
pub mod validate;
pub mod vlan;
pub mod vlan_interface;

pub use chassis::Chassis;
pub use client::SwitchClient;
pub use error::Error;
pub use full_config::{ConfigLineError, DryRunOutcome, DryRunState, FullConfig};
pub use interface::Interface;
pub use l2_interface::{L2Interface, TrunkSkip};
pub use l3_interface::L3Interface;
pub use transport::{TlsMode, TransportConfig};
pub use types::{AdminState, ApiVersion, Attributes, ResourceState, VlanMode};
pub use vlan::{AutoCreate, Vlan};
pub use vlan_interface::VlanInterface;
