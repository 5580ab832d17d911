// Layer-3 routing and IPv6 reconciliation tests against a wiremock switch.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aoscx_api::{ApiVersion, Error, Interface, L3Interface, ResourceState, SwitchClient};

async fn setup() -> (MockServer, SwitchClient) {
    let server = MockServer::start().await;
    let client =
        SwitchClient::from_reqwest(&server.uri(), ApiVersion::V10_09, reqwest::Client::new())
            .unwrap();
    (server, client)
}

fn interface_exists(name_path: &'static str) -> Mock {
    Mock::given(method("GET"))
        .and(path(name_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "admin": "up" })))
}

#[tokio::test]
async fn create_patches_routed_attributes_and_posts_ipv6() {
    let (server, client) = setup().await;

    interface_exists("/rest/v10.09/system/interfaces/1%2F1%2F1")
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .and(body_partial_json(json!({
            "routing": true,
            "vlan_mode": null,
            "vlan_tag": null,
            "vrf": "/rest/v10.09/system/vrfs/default",
            "ip4_address": "10.0.0.1/24",
            "ip4_address_secondary": null,
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .and(body_partial_json(json!({
            "address": "2001:db8::1/64",
            "type": "global-unicast",
            "preferred_lifetime": 604_800,
            "valid_lifetime": 2_592_000,
            "node_address": true,
            "ra_prefix": true,
            "ra_route": false,
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.ipv4 = vec!["10.0.0.1/24".into()];
    l3.ipv6 = vec!["2001:db8::1/64".into()];
    l3.create(&client).await.unwrap();
    assert_eq!(l3.state(), ResourceState::Present);
}

#[tokio::test]
async fn create_routes_through_named_vrf() {
    let (server, client) = setup().await;

    interface_exists("/rest/v10.09/system/interfaces/1%2F1%2F1")
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .and(body_partial_json(json!({ "vrf": "/rest/v10.09/system/vrfs/mgmt" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.vrf = Some("mgmt".into());
    l3.create(&client).await.unwrap();
}

#[tokio::test]
async fn create_rejects_bad_ipv4_before_patching() {
    let (server, client) = setup().await;

    interface_exists("/rest/v10.09/system/interfaces/1%2F1%2F1")
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.ipv4 = vec!["not-an-ip".into()];
    let err = l3.create(&client).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
}

#[tokio::test]
async fn create_aggregates_ipv6_failures() {
    let (server, client) = setup().await;

    interface_exists("/rest/v10.09/system/interfaces/1%2F1%2F1")
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .respond_with(ResponseTemplate::new(400))
        .expect(2)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.ipv6 = vec!["2001:db8::1/64".into(), "2001:db8::2/64".into()];
    let err = l3.create(&client).await.unwrap_err();

    match err {
        Error::Remote { detail, .. } => {
            assert!(detail.contains("2001:db8::1/64"), "{detail}");
            assert!(detail.contains("2001:db8::2/64"), "{detail}");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn update_reconciles_ipv6_as_a_set_difference() {
    let (server, client) = setup().await;

    // Device currently holds {A, B}; desired is {B, C}. Exactly one
    // delete (A) and one create (C) must be issued; B is untouched.
    Mock::given(method("GET"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2001:db8::a/64": "/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses/a",
            "2001:db8::b/64": "/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses/b",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(
            "/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses/2001%3Adb8%3A%3Aa%2F64",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .and(body_partial_json(json!({ "address": "2001:db8::c/64" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.ipv6 = vec!["2001:db8::b/64".into(), "2001:db8::c/64".into()];
    l3.update(&client, false).await.unwrap();
    assert_eq!(l3.state(), ResourceState::Present);
}

#[tokio::test]
async fn update_with_put_merges_over_current_attributes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .and(query_param("selector", "writable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "admin": "up",
            "mtu": 9000,
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The current IPv6 listing is fetched twice: once by the merge get,
    // once by reconciliation.
    Mock::given(method("GET"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    // Untouched fields from the merge survive the full replace.
    Mock::given(method("PUT"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .and(body_partial_json(json!({ "mtu": 9000, "routing": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.update(&client, true).await.unwrap();
}

#[tokio::test]
async fn get_populates_addresses_and_vrf() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1"))
        .and(query_param("selector", "writable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "admin": "up",
            "ip4_address": "10.0.0.1/24",
            "ip4_address_secondary": ["10.0.1.1/24"],
            "vrf": { "mgmt": "/rest/v10.09/system/vrfs/mgmt" },
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2001:db8::1/64": "/rest/v10.09/system/interfaces/1%2F1%2F1/ip6_addresses/x",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut l3 = L3Interface::new(Interface::new("1/1/1"));
    l3.get(&client).await.unwrap();

    assert_eq!(l3.ipv4, vec!["10.0.0.1/24", "10.0.1.1/24"]);
    assert_eq!(l3.ipv6, vec!["2001:db8::1/64"]);
    assert_eq!(l3.vrf.as_deref(), Some("mgmt"));
    assert_eq!(l3.state(), ResourceState::Present);
}
