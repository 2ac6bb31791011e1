//! Cross-tenant isolation tests: no operation may observe or mutate rows
//! belonging to a different organization than the caller's.

mod common;

use common::{OTHER_ORG_ID, TEST_ORG_ID, TestApp};
use reqwest::Method;
use serde_json::{Value, json};

async fn create_in_org(app: &TestApp, org_id: &str, body: Value) -> Value {
    let response = app
        .request_as(Method::POST, org_id, "/quotations")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let envelope: Value = response.json().await.unwrap();
    envelope["data"].clone()
}

#[tokio::test]
async fn same_number_suffix_is_allowed_across_organizations() {
    let app = TestApp::spawn().await;

    let a = create_in_org(
        &app,
        TEST_ORG_ID,
        json!({ "subject": "Org A", "quotation_number": "QT-2026-00042" }),
    )
    .await;
    let b = create_in_org(
        &app,
        OTHER_ORG_ID,
        json!({ "subject": "Org B", "quotation_number": "QT-2026-00042" }),
    )
    .await;

    assert_eq!(a["quotation_number"], b["quotation_number"]);
    assert_ne!(a["organization_id"], b["organization_id"]);

    app.cleanup().await;
}

#[tokio::test]
async fn lookups_never_cross_the_organization_boundary() {
    let app = TestApp::spawn().await;

    let a = create_in_org(&app, TEST_ORG_ID, json!({ "subject": "Private" })).await;
    let id = a["quotation_id"].as_str().unwrap();

    // Direct get from the other organization
    let response = app
        .request_as(Method::GET, OTHER_ORG_ID, &format!("/quotations/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Listing from the other organization
    let response = app
        .request_as(Method::GET, OTHER_ORG_ID, "/quotations")
        .send()
        .await
        .unwrap();
    let envelope: Value = response.json().await.unwrap();
    assert!(
        envelope["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|row| row["quotation_id"] != *id),
        "cross-tenant row leaked into listing"
    );

    app.cleanup().await;
}

#[tokio::test]
async fn mutations_never_cross_the_organization_boundary() {
    let app = TestApp::spawn().await;

    let a = create_in_org(&app, TEST_ORG_ID, json!({ "subject": "Untouchable" })).await;
    let id = a["quotation_id"].as_str().unwrap();

    // Update from the other organization
    let response = app
        .request_as(Method::PATCH, OTHER_ORG_ID, &format!("/quotations/{}", id))
        .json(&json!({ "subject": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Item creation from the other organization
    let response = app
        .request_as(
            Method::POST,
            OTHER_ORG_ID,
            &format!("/quotations/{}/items", id),
        )
        .json(&json!({ "name": "Sneaky", "quantity": "1", "unit_price": "10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Delete from the other organization
    let response = app
        .request_as(Method::DELETE, OTHER_ORG_ID, &format!("/quotations/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // The quotation is untouched in its own organization
    let response = app.get(&format!("/quotations/{}", id)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let envelope: Value = response.json().await.unwrap();
    assert_eq!(envelope["data"]["subject"], "Untouchable");

    app.cleanup().await;
}
