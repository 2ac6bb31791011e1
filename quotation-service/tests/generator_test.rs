//! Project-to-quotation generation tests.

mod common;

use chrono::NaiveDate;
use common::{TestApp, dec_field};
use quotation_service::services::{
    GenerateFromProject, ProjectReader, QuotationGenerator, QuotationItemStore,
    QuotationNumberGenerator, QuotationStore, TemplateReader,
};
use rust_decimal_macros::dec;
use serde_json::{Value, json};

async fn generate(app: &TestApp, project_id: &str, body: Value) -> reqwest::Response {
    app.post(&format!("/projects/{}/quotation", project_id))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn generates_quotation_with_aggregate_cost_items() {
    let app = TestApp::spawn().await;

    let project_id = app
        .seed_project(app.org_id(), "Warehouse build", dec!(5000), dec!(2000), dec!(1500))
        .await;

    let response = generate(
        &app,
        &project_id.to_string(),
        json!({ "include_materials": true, "include_labor": true }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let envelope: Value = response.json().await.unwrap();
    let data = &envelope["data"];

    assert_eq!(data["items_generated"], true);
    let quotation = &data["quotation"];
    assert_eq!(quotation["subject"], "Quotation for Warehouse build");
    assert_eq!(quotation["status"], "draft");
    assert_eq!(dec_field(quotation, "tax_rate"), dec!(11));
    // Items override the budget seed: 2000 + 1500
    assert_eq!(dec_field(quotation, "subtotal"), dec!(3500));

    let issue_date: NaiveDate = quotation["issue_date"].as_str().unwrap().parse().unwrap();
    let valid_until: NaiveDate = quotation["valid_until"].as_str().unwrap().parse().unwrap();
    assert_eq!((valid_until - issue_date).num_days(), 30);

    let quotation_id = quotation["quotation_id"].as_str().unwrap();
    let response = app
        .get(&format!("/quotations/{}/items", quotation_id))
        .send()
        .await
        .unwrap();
    let envelope: Value = response.json().await.unwrap();
    let items = envelope["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Materials");
    assert_eq!(dec_field(&items[0], "line_total"), dec!(2000));
    assert_eq!(items[1]["name"], "Labor");
    assert_eq!(dec_field(&items[1], "line_total"), dec!(1500));

    app.cleanup().await;
}

#[tokio::test]
async fn without_items_the_budget_seeds_the_subtotal() {
    let app = TestApp::spawn().await;

    let project_id = app
        .seed_project(app.org_id(), "Consulting gig", dec!(5000), dec!(0), dec!(0))
        .await;

    let response = generate(&app, &project_id.to_string(), json!({})).await;
    assert_eq!(response.status(), 201);
    let envelope: Value = response.json().await.unwrap();
    let data = &envelope["data"];

    assert_eq!(data["items_generated"], false);
    let quotation = &data["quotation"];
    assert_eq!(dec_field(quotation, "subtotal"), dec!(5000));
    // 5000 * 11% default tax
    assert_eq!(dec_field(quotation, "tax_amount"), dec!(550));
    assert_eq!(dec_field(quotation, "total_amount"), dec!(5550));

    app.cleanup().await;
}

#[tokio::test]
async fn template_supplies_the_default_tax_rate() {
    let app = TestApp::spawn().await;

    let project_id = app
        .seed_project(app.org_id(), "Templated", dec!(1000), dec!(0), dec!(0))
        .await;
    let template_id = app
        .seed_template(app.org_id(), "Standard terms", Some(dec!(7.5)))
        .await;

    let response = generate(
        &app,
        &project_id.to_string(),
        json!({ "template_id": template_id }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let envelope: Value = response.json().await.unwrap();
    let quotation = &envelope["data"]["quotation"];

    assert_eq!(dec_field(quotation, "tax_rate"), dec!(7.5));
    assert_eq!(dec_field(quotation, "tax_amount"), dec!(75));

    app.cleanup().await;
}

#[tokio::test]
async fn missing_project_or_template_is_404() {
    let app = TestApp::spawn().await;

    let response = generate(
        &app,
        "99999999-9999-9999-9999-999999999999",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), 404);

    let project_id = app
        .seed_project(app.org_id(), "No template", dec!(100), dec!(0), dec!(0))
        .await;
    let response = generate(
        &app,
        &project_id.to_string(),
        json!({ "template_id": "88888888-8888-8888-8888-888888888888" }),
    )
    .await;
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn foreign_organization_projects_are_invisible() {
    let app = TestApp::spawn().await;

    let project_id = app
        .seed_project(app.other_org_id(), "Not yours", dec!(100), dec!(0), dec!(0))
        .await;

    let response = generate(&app, &project_id.to_string(), json!({})).await;
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn callers_without_tenant_context_adopt_the_project_organization() {
    let app = TestApp::spawn().await;

    let project_id = app
        .seed_project(app.other_org_id(), "Internal batch", dec!(800), dec!(0), dec!(0))
        .await;

    let db = app.db.clone();
    let quotations = QuotationStore::new(db.clone(), QuotationNumberGenerator::new(db.clone()));
    let generator = QuotationGenerator::new(
        ProjectReader::new(db.clone()),
        TemplateReader::new(db.clone()),
        quotations,
        QuotationItemStore::new(db),
    );

    let generated = generator
        .generate_from_project(
            None,
            app.user_id(),
            &GenerateFromProject {
                project_id,
                template_id: None,
                include_materials: false,
                include_labor: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        generated.quotation.organization_id,
        app.other_org_id(),
        "fallback must adopt the project's organization"
    );

    app.cleanup().await;
}
