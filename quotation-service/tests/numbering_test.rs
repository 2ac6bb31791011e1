//! Quotation number generation tests: format, monotonicity, and uniqueness
//! under concurrency.

mod common;

use common::TestApp;
use futures::future::join_all;
use quotation_service::services::QuotationNumberGenerator;
use serde_json::json;
use std::collections::HashSet;

#[tokio::test]
async fn generated_numbers_are_sequential_per_organization() {
    let app = TestApp::spawn().await;

    let generator = QuotationNumberGenerator::new(app.db.clone());
    let first = generator.generate(app.org_id()).await.unwrap();
    let second = generator.generate(app.org_id()).await.unwrap();

    assert!(first.starts_with("QT-"), "unexpected format: {}", first);
    assert!(second.starts_with("QT-"), "unexpected format: {}", second);
    assert_ne!(first, second);

    // A different organization starts its own sequence
    let other = generator.generate(app.other_org_id()).await.unwrap();
    assert!(other.ends_with("00001"), "unexpected start: {}", other);

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_generation_yields_distinct_numbers() {
    let app = TestApp::spawn().await;

    let generator = QuotationNumberGenerator::new(app.db.clone());
    let org_id = app.org_id();

    let calls = (0..10).map(|_| generator.generate(org_id));
    let numbers: Vec<String> = join_all(calls)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    let distinct: HashSet<&String> = numbers.iter().collect();
    assert_eq!(distinct.len(), numbers.len(), "duplicate numbers: {:?}", numbers);

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_creates_receive_distinct_numbers() {
    let app = TestApp::spawn().await;

    let requests = (0..8).map(|i| {
        app.post("/quotations")
            .json(&json!({ "subject": format!("Concurrent {}", i) }))
            .send()
    });
    let responses = join_all(requests).await;

    let mut numbers = HashSet::new();
    for response in responses {
        let response = response.unwrap();
        assert_eq!(response.status(), 201);
        let envelope: serde_json::Value = response.json().await.unwrap();
        let number = envelope["data"]["quotation_number"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(numbers.insert(number.clone()), "duplicate number: {}", number);
    }

    app.cleanup().await;
}
