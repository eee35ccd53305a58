//! Racing offers and approvals on one request.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use chrono::Duration;
use futures::future::join_all;
use homeservice_core::{ProviderId, RequestStatus, ServiceError};
use homeservice_testing::Marketplace;

fn crew(market: &Marketplace, size: usize) -> Vec<ProviderId> {
    (0..size)
        .map(|n| {
            let id = ProviderId::new(format!("crew-{n}"));
            market.store.add_provider_account(
                &id,
                &format!("Crew {n}"),
                &format!("crew{n}@example.com"),
                "Koramangala",
            );
            id
        })
        .collect()
}

#[tokio::test]
async fn concurrent_offers_from_distinct_providers_all_land() {
    let market = Marketplace::new();
    let providers = crew(&market, 8);
    let request = market
        .create_request(market.after(Duration::days(2)))
        .await
        .unwrap();

    let results = join_all(providers.iter().map(|provider| {
        market
            .engine
            .accept_request(&request.id, provider, "600")
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    let stored = market.store.stored_request(&request.id).unwrap();
    assert_eq!(stored.offers.len(), providers.len());
    assert_eq!(stored.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn concurrent_approvals_commit_exactly_once() {
    let market = Marketplace::new();
    let providers = crew(&market, 5);
    let request = market
        .create_request(market.after(Duration::days(2)))
        .await
        .unwrap();
    for provider in &providers {
        market
            .engine
            .accept_request(&request.id, provider, "600")
            .await
            .unwrap();
    }

    let results = join_all(providers.iter().map(|provider| {
        market
            .engine
            .approve_request(&request.id, &market.householder, provider)
    }))
    .await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == ServiceError::AlreadyApproved)
    );

    let stored = market.store.stored_request(&request.id).unwrap();
    assert_eq!(stored.approved_offer_count(), 1);
    assert!(stored.approve_status);
}

#[tokio::test]
async fn same_provider_racing_itself_lands_one_offer() {
    let market = Marketplace::new();
    let request = market
        .create_request(market.after(Duration::days(2)))
        .await
        .unwrap();

    let results = join_all((0..4).map(|_| {
        market
            .engine
            .accept_request(&request.id, &market.provider_b, "450")
    }))
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == ServiceError::OfferAlreadySubmitted)
    );
    assert_eq!(
        market.store.stored_request(&request.id).unwrap().offers.len(),
        1
    );
}
