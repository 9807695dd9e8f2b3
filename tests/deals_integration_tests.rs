mod common;

use axum::http::{Method, StatusCode};
use dealflow_backend::entities::listings::ListingStatus;
use serde_json::{json, Value};

use crate::common::{create_listing, create_user, open_deal, seed_marketplace, send, spawn_app};

fn timeline_titles(detail: &Value) -> Vec<String> {
    detail["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect()
}

/// Buyer opens a deal with no offer: INQUIRY, seller from listing, one event
#[tokio::test]
async fn test_create_deal_without_offer() {
    let mut app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;

    assert_eq!(deal["stage"], "INQUIRY");
    assert_eq!(deal["buyerId"], market.buyer.id);
    assert_eq!(deal["sellerId"], market.seller.id);
    assert_eq!(deal["listingId"], market.listing.id);
    assert!(deal["offerAmount"].is_null());

    let uri = format!("/deals/{}", deal["id"]);
    let (status, detail) = send(&app.router, Method::GET, &uri, Some(market.buyer.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline_titles(&detail), vec!["Deal created"]);
    assert_eq!(detail["timeline"][0]["eventType"], "STAGE_CHANGE");
    assert_eq!(detail["listing"]["title"], "Niche SaaS, $8k MRR");
    assert_eq!(detail["buyer"]["name"], "Bianca");
    assert_eq!(detail["seller"]["name"], "Samir");

    let notification = app.notifications.try_recv().expect("seller should be notified");
    assert_eq!(notification.recipient_id, market.seller.id);
    assert_eq!(notification.deal_id, deal["id"].as_i64().map(|id| id as i32));
}

#[tokio::test]
async fn test_create_deal_with_initial_offer_records_offer_event() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let deal = open_deal(
        &app,
        &market,
        json!({ "listingId": market.listing.id, "offerAmount": 250000, "notes": "Cash buyer" }),
    )
    .await;
    assert_eq!(deal["offerAmount"], 250000);
    assert_eq!(deal["notes"], "Cash buyer");

    let uri = format!("/deals/{}/timeline", deal["id"]);
    let (status, body) = send(&app.router, Method::GET, &uri, Some(market.seller.id), None).await;
    assert_eq!(status, StatusCode::OK);

    let types: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    // newest first; both share a timestamp so insertion order breaks the tie
    assert_eq!(types, vec!["OFFER_MADE", "STAGE_CHANGE"]);
}

/// Second open deal for the same buyer and listing is rejected with the first id
#[tokio::test]
async fn test_duplicate_active_deal_conflicts() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let first = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/deals",
        Some(market.buyer.id),
        Some(json!({ "listingId": market.listing.id, "offerAmount": 1000 })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["existingDealId"], first["id"]);
}

#[tokio::test]
async fn test_seller_cannot_deal_with_themselves() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/deals",
        Some(market.seller.id),
        Some(json!({ "listingId": market.listing.id })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_listing_must_exist_and_be_published() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let draft = create_listing(&app.db, market.seller.id, "Draft blog", ListingStatus::Draft).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/deals",
        Some(market.buyer.id),
        Some(json!({ "listingId": draft.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/deals",
        Some(market.buyer.id),
        Some(json!({ "listingId": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/deals",
        None,
        Some(json!({ "listingId": market.listing.id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app.router, Method::GET, "/deals", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Skipping stages is rejected and names the allowed successors
#[tokio::test]
async fn test_invalid_transition_leaves_stage_unchanged() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let uri = format!("/deals/{}", deal["id"]);

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &uri,
        Some(market.seller.id),
        Some(json!({ "stage": "DUE_DILIGENCE" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_TRANSITION");
    assert_eq!(body["allowed"], json!(["OFFER", "CANCELLED"]));

    let (_, detail) = send(&app.router, Method::GET, &uri, Some(market.seller.id), None).await;
    assert_eq!(detail["stage"], "INQUIRY");
    assert_eq!(detail["timeline"].as_array().unwrap().len(), 1);
}

/// INQUIRY -> OFFER with an amount adds a stage event and an offer event
#[tokio::test]
async fn test_move_to_offer_with_amount() {
    let mut app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let _ = app.notifications.try_recv();
    let uri = format!("/deals/{}", deal["id"]);

    let (status, updated) = send(
        &app.router,
        Method::PATCH,
        &uri,
        Some(market.buyer.id),
        Some(json!({ "stage": "OFFER", "offerAmount": 500000 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stage"], "OFFER");
    assert_eq!(updated["offerAmount"], 500000);
    assert_eq!(updated["version"], 1);

    // Reading back reflects exactly what was requested
    let (_, detail) = send(&app.router, Method::GET, &uri, Some(market.buyer.id), None).await;
    assert_eq!(detail["stage"], "OFFER");
    assert_eq!(detail["offerAmount"], 500000);
    assert!(detail["notes"].is_null());

    let titles = timeline_titles(&detail);
    assert_eq!(titles.len(), 3);
    assert!(titles.contains(&"Stage changed to Offer".to_string()));
    assert!(titles.contains(&"Offer amount updated".to_string()));
    assert_eq!(titles.last().unwrap(), "Deal created");

    // Deal and its newest event were written in the same unit of work
    assert_eq!(detail["updatedAt"], detail["timeline"][0]["createdAt"]);

    let notification = app.notifications.try_recv().expect("seller should be notified");
    assert_eq!(notification.recipient_id, market.seller.id);
}

#[tokio::test]
async fn test_outsider_cannot_read_or_update() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let uri = format!("/deals/{}", deal["id"]);

    for stage in ["OFFER", "CANCELLED", "COMPLETED"] {
        let (status, body) = send(
            &app.router,
            Method::PATCH,
            &uri,
            Some(market.outsider.id),
            Some(json!({ "stage": stage })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    let (status, _) = send(&app.router, Method::GET, &uri, Some(market.outsider.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let timeline_uri = format!("{}/timeline", uri);
    let (status, _) = send(&app.router, Method::GET, &timeline_uri, Some(market.outsider.id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, Method::GET, "/deals/4242", Some(market.buyer.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

/// Once cancelled, every further update fails with an empty allowed set
#[tokio::test]
async fn test_cancelled_deal_is_final_and_frees_the_pair() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let uri = format!("/deals/{}", deal["id"]);

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &uri,
        Some(market.seller.id),
        Some(json!({ "stage": "CANCELLED", "notes": "Not a fit" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for body in [
        json!({ "stage": "OFFER" }),
        json!({ "stage": "CANCELLED" }),
        json!({ "offerAmount": 100 }),
    ] {
        let (status, err) = send(&app.router, Method::PATCH, &uri, Some(market.buyer.id), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["code"], "INVALID_TRANSITION");
        assert_eq!(err["allowed"], json!([]));
    }

    // The buyer may open a fresh deal on the same listing
    let second = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    assert_ne!(second["id"], deal["id"]);
}

#[tokio::test]
async fn test_full_pipeline_to_completed() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let uri = format!("/deals/{}", deal["id"]);

    let steps = [
        (market.buyer.id, "OFFER"),
        (market.seller.id, "NEGOTIATION"),
        (market.buyer.id, "DUE_DILIGENCE"),
        (market.seller.id, "CLOSING"),
        (market.seller.id, "COMPLETED"),
    ];
    for (actor, stage) in steps {
        let (status, body) = send(&app.router, Method::PATCH, &uri, Some(actor), Some(json!({ "stage": stage }))).await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", stage, body);
        assert_eq!(body["stage"], stage);
    }

    let (_, detail) = send(&app.router, Method::GET, &uri, Some(market.buyer.id), None).await;
    let titles = timeline_titles(&detail);
    assert_eq!(titles.len(), 6);
    assert!(titles.contains(&"Stage changed to Due Diligence".to_string()));
    assert_eq!(detail["sellerId"], market.seller.id);
    assert_eq!(detail["version"], 5);
}

/// Offer-only and notes-only updates at an open stage
#[tokio::test]
async fn test_offer_and_notes_updates_without_stage() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(
        &app,
        &market,
        json!({ "listingId": market.listing.id, "offerAmount": 1000 }),
    )
    .await;
    let uri = format!("/deals/{}", deal["id"]);

    let (status, body) = send(&app.router, Method::PATCH, &uri, Some(market.buyer.id), Some(json!({ "offerAmount": 1500 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "INQUIRY");
    assert_eq!(body["offerAmount"], 1500);

    // Same amount again changes nothing
    let (status, err) = send(&app.router, Method::PATCH, &uri, Some(market.buyer.id), Some(json!({ "offerAmount": 1500 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app.router, Method::PATCH, &uri, Some(market.seller.id), Some(json!({ "notes": "Send the P&L" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "Send the P&L");

    let (_, detail) = send(&app.router, Method::GET, &uri, Some(market.buyer.id), None).await;
    let types: Vec<&str> = detail["timeline"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["NOTES_UPDATED", "OFFER_MADE", "OFFER_MADE", "STAGE_CHANGE"]);
}

#[tokio::test]
async fn test_update_payload_is_validated() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let uri = format!("/deals/{}", deal["id"]);

    let bad_bodies = [
        json!({}),
        json!({ "offerAmount": -5 }),
        json!({ "stage": "OFFER", "sellerId": market.buyer.id }),
        json!({ "stage": "SOLD" }),
    ];
    for body in bad_bodies {
        let (status, err) = send(&app.router, Method::PATCH, &uri, Some(market.buyer.id), Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {} should be rejected", body);
        assert_eq!(err["code"], "VALIDATION_ERROR");
    }

    let (_, detail) = send(&app.router, Method::GET, &uri, Some(market.buyer.id), None).await;
    assert_eq!(detail["stage"], "INQUIRY");
    assert_eq!(detail["version"], 0);
}

#[tokio::test]
async fn test_list_deals_for_user() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let other_seller = create_user(&app.db, "Olga").await;
    let second_listing =
        create_listing(&app.db, other_seller.id, "Shopify store", ListingStatus::Published).await;

    let first = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;
    let second = open_deal(&app, &market, json!({ "listingId": second_listing.id })).await;

    // Touch the first deal so it becomes the most recently updated
    let uri = format!("/deals/{}", first["id"]);
    let (status, _) = send(&app.router, Method::PATCH, &uri, Some(market.seller.id), Some(json!({ "stage": "OFFER" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, Method::GET, "/deals", Some(market.buyer.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let deals = body["deals"].as_array().unwrap();
    assert_eq!(deals[0]["id"], first["id"]);
    assert_eq!(deals[0]["role"], "buyer");
    assert_eq!(deals[0]["latestEvent"]["title"], "Stage changed to Offer");
    assert_eq!(deals[1]["id"], second["id"]);
    assert_eq!(deals[1]["listingTitle"], "Shopify store");

    let (_, body) = send(&app.router, Method::GET, "/deals", Some(market.seller.id), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["deals"][0]["role"], "seller");

    let (_, body) = send(&app.router, Method::GET, "/deals", Some(market.outsider.id), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let (status, body) = send(&app.router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_malformed_ids_are_validation_errors() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;

    let requests = [
        (Method::GET, "/deals/abc", None),
        (Method::PATCH, "/deals/99999999999", Some(json!({ "stage": "OFFER" }))),
        (Method::GET, "/deals/abc/timeline", None),
        (Method::GET, "/deals/abc/documents", None),
        (Method::PATCH, "/calls/abc", Some(json!({ "status": "CONFIRMED" }))),
    ];

    for (method, uri, body) in requests {
        let (status, json) = send(&app.router, method, uri, Some(market.buyer.id), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["code"], "VALIDATION_ERROR", "{}", uri);
    }
}

#[tokio::test]
async fn test_outsider_payload_errors_do_not_reveal_the_deal() {
    let app = spawn_app().await;
    let market = seed_marketplace(&app.db).await;
    let deal = open_deal(&app, &market, json!({ "listingId": market.listing.id })).await;

    let uri = format!("/deals/{}", deal["id"]);
    let (status, body) = send(&app.router, Method::PATCH, &uri, Some(market.outsider.id), Some(json!({ "offerAmount": -1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let uri = format!("/deals/{}/documents", deal["id"]);
    let (status, _) = send(
        &app.router,
        Method::POST,
        &uri,
        Some(market.outsider.id),
        Some(json!({ "name": "NDA", "fileUrl": "ftp://x.test/nda.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
