//! Automatic catalog matching and manual candidate application

mod helpers;

use helpers::{candidate, catalog_coin, search_response, FakeCatalog, FakeAnalyzer, Harness};
use numis_intake::services::coin_service::AMBIGUOUS_RESULT_THRESHOLD;
use numis_intake::services::MatchOutcome;
use numis_intake::CoinError;
use serde_json::json;
use uuid::Uuid;

fn harness_for(face_value: &str, year: i64, catalog: FakeCatalog) -> (Harness, Uuid) {
    let harness = Harness::with_catalog(catalog);
    let coin = catalog_coin(face_value, year);
    let id = coin.id;
    harness.coins.insert(coin);
    (harness, id)
}

#[tokio::test]
async fn test_euro_cent_scenario_matches() {
    let catalog = FakeCatalog::with_search(search_response(1, vec![candidate(123, 2007, 2009)]));
    catalog.add_detail(123, json!({ "value": { "numeric_value": 0.2 }, "weight": 5.74 }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(123));
    let stored = harness.coins.stored(id).unwrap();
    assert_eq!(stored.numista_number, 123);
    assert_eq!(stored.weight_g, 5.74);
    assert!(stored.numista_details.is_some());

    let queries = harness.catalog().queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].q, "20 Euro Cent Euro Spain");
    assert_eq!(queries[0].category, "coin");
    assert_eq!(queries[0].year, Some(2008));
}

#[tokio::test]
async fn test_unparseable_face_value_never_matches() {
    let catalog = FakeCatalog::with_search(search_response(1, vec![candidate(7, 1900, 2100)]));
    catalog.add_detail(7, json!({ "value": { "numeric_value": 10.0 } }));
    let (harness, id) = harness_for("Unknown", 2000, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::NoMatch);
    let stored = harness.coins.stored(id).unwrap();
    assert_eq!(stored.numista_number, 0);
    assert!(stored.numista_details.is_none());
    assert_eq!(harness.coins.update_count(), 1);
}

#[tokio::test]
async fn test_zero_results_records_no_match() {
    let catalog = FakeCatalog::with_search(search_response(0, vec![]));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::NoResults);
    let stored = harness.coins.stored(id).unwrap();
    assert_eq!(stored.numista_number, 0);
    assert_eq!(stored.numista_search.as_ref().unwrap()["count"], json!(0));
    assert_eq!(harness.coins.update_count(), 1);
    assert!(harness.catalog().detail_calls().is_empty());
}

#[tokio::test]
async fn test_too_many_results_skips_detail_fetches() {
    let count = AMBIGUOUS_RESULT_THRESHOLD + 1;
    let types = (1..=5).map(|id| candidate(id, 2000, 2020)).collect();
    let catalog = FakeCatalog::with_search(search_response(count, types));
    for id in 1..=5 {
        catalog.add_detail(id, json!({ "value": { "numeric_value": 0.2 } }));
    }
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::TooManyResults(count));
    assert_eq!(harness.coins.stored(id).unwrap().numista_number, 0);
    assert!(harness.catalog().detail_calls().is_empty());
    assert_eq!(harness.coins.update_count(), 1);
}

#[tokio::test]
async fn test_threshold_itself_is_still_evaluated() {
    let catalog = FakeCatalog::with_search(search_response(
        AMBIGUOUS_RESULT_THRESHOLD,
        vec![candidate(9, 2000, 2020)],
    ));
    catalog.add_detail(9, json!({ "value": { "numeric_value": 0.2 } }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(9));
}

#[tokio::test]
async fn test_failed_detail_is_skipped() {
    let catalog = FakeCatalog::with_search(search_response(
        2,
        vec![candidate(1, 2000, 2020), candidate(2, 2000, 2020)],
    ));
    catalog.fail_detail(1, "502 Bad Gateway");
    catalog.add_detail(2, json!({ "value": { "numeric_value": 0.2 }, "shape": "Round" }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(2));
    assert_eq!(harness.catalog().detail_calls(), vec![1, 2]);
    let stored = harness.coins.stored(id).unwrap();
    assert_eq!(stored.numista_number, 2);
    assert_eq!(stored.shape, "Round");
}

#[tokio::test]
async fn test_first_matching_candidate_wins() {
    let catalog = FakeCatalog::with_search(search_response(
        3,
        vec![candidate(1, 2000, 2020), candidate(2, 2000, 2020), candidate(3, 2000, 2020)],
    ));
    catalog.add_detail(1, json!({ "value": { "numeric_value": 0.5 } }));
    catalog.add_detail(2, json!({ "value": { "numeric_value": 0.2 } }));
    catalog.add_detail(3, json!({ "value": { "numeric_value": 0.2 } }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(2));
    assert_eq!(harness.catalog().detail_calls(), vec![1, 2]);
}

#[tokio::test]
async fn test_candidates_outside_year_span_are_not_fetched() {
    let catalog = FakeCatalog::with_search(search_response(
        2,
        vec![candidate(1, 1999, 2001), candidate(2, 2007, 2009)],
    ));
    catalog.add_detail(1, json!({ "value": { "numeric_value": 0.2 } }));
    catalog.add_detail(2, json!({ "value": { "numeric_value": 0.2 } }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(2));
    assert_eq!(harness.catalog().detail_calls(), vec![2]);
}

#[tokio::test]
async fn test_unknown_year_is_not_sent_and_accepts_any_span() {
    let catalog = FakeCatalog::with_search(search_response(1, vec![candidate(4, 1870, 1900)]));
    catalog.add_detail(4, json!({ "value": { "numeric_value": 25.0 } }));
    let (harness, id) = harness_for("25 Pesetas", 0, catalog);

    let outcome = harness.service.enrich_coin_with_numista(id).await.unwrap();

    assert_eq!(outcome, MatchOutcome::Matched(4));
    assert_eq!(harness.catalog().queries.lock().unwrap()[0].year, None);
}

#[tokio::test]
async fn test_search_failure_aborts_without_update() {
    let catalog = FakeCatalog::default();
    *catalog.search.lock().unwrap() = Some(Err("connection reset".to_string()));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let err = harness.service.enrich_coin_with_numista(id).await.unwrap_err();

    assert!(matches!(err, CoinError::Dependency { .. }));
    assert_eq!(harness.coins.update_count(), 0);
}

#[tokio::test]
async fn test_enriching_missing_coin_is_not_found() {
    let harness = Harness::with_catalog(FakeCatalog::default());

    let err = harness
        .service
        .enrich_coin_with_numista(Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, CoinError::NotFound(_)));
}

#[tokio::test]
async fn test_scheduled_enrichment_updates_coin() {
    let catalog = FakeCatalog::with_search(search_response(1, vec![candidate(123, 2007, 2009)]));
    catalog.add_detail(123, json!({ "value": { "numeric_value": 0.2 } }));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let handle = harness.service.schedule_enrichment(id).expect("catalog configured");
    handle.await.unwrap();

    assert_eq!(harness.coins.stored(id).unwrap().numista_number, 123);
}

#[tokio::test]
async fn test_scheduled_enrichment_swallows_errors() {
    let catalog = FakeCatalog::default();
    *catalog.search.lock().unwrap() = Some(Err("503".to_string()));
    let (harness, id) = harness_for("20 Euro Cent", 2008, catalog);

    let handle = harness.service.schedule_enrichment(id).expect("catalog configured");

    assert!(handle.await.is_ok());
    assert_eq!(harness.coins.update_count(), 0);
}

#[tokio::test]
async fn test_apply_candidate_maps_full_detail() {
    let catalog = FakeCatalog::default();
    catalog.add_detail(
        999,
        json!({
            "title": "Full Coin",
            "size": 25.0,
            "thickness": 2.0,
            "weight": 8.5,
            "shape": "Round",
            "composition": { "text": "Gold" },
            "mints": [{ "name": "Royal Mint" }],
            "references": [{ "catalogue": { "code": "KM" }, "number": "123" }],
            "ruler": [{ "name": "King Charles" }],
            "orientation": "Coin alignment",
            "series": "Commemorative",
            "commemorated_topic": "Anniversary"
        }),
    );
    let (harness, id) = harness_for("1 Pound", 2020, catalog);

    let coin = harness.service.apply_numista_candidate(id, 999).await.unwrap();

    assert_eq!(coin.numista_number, 999);
    assert_eq!(coin.diameter_mm, 25.0);
    assert_eq!(coin.thickness_mm, 2.0);
    assert_eq!(coin.weight_g, 8.5);
    assert_eq!(coin.shape, "Round");
    assert_eq!(coin.material, "Gold");
    assert_eq!(coin.mint, "Royal Mint");
    assert_eq!(coin.km_code.as_str(), "KM# 123");
    assert_eq!(coin.ruler, "King Charles");
    assert_eq!(coin.orientation, "Coin alignment");
    assert_eq!(coin.series, "Commemorative");
    assert_eq!(coin.commemorated_topic, "Anniversary");
    assert_eq!(harness.coins.stored(id).unwrap(), coin);
    assert!(harness.catalog().queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_apply_candidate_detail_failure_is_surfaced() {
    let catalog = FakeCatalog::default();
    catalog.fail_detail(999, "404 Not Found");
    let (harness, id) = harness_for("1 Pound", 2020, catalog);

    let err = harness.service.apply_numista_candidate(id, 999).await.unwrap_err();

    assert!(matches!(err, CoinError::Dependency { .. }));
    assert!(err.to_string().contains("404 Not Found"));
    assert_eq!(harness.coins.update_count(), 0);
}

#[tokio::test]
async fn test_catalog_operations_need_credentials() {
    let harness = Harness::new(FakeAnalyzer::default());
    let coin = catalog_coin("1 Pound", 2020);
    let id = coin.id;
    harness.coins.insert(coin);

    let err = harness.service.apply_numista_candidate(id, 1).await.unwrap_err();

    assert!(matches!(err, CoinError::Dependency { .. }));
}
