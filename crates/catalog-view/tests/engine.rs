//! End-to-end tests of the view engine against the in-memory store.

use std::sync::Arc;

use catalog_memstore::MemoryStore;
use catalog_model::{
    CollectionKey, ContactStatus, FieldUpdate, Record, RecordId, SortColumn, SortDirection,
};
use catalog_view::{
    FeedEvent, FeedStatus, FilterName, MutationKind, StoreError, ViewConfig, ViewEngine,
    ViewError,
};
use serde_json::json;

fn id(value: &str) -> RecordId {
    RecordId::new(value).unwrap()
}

fn key() -> CollectionKey {
    CollectionKey::default()
}

fn product(asin: &str, title: &str, price: f64) -> Record {
    Record::new(id(asin)).with_title(title).with_price(price)
}

fn seeded(records: &[Record]) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for record in records {
        store.insert_record(&key(), record).unwrap();
    }
    Arc::new(store)
}

fn catalog() -> Vec<Record> {
    vec![
        product("B001", "Desk lamp", 24.99).with_reviews(310),
        product("B002", "Monitor arm", 89.0).with_reviews(45),
        product("B003", "Cable tray", 12.5).with_reviews(1200),
    ]
}

fn page_ids(view: &ViewEngine<MemoryStore>) -> Vec<String> {
    view.current_page_slice()
        .iter()
        .map(|record| record.id.to_string())
        .collect()
}

async fn live_view(store: &Arc<MemoryStore>, config: &ViewConfig) -> ViewEngine<MemoryStore> {
    let mut view = ViewEngine::new(Arc::clone(store), config).unwrap();
    assert_eq!(view.feed_status(), &FeedStatus::Detached);
    view.attach().unwrap();
    assert_eq!(view.feed_status(), &FeedStatus::Connecting);
    let event = view.next_snapshot().await;
    assert!(matches!(event, FeedEvent::Applied(_)));
    view
}

#[tokio::test]
async fn first_push_populates_view_in_price_order() {
    let store = seeded(&catalog());
    let view = live_view(&store, &ViewConfig::default()).await;

    assert_eq!(view.feed_status(), &FeedStatus::Live);
    assert_eq!(view.total_records(), 3);
    assert_eq!(page_ids(&view), ["B003", "B001", "B002"]);
    assert_eq!(store.subscriber_count(&key()), 1);
}

#[tokio::test]
async fn header_clicks_flip_then_reset_direction() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;

    view.set_sort_column(SortColumn::Reviews);
    assert_eq!(view.sort().direction, SortDirection::Ascending);
    assert_eq!(page_ids(&view), ["B002", "B001", "B003"]);

    view.set_sort_column(SortColumn::Reviews);
    assert_eq!(view.sort().direction, SortDirection::Descending);
    assert_eq!(page_ids(&view), ["B003", "B001", "B002"]);

    view.set_sort_column(SortColumn::Title);
    assert_eq!(view.sort().direction, SortDirection::Ascending);
    assert_eq!(page_ids(&view), ["B003", "B001", "B002"]);
}

#[tokio::test]
async fn delete_is_visible_only_after_next_push() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;

    let request = view.request_delete(&id("B001"));
    assert!(view.record(&id("B001")).is_some());

    request.await.unwrap();
    assert!(view.record(&id("B001")).is_some());

    let event = view.next_snapshot().await;
    assert!(matches!(event, FeedEvent::Applied(ref report) if report.accepted == 2));
    assert!(view.record(&id("B001")).is_none());
    assert_eq!(page_ids(&view), ["B003", "B002"]);
}

#[tokio::test]
async fn field_update_arrives_through_snapshot() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;

    view.request_field_update(&id("B002"), &FieldUpdate::Price(5.0))
        .await
        .unwrap();
    assert_eq!(view.record(&id("B002")).unwrap().price, 89.0);

    view.next_snapshot().await;
    assert_eq!(view.record(&id("B002")).unwrap().price, 5.0);
    assert_eq!(page_ids(&view), ["B002", "B003", "B001"]);
}

#[tokio::test]
async fn contact_toggle_cycles_and_feeds_filter() {
    let store = seeded(&catalog());
    let config = ViewConfig {
        enabled_filters: vec![FilterName::not_contacted()],
        ..ViewConfig::default()
    };
    let mut view = live_view(&store, &config).await;
    assert_eq!(view.visible_records(), 3);

    view.request_contact_toggle(&id("B003")).unwrap().await.unwrap();
    view.next_snapshot().await;
    assert_eq!(
        view.record(&id("B003")).unwrap().contacted,
        ContactStatus::Yes
    );
    assert_eq!(page_ids(&view), ["B001", "B002"]);

    view.request_contact_toggle(&id("B003")).unwrap().await.unwrap();
    view.next_snapshot().await;
    assert_eq!(view.record(&id("B003")).unwrap().contacted, ContactStatus::No);
    assert_eq!(view.visible_records(), 3);
    assert_eq!(store.snapshot(&key()).unwrap()["B003"]["Contacted"], json!("No"));
}

#[tokio::test]
async fn rejected_mutation_leaves_view_unchanged() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;
    store
        .fail_next_mutation(StoreError::Rejected("permission denied".to_string()))
        .unwrap();

    let err = view.request_delete(&id("B002")).await.unwrap_err();
    assert_eq!(err.kind, MutationKind::Delete);
    assert_eq!(err.id, id("B002"));
    assert_eq!(err.to_string(), "failed to delete record B002");

    assert_eq!(
        err.source,
        StoreError::Rejected("permission denied".to_string())
    );
    assert_eq!(
        ViewError::from(err).user_message(),
        "Could not delete product B002."
    );

    assert_eq!(view.total_records(), 3);
    assert_eq!(store.snapshot(&key()).unwrap().len(), 3);
    assert_eq!(view.feed_status(), &FeedStatus::Live);
}

#[tokio::test]
async fn feed_error_keeps_last_collection() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;

    let error = StoreError::Unavailable("connection reset".to_string());
    store.push_error(&key(), &error).unwrap();

    assert_eq!(view.next_snapshot().await, FeedEvent::Failed(error));
    assert!(view.feed_status().is_stale());
    assert_eq!(view.total_records(), 3);
    assert!(view.is_attached());

    store
        .insert_record(&key(), &product("B004", "Footrest", 35.0))
        .unwrap();
    view.next_snapshot().await;
    assert_eq!(view.feed_status(), &FeedStatus::Live);
    assert_eq!(view.total_records(), 4);
}

#[tokio::test]
async fn closed_stream_releases_subscription() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;

    store.close_subscribers(&key()).unwrap();

    assert_eq!(view.next_snapshot().await, FeedEvent::Closed);
    assert!(!view.is_attached());
    assert!(view.feed_status().is_stale());
    assert_eq!(view.total_records(), 3);
    assert_eq!(store.unsubscribe_count(), 1);
    assert_eq!(store.subscriber_count(&key()), 0);
}

#[tokio::test]
async fn failed_subscribe_can_be_retried() {
    let store = seeded(&catalog());
    store
        .fail_next_subscribe(StoreError::Unavailable("offline".to_string()))
        .unwrap();
    let mut view = ViewEngine::new(Arc::clone(&store), &ViewConfig::default()).unwrap();

    assert!(matches!(
        view.attach(),
        Err(ViewError::Subscription { .. })
    ));
    assert!(view.feed_status().is_stale());

    view.attach().unwrap();
    view.next_snapshot().await;
    assert_eq!(view.feed_status(), &FeedStatus::Live);
}

#[tokio::test]
async fn teardown_unsubscribes_once() {
    let store = seeded(&catalog());
    let mut view = live_view(&store, &ViewConfig::default()).await;
    view.attach().unwrap();
    assert_eq!(store.subscriber_count(&key()), 1);

    view.teardown();
    assert_eq!(store.subscriber_count(&key()), 0);
    assert_eq!(store.unsubscribe_count(), 1);
}

#[tokio::test]
async fn dropping_view_unsubscribes() {
    let store = seeded(&catalog());
    let view = live_view(&store, &ViewConfig::default()).await;

    drop(view);
    assert_eq!(store.subscriber_count(&key()), 0);
    assert_eq!(store.unsubscribe_count(), 1);
}

#[tokio::test]
async fn twenty_five_records_make_two_pages() {
    let records: Vec<Record> = (1..=25)
        .map(|n| product(&format!("B{n:03}"), &format!("Item {n}"), f64::from(n)))
        .collect();
    let store = seeded(&records);
    let mut view = live_view(&store, &ViewConfig::default()).await;

    assert_eq!(view.current_page_slice().len(), 20);
    assert_eq!(view.total_pages(), 2);
    assert!(!view.has_previous_page());
    assert!(view.has_next_page());

    assert!(view.next_page());
    assert_eq!(view.page(), 2);
    assert_eq!(view.current_page_slice().len(), 5);
    assert_eq!(page_ids(&view)[0], "B021");
    assert!(!view.has_next_page());
    assert!(!view.next_page());

    assert!(view.previous_page());
    assert!(!view.previous_page());
    assert_eq!(view.page(), 1);
}

#[tokio::test]
async fn page_survives_shrinking_collection() {
    let records: Vec<Record> = (1..=25)
        .map(|n| product(&format!("B{n:03}"), "Item", f64::from(n)))
        .collect();
    let store = seeded(&records);
    let mut view = live_view(&store, &ViewConfig::default()).await;
    view.set_page(2);

    for n in 15..=25 {
        let request = view.request_delete(&id(&format!("B{n:03}")));
        request.await.unwrap();
        view.next_snapshot().await;
    }

    assert_eq!(view.page(), 2);
    assert!(view.current_page_slice().is_empty());
    assert!(view.has_previous_page());
    assert!(!view.has_next_page());
}

#[tokio::test]
async fn only_records_without_identifier_are_skipped() {
    let store = seeded(&catalog());
    store
        .insert_raw(&key(), "broken", json!({ "Title": "no identifier" }))
        .unwrap();
    store
        .insert_raw(&key(), "B009", json!({ "ASIN": "B009", "Price": "not a price" }))
        .unwrap();

    let mut view = ViewEngine::new(Arc::clone(&store), &ViewConfig::default()).unwrap();
    view.attach().unwrap();
    let FeedEvent::Applied(report) = view.next_snapshot().await else {
        panic!("expected a snapshot");
    };

    assert_eq!(report.accepted, 4);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].key, "broken");
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.degraded[0].key, "B009");
    assert_eq!(view.total_records(), 4);
    assert_eq!(view.feed_status(), &FeedStatus::Live);

    // An unreadable price ranks after every real one.
    assert_eq!(page_ids(&view), ["B003", "B001", "B002", "B009"]);
}

#[tokio::test]
async fn writes_go_to_the_key_a_record_was_pushed_under() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_raw(&key(), "-Nx01", json!({ "ASIN": "B777", "Title": "Kettle" }))
        .unwrap();
    store
        .insert_raw(&key(), " B888 ", json!({ "ASIN": "B888", "Title": "Toaster" }))
        .unwrap();
    let mut view = live_view(&store, &ViewConfig::default()).await;

    view.request_contact_toggle(&id("B777")).unwrap().await.unwrap();
    let FeedEvent::Applied(report) = view.next_snapshot().await else {
        panic!("expected a snapshot");
    };
    assert!(report.dropped.is_empty());
    assert_eq!(
        view.record(&id("B777")).unwrap().contacted,
        ContactStatus::Yes
    );
    let raw = store.snapshot(&key()).unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw["-Nx01"]["Contacted"], json!("Yes"));

    view.request_delete(&id("B777")).await.unwrap();
    view.request_delete(&id("B888")).await.unwrap();
    view.next_snapshot().await;
    view.next_snapshot().await;
    assert_eq!(view.total_records(), 0);
    assert!(store.snapshot(&key()).unwrap().is_empty());
}

#[tokio::test]
async fn outbound_link_filter_ignores_sentinel() {
    let store = seeded(&[
        product("B001", "Desk lamp", 24.99).with_secondary_link(Some("https://shop.example/lamp")),
        product("B002", "Monitor arm", 89.0).with_secondary_link(Some("none")),
        product("B003", "Cable tray", 12.5),
    ]);
    let mut view = live_view(&store, &ViewConfig::default()).await;

    assert!(view.toggle_filter(&FilterName::has_outbound_link()).unwrap());
    assert_eq!(page_ids(&view), ["B001"]);

    assert!(!view.toggle_filter(&FilterName::has_outbound_link()).unwrap());
    assert_eq!(view.visible_records(), 3);
}
