mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use common::test_config;
use moodsync_api::client::{ClientError, SyncClient, Update};
use moodsync_api::dto::AccessRequestBody;
use moodsync_api::models::mood::{DateKey, Mood};
use moodsync_api::storage::memory::MemoryStorage;
use moodsync_api::{router, AppState};

async fn serve() -> String {
    let state = AppState::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(test_config()),
        None,
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}")
}

fn day(y: i32, m: u32, d: u32) -> DateKey {
    DateKey::from(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[tokio::test]
async fn store_follows_the_server() {
    let base = serve().await;
    let mut client = SyncClient::new(&base).unwrap();

    client.signup("ada@example.com", "p1").await.unwrap();
    let mut store = client.login("ada@example.com", "p1").await.unwrap();
    assert!(store.moods.is_empty());
    assert!(store.tasks.is_empty());
    assert!(client.verify().await.unwrap().valid);

    store
        .apply(
            &client,
            Update::SetMood {
                day: day(2024, 4, 15),
                mood: Mood::Happy,
            },
        )
        .await
        .unwrap();
    store
        .apply(
            &client,
            Update::AddTask {
                text: "buy milk".into(),
                date: Utc.with_ymd_and_hms(2024, 4, 15, 10, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();
    store
        .apply(
            &client,
            Update::AddTask {
                text: "call mom".into(),
                date: Utc.with_ymd_and_hms(2024, 4, 16, 9, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();

    assert_eq!(store.mood_on(&day(2024, 4, 15)), Some(Mood::Happy));
    assert_eq!(store.tasks[0].text, "call mom");
    assert_eq!(store.tasks[1].text, "buy milk");

    let milk = store.tasks[1].id;
    store.apply(&client, Update::ToggleTask(milk)).await.unwrap();
    store.apply(&client, Update::ClearCompleted).await.unwrap();
    assert_eq!(store.tasks.len(), 1);
    assert_eq!(store.tasks[0].text, "call mom");

    // A fresh login sees exactly what the store holds.
    let mut other = SyncClient::new(&base).unwrap();
    let reloaded = other.login("ada@example.com", "p1").await.unwrap();
    assert_eq!(reloaded, store);

    let data = client.user_data().await.unwrap();
    assert_eq!(data.email, "ada@example.com");
    assert_eq!(data.tasks, store.tasks);
}

#[tokio::test]
async fn failed_push_keeps_confirmed_state() {
    let base = serve().await;
    let mut client = SyncClient::new(&base).unwrap();
    client.signup("ada@example.com", "p1").await.unwrap();
    let mut store = client.login("ada@example.com", "p1").await.unwrap();

    store
        .apply(
            &client,
            Update::AddTask {
                text: "keep me".into(),
                date: Utc.with_ymd_and_hms(2024, 4, 15, 10, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();
    let confirmed = store.clone();

    let err = store
        .apply(
            &client,
            Update::AddTask {
                text: "   ".into(),
                date: Utc.with_ymd_and_hms(2024, 4, 16, 10, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
    assert_eq!(store, confirmed);

    let stranger = SyncClient::new(&base).unwrap().with_token("forged");
    let err = store
        .apply(&stranger, Update::ClearCompleted)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 403, .. }));
    assert_eq!(store, confirmed);
}

#[tokio::test]
async fn sms_and_access_requests_over_the_wire() {
    let base = serve().await;
    let mut client = SyncClient::new(&base).unwrap();
    client.signup("ada@example.com", "p1").await.unwrap();
    client.login("ada@example.com", "p1").await.unwrap();

    let err = client
        .schedule_sms("+15550001", "hi", std::time::Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 503, .. }));

    let body = AccessRequestBody {
        user_name: "Ada".into(),
        user_email: "ada@example.com".into(),
        user_phone: "+15550001".into(),
        user_company: None,
    };
    let first = client.request_access(&body).await.unwrap();
    assert!(first.is_new_user);
    let again = client.request_access(&body).await.unwrap();
    assert!(!again.is_new_user);
    assert!(again.reference_id.is_none());
}
