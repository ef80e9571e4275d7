use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use freshtrack_core::{
    Error, ExpiryPipeline, NotificationWindow, Notifier, OnDemandRequest, RunOutcome,
};
use freshtrack_mail::{Email, MailError, MailTransport, MockMailTransport};
use freshtrack_store::{
    MemoryProductStore, NewProduct, Product, ProductStore, SqliteProductStore, StoreError,
};
use uuid::Uuid;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn product(name: &str, days_out: i64, sent: bool) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        expiry: today() + Duration::days(days_out),
        notification_sent: sent,
        created_at: Utc::now(),
        image_url: None,
    }
}

/// Transport double that keeps every email it was asked to send
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<Email>>,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Store that can read but whose writes always fail
struct ReadOnlyStore {
    inner: MemoryProductStore,
}

#[async_trait]
impl ProductStore for ReadOnlyStore {
    async fn list(&self) -> freshtrack_store::Result<Vec<Product>> {
        self.inner.list().await
    }

    async fn get(&self, id: Uuid) -> freshtrack_store::Result<Product> {
        self.inner.get(id).await
    }

    async fn create(&self, _input: NewProduct) -> freshtrack_store::Result<Product> {
        Err(StoreError::Unavailable("read only".into()))
    }

    async fn delete(&self, _id: Uuid) -> freshtrack_store::Result<Product> {
        Err(StoreError::Unavailable("read only".into()))
    }

    async fn mark_notified(&self, _ids: &[Uuid]) -> freshtrack_store::Result<usize> {
        Err(StoreError::Unavailable("read only".into()))
    }
}

fn pipeline(store: Arc<dyn ProductStore>, transport: Arc<dyn MailTransport>) -> ExpiryPipeline {
    let notifier = Notifier::new(transport, "alerts@example.com");
    ExpiryPipeline::new(store, notifier, NotificationWindow::default())
}

#[tokio::test]
async fn test_only_unsent_products_inside_window_are_mailed() {
    let a = product("A", 3, false);
    let b = product("B", 10, false);
    let c = product("C", 2, true);
    let store = Arc::new(MemoryProductStore::with_products(vec![
        a.clone(),
        b.clone(),
        c.clone(),
    ]));
    let transport = Arc::new(RecordingTransport::default());
    let pipeline = pipeline(store.clone(), transport.clone());

    let outcome = pipeline
        .run_scheduled(today(), "ops@example.com")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Sent {
            recipient: "ops@example.com".into(),
            notified: vec![a.id],
            marked: 1,
        }
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains("<h3>Expiring in 3 days:</h3>"));
    assert!(sent[0].html.contains("<strong>A</strong>"));
    assert!(!sent[0].html.contains("<strong>B</strong>"));
    assert!(!sent[0].html.contains("<strong>C</strong>"));

    assert!(store.get(a.id).await.unwrap().notification_sent);
    assert!(!store.get(b.id).await.unwrap().notification_sent);
    assert!(store.get(c.id).await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_second_run_sends_nothing() {
    let store = Arc::new(MemoryProductStore::with_products(vec![
        product("Milk", 1, false),
        product("Bread", 4, false),
    ]));
    let mut transport = MockMailTransport::new();
    transport.expect_send().times(1).returning(|_| Ok(()));
    let pipeline = pipeline(store, Arc::new(transport));

    let first = pipeline.run_scheduled(today(), "ops@example.com").await.unwrap();
    assert_eq!(first.notified().len(), 2);

    let second = pipeline.run_scheduled(today(), "ops@example.com").await.unwrap();
    assert_eq!(second, RunOutcome::NothingToSend);
}

#[tokio::test]
async fn test_failed_send_leaves_flags_for_next_run() {
    let milk = product("Milk", 2, false);
    let store = Arc::new(MemoryProductStore::with_products(vec![milk.clone()]));

    let mut failing = MockMailTransport::new();
    failing
        .expect_send()
        .times(1)
        .returning(|_| Err(MailError::Smtp("535 authentication failed".into())));
    let err = pipeline(store.clone(), Arc::new(failing))
        .run_scheduled(today(), "ops@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(!store.get(milk.id).await.unwrap().notification_sent);

    // Next tick picks up the same candidate
    let transport = Arc::new(RecordingTransport::default());
    let outcome = pipeline(store.clone(), transport.clone())
        .run_scheduled(today(), "ops@example.com")
        .await
        .unwrap();
    assert_eq!(outcome.notified(), &[milk.id]);
    assert_eq!(transport.sent().len(), 1);
    assert!(store.get(milk.id).await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_empty_window_skips_transport() {
    let store = Arc::new(MemoryProductStore::with_products(vec![
        product("Jam", 30, false),
        product("Old", -3, false),
    ]));
    let mut transport = MockMailTransport::new();
    transport.expect_send().never();

    let outcome = pipeline(store, Arc::new(transport))
        .run_scheduled(today(), "ops@example.com")
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::NothingToSend);
}

#[tokio::test]
async fn test_mark_failure_after_send_is_store_error() {
    let milk = product("Milk", 2, false);
    let store = Arc::new(ReadOnlyStore {
        inner: MemoryProductStore::with_products(vec![milk]),
    });
    let transport = Arc::new(RecordingTransport::default());

    let err = pipeline(store, transport.clone())
        .run_scheduled(today(), "ops@example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_on_demand_uses_supplied_products_and_window() {
    let near = product("Near", 2, false);
    let far = product("Far", 5, false);
    let untouched = product("Untouched", 1, false);
    let store = Arc::new(MemoryProductStore::with_products(vec![
        near.clone(),
        far.clone(),
        untouched.clone(),
    ]));
    let transport = Arc::new(RecordingTransport::default());
    let pipeline = pipeline(store.clone(), transport.clone());

    let request = OnDemandRequest {
        recipient: "me@example.com".into(),
        products: vec![near.clone(), far.clone()],
        window: Some(NotificationWindow::new(3).unwrap()),
    };
    let outcome = pipeline.run_on_demand(request, today()).await.unwrap();

    assert_eq!(outcome.notified(), &[near.id]);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "me@example.com");

    assert!(store.get(near.id).await.unwrap().notification_sent);
    assert!(!store.get(far.id).await.unwrap().notification_sent);
    assert!(!store.get(untouched.id).await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_on_demand_repeated_request_mails_once() {
    let milk = product("Milk", 2, false);
    let store = Arc::new(MemoryProductStore::with_products(vec![milk.clone()]));
    let transport = Arc::new(RecordingTransport::default());
    let pipeline = pipeline(store.clone(), transport.clone());

    // Same snapshot both times, still claiming notificationSent = false
    let request = OnDemandRequest {
        recipient: "me@example.com".into(),
        products: vec![milk.clone()],
        window: None,
    };

    let first = pipeline.run_on_demand(request.clone(), today()).await.unwrap();
    assert_eq!(first.notified(), &[milk.id]);

    let second = pipeline.run_on_demand(request, today()).await.unwrap();
    assert_eq!(second, RunOutcome::NothingToSend);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_on_demand_reads_state_from_store() {
    let already_sent = product("Yogurt", 1, true);
    let moved_out = product("Cheese", 30, false);
    let unknown = product("Ghost", 1, false);
    let store = Arc::new(MemoryProductStore::with_products(vec![
        already_sent.clone(),
        moved_out.clone(),
    ]));
    let mut transport = MockMailTransport::new();
    transport.expect_send().never();

    // Client copies that disagree with what is stored
    let mut stale_flag = already_sent.clone();
    stale_flag.notification_sent = false;
    let mut stale_expiry = moved_out.clone();
    stale_expiry.expiry = today() + Duration::days(1);

    let request = OnDemandRequest {
        recipient: "me@example.com".into(),
        products: vec![stale_flag, stale_expiry, unknown],
        window: None,
    };
    let outcome = pipeline(store, Arc::new(transport))
        .run_on_demand(request, today())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::NothingToSend);
}

#[tokio::test]
async fn test_malformed_recipient_rejected_before_send() {
    let milk = product("Milk", 1, false);
    let store = Arc::new(MemoryProductStore::with_products(vec![milk.clone()]));
    let mut transport = MockMailTransport::new();
    transport.expect_send().never();
    let pipeline = pipeline(store.clone(), Arc::new(transport));

    let request = OnDemandRequest {
        recipient: "not an address".into(),
        products: vec![milk.clone()],
        window: None,
    };
    let err = pipeline.run_on_demand(request, today()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!store.get(milk.id).await.unwrap().notification_sent);
}

#[tokio::test]
async fn test_blank_recipient_rejected() {
    let store = Arc::new(MemoryProductStore::with_products(vec![product("Milk", 1, false)]));
    let mut transport = MockMailTransport::new();
    transport.expect_send().never();

    let err = pipeline(store, Arc::new(transport))
        .run_scheduled(today(), "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_sqlite_backed_run() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteProductStore::open(dir.path().join("products.db")).unwrap();
    let expiry = (today() + Duration::days(6)).format("%Y-%m-%d").to_string();
    let created = sqlite
        .create(NewProduct::parse("Salad", &expiry, None).unwrap())
        .await
        .unwrap();
    let store: Arc<dyn ProductStore> = Arc::new(sqlite);

    let transport = Arc::new(RecordingTransport::default());
    let pipeline = pipeline(store.clone(), transport.clone());

    let preview = pipeline.preview(today()).await.unwrap().unwrap();
    assert_eq!(preview.product_ids(), vec![created.id]);

    let outcome = pipeline.run_scheduled(today(), "ops@example.com").await.unwrap();
    assert_eq!(outcome.notified(), &[created.id]);
    assert!(store.get(created.id).await.unwrap().notification_sent);
    assert!(pipeline.preview(today()).await.unwrap().is_none());
}
