use reqwest::StatusCode;
use serde_json::{Value, json};

use vertobank_events::{EventEnvelope, Subscription};
use vertobank_kernel::AppConfig;

struct TestServer {
    base_url: String,
    events: Subscription<EventEnvelope>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let config = AppConfig::default().with_connection_string("ItemsConnectionString", "memory://items");
        let app = vertobank_api::app::build_app(&config).expect("startup failed");
        let events = app.bus.subscribe();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.router).await.unwrap();
        });

        Self {
            base_url,
            events,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn event_types(&self) -> Vec<String> {
        self.events
            .drain()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create(client: &reqwest::Client, server: &TestServer, name: &str, price: f64) -> Value {
    let res = client
        .post(server.url("/items"))
        .json(&json!({ "name": name, "price": price }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn list(client: &reqwest::Client, server: &TestServer, query: &str) -> Vec<String> {
    let res = client.get(server.url(&format!("/items{query}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/health", "/alive"] {
        let res = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
    }

    let modules: Value = client.get(server.url("/modules")).send().await.unwrap().json().await.unwrap();
    assert_eq!(modules["modules"][0]["name"], "Items");
}

#[tokio::test]
async fn item_lifecycle_publishes_events_after_each_commit() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let widget = create(&client, &server, "Widget", 10.0).await;
    create(&client, &server, "Anvil", 99.5).await;
    create(&client, &server, "Bolt", 0.25).await;
    assert_eq!(
        server.event_types(),
        vec!["items.item_created", "items.item_created", "items.item_created"]
    );

    assert_eq!(list(&client, &server, "").await, vec!["Anvil", "Bolt", "Widget"]);
    assert_eq!(
        list(&client, &server, "?sort=price&descending=true&page=1&page_size=2").await,
        vec!["Anvil", "Widget"]
    );

    let id = widget["id"].as_str().unwrap();
    let res = client
        .put(server.url(&format!("/items/{id}/price")))
        .json(&json!({ "price": 12.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let repriced: Value = res.json().await.unwrap();
    assert_eq!(repriced["price_minor_units"], 1200);
    assert_eq!(server.event_types(), vec!["items.item_repriced"]);

    let res = client.delete(server.url(&format!("/items/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(list(&client, &server, "").await, vec!["Anvil", "Bolt"]);

    // Deleting twice: the second attempt finds nothing.
    let res = client.delete(server.url(&format!("/items/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let problem: Value = res.json().await.unwrap();
    assert_eq!(problem["status"], 404);
    assert_eq!(problem["title"], "Request failed");
}

#[tokio::test]
async fn validation_failures_are_problem_details() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/items"))
        .json(&json!({ "name": "   ", "price": -3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let problem: Value = res.json().await.unwrap();
    assert_eq!(problem["status"], 400);
    assert_eq!(problem["detail"], "Name is required. Price must be a positive amount.");
    assert_eq!(problem["errors"][0]["code"], "items.name_required");
    assert_eq!(problem["errors"][1]["meta"]["field"], "price");

    assert!(server.event_types().is_empty());
}
