//! Integration tests for the HTTP-backed engines: page driver, proxy agent
//! and document agent

use citescrape_domain::{ContentFieldSpec, Task};
use citescrape_engines::{
    BrowserDriver, BrowserSettings, ChunkStrategy, EngineError, HttpBrowserDriver, PdfAgent,
    PdfSettings, ProxyAgent, UnlockerClient,
};
use citescrape_extractor::{build_output_model, ExtractionEngine, OutputModelList, RunContext, ScrollDirection};
use citescrape_llm::MockProvider;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schema() -> OutputModelList {
    build_output_model(&ContentFieldSpec::text_default())
}

fn fast_browser() -> BrowserSettings {
    BrowserSettings {
        min_page_load_secs: 0.0,
        ..Default::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

// --- HttpBrowserDriver ---

#[tokio::test]
async fn test_driver_navigates_and_follows_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(html(
            r#"<html><head><title>Film list</title></head>
               <body><p>Our catalogue of classic films.</p><a href="/detail">Details</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/detail"))
        .respond_with(html("<html><head><title>Detail</title></head><body><p>Released 1972.</p></body></html>"))
        .mount(&server)
        .await;

    let driver = HttpBrowserDriver::new(&fast_browser()).unwrap();
    let page = driver.navigate(&format!("{}/list", server.uri())).await.unwrap();

    assert_eq!(page.title, "Film list");
    assert!(page.text.contains("Our catalogue of classic films."));
    assert_eq!(page.links.len(), 1);
    assert_eq!(page.links[0].href, format!("{}/detail", server.uri()));

    let detail = driver.click(0).await.unwrap();
    assert_eq!(detail.title, "Detail");
    assert!(detail.text.contains("Released 1972."));
    assert_eq!(driver.page().await.unwrap(), detail);
}

#[tokio::test]
async fn test_driver_scroll_moves_the_text_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<p>Some reasonably long paragraph of page text.</p>"))
        .mount(&server)
        .await;

    let driver = HttpBrowserDriver::new(&fast_browser()).unwrap();
    let top = driver.navigate(&server.uri()).await.unwrap();

    let down = driver.scroll(ScrollDirection::Down, 5).await.unwrap();
    assert_eq!(top.text.chars().count() - down.text.chars().count(), 5);

    let up = driver.scroll(ScrollDirection::Up, 100).await.unwrap();
    assert_eq!(up.text, top.text);
}

#[tokio::test]
async fn test_driver_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let driver = HttpBrowserDriver::new(&fast_browser()).unwrap();
    let err = driver.navigate(&server.uri()).await.unwrap_err();
    assert!(matches!(err, EngineError::Http(_)));
}

#[tokio::test]
async fn test_driver_downloads_relative_to_the_current_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/index"))
        .respond_with(html(r#"<a href="report.pdf">Annual report</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("downloads");
    let driver = HttpBrowserDriver::new(&fast_browser()).unwrap();
    driver.navigate(&format!("{}/docs/index", server.uri())).await.unwrap();

    let first = driver.download("report.pdf", &downloads).await.unwrap();
    assert_eq!(first, downloads.join("report.pdf"));
    assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1.4 body");

    let second = driver.download("report.pdf", &downloads).await.unwrap();
    assert_eq!(second, downloads.join("1-report.pdf"));

    let missing = driver.download("missing.pdf", &downloads).await;
    assert!(matches!(missing, Err(EngineError::Http(_))));
}

// --- ProxyAgent ---

fn unlocker(server: &MockServer) -> UnlockerClient {
    UnlockerClient::new(format!("{}/request", server.uri()), "unlocker", "tok", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_proxy_agent_fetches_through_unlocker() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request"))
        .and(header("authorization", "Bearer tok"))
        .and(body_partial_json(serde_json::json!({
            "zone": "unlocker",
            "url": "https://shop.example/item",
            "format": "raw"
        })))
        .respond_with(html("<h1>Price</h1><p>Only ten dollars today</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let llm = Arc::new(MockProvider::new(r#"{"text": "$10"}"#));
    let agent = ProxyAgent::new(unlocker(&server), llm.clone(), 50_000);
    let ctx = RunContext::new()
        .with_url("https://shop.example/item")
        .with_prompt("price")
        .with_additional_context("currency: USD");

    let answer = agent.run(&Task::new("Find the price", "default"), &schema(), &ctx).await;

    assert_eq!(answer.as_deref(), Some(r#"{"text": "$10"}"#));
    let prompt = &llm.prompts()[0];
    assert!(prompt.starts_with("You are a web scraping agent."));
    assert!(prompt.contains("URL: https://shop.example/item\nPrompt: price\nAdditional content: currency: USD"));
    assert!(prompt.contains("TextContentOutputList"));
    assert!(prompt.contains("Only ten dollars today"));
}

#[tokio::test]
async fn test_proxy_agent_logs_the_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request"))
        .respond_with(html("<p>Only ten dollars today</p>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(MockProvider::new(r#"{"text": "$10"}"#));
    let agent = ProxyAgent::new(unlocker(&server), llm, 50_000);
    let ctx = RunContext::new()
        .with_url("https://shop.example/item")
        .with_results_dir(dir.path());

    agent.run(&Task::new("Find the price", "default"), &schema(), &ctx).await;

    let logs = dir.path().join("mcp_logs");
    let read = |name: &str| -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(logs.join(name)).unwrap()).unwrap()
    };
    let view = read("json_view.json");
    assert_eq!(view["content"], r#"{"text": "$10"}"#);
    assert_eq!(view["tool_calls"][0]["args"]["url"], "https://shop.example/item");
    assert_eq!(view["tool_calls"][0]["args"]["zone"], "unlocker");

    let messages = read("print_version.json");
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].as_str().unwrap().starts_with("System: You are a web scraping agent."));
    assert!(messages[1].as_str().unwrap().contains("Only ten dollars today"));
    assert_eq!(messages[2], r#"AI: {"text": "$10"}"#);
}

#[tokio::test]
async fn test_proxy_agent_unlocker_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("zone disabled"))
        .mount(&server)
        .await;

    let llm = Arc::new(MockProvider::default());
    let agent = ProxyAgent::new(unlocker(&server), llm.clone(), 50_000);
    let ctx = RunContext::new().with_url("https://shop.example/item");

    let err = agent
        .extract(&Task::new("t", "default"), &schema(), &ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("zone disabled"));
    assert_eq!(agent.run(&Task::new("t", "default"), &schema(), &ctx).await, None);
    assert_eq!(llm.call_count(), 0);

    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx.with_results_dir(dir.path());
    assert_eq!(agent.run(&Task::new("t", "default"), &schema(), &ctx).await, None);
    assert!(!dir.path().join("mcp_logs").exists());
}

// --- PdfAgent ---

fn write_doc(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn test_pdf_agent_repairs_invalid_json_once() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_doc(&dir, "report.md", "Revenue grew twelve percent.");
    let results = dir.path().join("results");

    let llm = Arc::new(
        MockProvider::default().with_sequence(["```json\n{'text': 'twelve'}\n```", r#"{"text": "twelve"}"#]),
    );
    let agent = PdfAgent::new(llm.clone(), PdfSettings::default());
    let ctx = RunContext::new().with_files([doc]).with_prompt("revenue").with_results_dir(&results);

    let answer = agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await;

    assert_eq!(answer.as_deref(), Some(r#"{"text": "twelve"}"#));
    assert_eq!(llm.call_count(), 2);
    assert!(llm.prompts()[1].contains("{'text': 'twelve'}"));

    let logs: Vec<_> = std::fs::read_dir(results.join("pdf_logs")).unwrap().collect();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn test_pdf_agent_without_repair_returns_text_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_doc(&dir, "report.txt", "Revenue grew twelve percent.");

    let llm = Arc::new(MockProvider::new("Revenue grew twelve percent."));
    let settings = PdfSettings {
        repair_json: false,
        ..Default::default()
    };
    let agent = PdfAgent::new(llm.clone(), settings);
    let ctx = RunContext::new().with_files([doc]);

    let answer = agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await;
    assert_eq!(answer.as_deref(), Some("Revenue grew twelve percent."));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_pdf_agent_sends_only_the_best_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_doc(
        &dir,
        "notes.txt",
        "Revenue grew twelve percent.\n\nThe office cat is named Milo.\n\nHeadcount stayed flat.",
    );

    let llm = Arc::new(MockProvider::new(r#"{"text": "12%"}"#));
    let settings = PdfSettings {
        chunk_size: 40,
        chunk_overlap: 0,
        chunk_strategy: ChunkStrategy::ByParagraph,
        top_k: 1,
        repair_json: true,
    };
    let agent = PdfAgent::new(llm.clone(), settings);
    let ctx = RunContext::new().with_files([doc]).with_prompt("revenue percent");

    agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await;

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("Revenue grew twelve percent."));
    assert!(!prompt.contains("Milo"));
}

#[tokio::test]
async fn test_pdf_agent_skips_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_doc(&dir, "a.txt", "Revenue grew twelve percent.");

    let llm = Arc::new(MockProvider::new(r#"{"text": "12%"}"#));
    let agent = PdfAgent::new(llm.clone(), PdfSettings::default());

    let ctx = RunContext::new().with_files([dir.path().join("missing.pdf"), good]);
    let answer = agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await;
    assert!(answer.is_some());

    let ctx = RunContext::new().with_files([dir.path().join("missing.pdf")]);
    assert_eq!(agent.run(&Task::new("t", "pdf_default"), &schema(), &ctx).await, None);
    assert_eq!(llm.call_count(), 1);
}
