//! Minimal W3C WebDriver client (chromedriver, geckodriver, Selenium grid).

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{Browser, ElementRef, Locator};
use crate::error::ScrapeError;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub struct WebDriverSession {
    client: Client,
    base: String,
    session_id: String,
}

impl WebDriverSession {
    /// Start a new Chrome session on the WebDriver server at `endpoint`.
    pub async fn connect(endpoint: &str, headless: bool) -> Result<Self, ScrapeError> {
        let client = Client::new();
        let base = endpoint.trim_end_matches('/').to_string();

        let mut args = vec!["--window-size=1366,900"];
        if headless {
            args.push("--headless=new");
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", base), Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::Browser {
                command: "new session".into(),
                message: format!("no sessionId in response: {}", value),
            })?
            .to_string();

        info!("WebDriver session {} started on {}", session_id, base);
        Ok(WebDriverSession {
            client,
            base,
            session_id,
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ScrapeError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        send(&self.client, method, &url, body).await
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, ScrapeError> {
    debug!("webdriver {} {}", method, url);
    let mut req = client.request(method.clone(), url);
    if let Some(b) = body {
        req = req.json(&b);
    }
    let resp = req.send().await.map_err(|e| ScrapeError::network(url, e))?;
    let status = resp.status();
    let payload: Value = resp.json().await.map_err(|e| ScrapeError::network(url, e))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value.get("error").and_then(|e| e.as_str()).unwrap_or("unknown error");
    let message = value.get("message").and_then(|m| m.as_str()).unwrap_or("");
    match error {
        "no such element" | "stale element reference" => {
            Err(ScrapeError::ElementNotFound(message.to_string()))
        }
        _ => Err(ScrapeError::Browser {
            command: format!("{} {}", method, url),
            message: format!("{} ({}): {}", error, status, message),
        }),
    }
}

fn element_ids(value: &Value) -> Vec<ElementRef> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(|id| id.as_str()))
                .map(|id| ElementRef(id.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, ScrapeError> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "xpath", "value": locator.as_str() })),
            )
            .await?;
        Ok(element_ids(&value))
    }

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn property(&self, element: &ElementRef, name: &str) -> Result<Option<String>, ScrapeError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/property/{}", element.0, name), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError> {
        self.command(Method::POST, &format!("/element/{}/click", element.0), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), ScrapeError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": "window.scrollTo(arguments[0], arguments[1]);", "args": [x, y] })),
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}
