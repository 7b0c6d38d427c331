//! HTTP client for end-to-end tests, one method per route.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    /// Redirects are not followed so the OAuth callback can be inspected.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn home(&self) -> Response {
        self.client.get(self.url("/")).send().await.unwrap()
    }

    pub async fn questions(&self) -> Response {
        self.client.get(self.url("/questions")).send().await.unwrap()
    }

    pub async fn login(&self) -> Response {
        self.client.get(self.url("/login")).send().await.unwrap()
    }

    /// Starts a login and returns the `state` embedded in the authorize URL.
    pub async fn login_state(&self) -> String {
        let body: Value = self.login().await.json().await.unwrap();
        let auth_url = reqwest::Url::parse(body["auth_url"].as_str().unwrap()).unwrap();
        auth_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("authorize url without state")
    }

    pub async fn callback(&self, params: &[(&str, &str)]) -> Response {
        self.client
            .get(self.url("/callback"))
            .query(params)
            .send()
            .await
            .unwrap()
    }

    /// Runs the whole OAuth round trip for the stub user.
    pub async fn sign_in(&self) -> Response {
        let state = self.login_state().await;
        self.callback(&[("code", GOOD_CODE), ("state", &state)]).await
    }

    pub async fn generate(&self, body: Value) -> Response {
        self.client
            .post(self.url("/generate"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// A generation with a full answer set and the stub user's email.
    pub async fn generate_for_user(&self) -> Response {
        self.generate(json!({
            "token": ACCESS_TOKEN,
            "email": TEST_EMAIL,
            "language": "en",
            "answers": {
                "genre": "Indie / Alternative",
                "era": "2000s",
                "mood": "Melancholic",
                "energy": 7,
                "positivity": 3
            }
        }))
        .await
    }

    pub async fn export(&self, body: Value) -> Response {
        self.client
            .post(self.url("/export"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn last_vibe(&self, email: &str) -> Response {
        self.client
            .get(self.url("/last-vibe"))
            .query(&[("email", email)])
            .send()
            .await
            .unwrap()
    }

    pub async fn history(&self, email: &str) -> Response {
        self.client
            .get(self.url("/get-history"))
            .query(&[("email", email)])
            .send()
            .await
            .unwrap()
    }

    pub async fn stats(&self, email: &str) -> Response {
        self.client
            .get(self.url("/stats"))
            .query(&[("email", email)])
            .send()
            .await
            .unwrap()
    }
}
