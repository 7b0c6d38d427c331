//! Constants shared by the end-to-end tests.

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

pub const FRONTEND_URL: &str = "http://localhost:3030";

/// Authorization code the stub platform accepts.
pub const GOOD_CODE: &str = "good-code";
/// Token the stub platform hands out for [`GOOD_CODE`].
pub const ACCESS_TOKEN: &str = "access-token-1";

pub const TEST_EMAIL: &str = "listener@example.com";
pub const TEST_SPOTIFY_ID: &str = "listener-42";

pub const STUB_MODELS: [&str; 2] = ["stub-model-a", "stub-model-b"];
