//! Shared harness for the end-to-end tests.
//!
//! Tests only import from this module.

#![allow(dead_code, unused_imports)]

mod client;
mod constants;
mod server;
mod stubs;

pub use client::TestClient;
pub use constants::*;
pub use server::{TestServer, TestSetup};
pub use stubs::{llm_reply, SearchBehavior, StubLlm, StubPlatform};
