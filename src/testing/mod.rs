//! Testing utilities for bookgate
//!
//! - Alba-style HTTP endpoint testing without running a server
//! - Booking form fixtures
//! - A test app wired to an in-memory store and a controllable clock
//!
//! ```rust,ignore
//! use bookgate::testing::{self, TestApp};
//!
//! #[tokio::test]
//! async fn test_services() {
//!     let app = TestApp::new().router();
//!
//!     testing::get(app, "/api/services")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_json();
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{AppointmentRequestBuilder, TestApp, fake};
pub use scenario::{Scenario, ScenarioAssert, get, post};
