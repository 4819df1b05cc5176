//! linkpeek preview service: turns an arbitrary URL into safe, renderable
//! HTML plus a display title.
//!
//! # Pipeline
//!
//! - **Validate**: absolute `http`/`https` URLs only, private hosts refused
//! - **Fetch**: one GET with a hard timeout and a body ceiling (reqwest)
//! - **Sanitize**: strip active content and absolutise resource URLs (kuchiki)
//! - **Filter**: independent allow-list pass over the result (ammonia)
//!
//! # Routes
//!
//! ```text
//! POST /api/preview   { "url": "https://..." }
//! GET  /health
//! ```
//!
//! The service is stateless: nothing is cached and identical concurrent
//! requests are fetched independently.

pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod routes;
pub mod sanitize;
pub mod service;
pub mod state;
pub mod title;

pub use config::Config;
pub use error::PreviewError;
pub use routes::router;
pub use service::PreviewService;
pub use state::AppState;
