//! # desk-api
//!
//! HTTP API layer for charge-desk-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server with session-based operator auth
//! - REST endpoints for profiles, charges, and payment links
//! - OAuth onboarding redirect/callback pair
//! - Store persistence backends (process env, hosted env API)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/login` | Operator login |
//! | POST | `/api/v1/logout` | Drop session |
//! | GET | `/api/v1/profiles` | List profiles (masked) |
//! | POST | `/api/v1/profiles` | Create profile |
//! | PUT | `/api/v1/profiles/{id}` | Update profile |
//! | DELETE | `/api/v1/profiles/{id}` | Delete profile |
//! | POST | `/api/v1/profiles/{id}/activate` | Switch active profile |
//! | GET | `/api/v1/transactions` | Active profile's log |
//! | POST | `/api/v1/charge` | Manual card payment |
//! | POST | `/api/v1/links` | Create payment link |
//! | GET | `/oauth/authorize` | Redirect to Square consent |
//! | GET | `/oauth/callback` | OAuth code exchange |

pub mod handlers;
pub mod persist;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
