//! Order reconciliation services.
//!
//! # Services
//!
//! - `tracking` - Carrier and tracking number extraction, tracking URLs
//! - `normalize` - WooCommerce resources to local records
//! - `webhook` - Signed webhook verification and dispatch
//! - `backfill` - One-time historical order import per customer
//! - `lookup` - User and order lookup by email
//! - `account` - Signup and login bookkeeping
//! - `rate_limit` - Per-email sliding window for backfills

pub mod account;
pub mod backfill;
pub mod lookup;
pub mod normalize;
pub mod rate_limit;
pub mod tracking;
pub mod webhook;

pub use account::{AccountError, AccountService};
pub use backfill::{BackfillError, BackfillRequest, BackfillResult, BackfillService};
pub use lookup::{CustomerOrders, LookupError, LookupService};
pub use rate_limit::{BackfillRateLimiter, RateDecision, SlidingWindowLimiter};
pub use webhook::{WebhookError, WebhookOutcome, WebhookService};
