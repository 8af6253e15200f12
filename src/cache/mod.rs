//! Generic request cache for async data fetching.
//!
//! This module provides a domain-agnostic query cache, inspired by TanStack
//! Query, that:
//! - Keys entries by structurally comparable tuples (`QueryKey`)
//! - Serves fresh data without touching the network
//! - Refreshes stale data in the background while still serving it
//! - Collapses concurrent requests for the same key into one fetch
//! - Retries failed fetches according to an explicit `RetryPolicy`

mod key;
mod layer;
mod result;
mod retry;

pub use key::{KeyPart, QueryKey};
pub use layer::{InFlight, QueryCache, QueryOptions};
pub use result::{QueryError, QueryResult, QueryStatus};
pub use retry::RetryPolicy;
