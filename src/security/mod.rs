//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-address fixed window)
//!     → url_guard.rs (scheme, loopback names, literal addresses)
//!     → dns_guard.rs (resolve, reject disallowed addresses)
//!     → pinning.rs (upstream client connects only to screened addresses)
//! ```
//!
//! # Design Decisions
//! - One disallowed-address predicate (address.rs) behind every check
//! - Fail closed: any resolved disallowed address rejects the whole host
//! - No trust in client input, including redirect targets

pub mod address;
pub mod dns_guard;
pub mod pinning;
pub mod rate_limit;
pub mod url_guard;

pub use address::is_disallowed_ip;
pub use dns_guard::{DnsGuard, GuardError};
pub use rate_limit::RateLimiter;
pub use url_guard::{validate_target, ValidationError};
