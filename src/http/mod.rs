pub mod client;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::{Client, CookieJar, Transport};
pub use request::ResolvedRequest;
pub use response::{Outcome, TransportError};
pub use types::{Directive, DirectiveValue, IpResolve, Method, ResolveEntry};
