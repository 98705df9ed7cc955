//! Caption-assist gateway.
//!
//! Three stateless operations (`select-template`, `generate-captions`,
//! `refine-caption`) that proxy a multimodal chat-completion service and
//! hand back strictly shaped JSON. [`ops::Gateway`] is the library API;
//! [`server`] exposes it over HTTP.

/// The three gateway operations over an [`upstream::Upstream`].
pub mod ops;
pub mod server;
pub mod types;
pub mod upstream;

#[cfg(test)]
#[path = "../../tests/unit/gateway/fake.rs"]
pub(crate) mod fake;
