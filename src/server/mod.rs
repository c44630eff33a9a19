//! # Server Module
//!
//! The per-call envelope exchanged with the hosting transport: an immutable
//! [`Request`] and a mutable [`Response`] accumulator, with conversions from
//! and to the `http` crate types.

pub mod request;
pub mod response;

pub use request::{parse_cookies, Request, RequestBuilder};
pub use response::{content_type, Cookie, HeaderVec, Response, ScriptContainer, SerializedResponse};
