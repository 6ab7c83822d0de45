//! # imagevault
//!
//! Fetch an image from an untrusted URL and hand it back as a flat buffer of
//! raw RGB pixels, small enough to fit a caller-chosen pixel budget.
//!
//! # Architecture: One Pipeline Per Request
//!
//! ```text
//! URL ─▶ candidates ─▶ probe ─▶ bounded stream ─▶ decode ─▶ resize ─▶ raw RGB
//!        (fetch)       (fetch)  (fetch, retry)    (imaging) (imaging)  (raw)
//! ```
//!
//! Every request runs the pipeline from scratch. The only thing shared between
//! requests is the connection pool ([`fetch::HttpPool`]), built once at
//! startup and passed in explicitly. Nothing is cached between requests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Parse and validate a render request; option coercion |
//! | [`fetch`] | Candidate fallback, probe, bounded streaming transfer, retries |
//! | [`imaging`] | Decode to RGB8, two-stage resize plan, `image`-crate backend |
//! | [`raw`] | Raw row-major RGB output and its base64 form |
//! | [`render`] | The pipeline itself and its error taxonomy |
//! | [`server`] | axum routes: `POST /render`, `GET /health` |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI summary of a one-shot render |
//!
//! # Design Decisions
//!
//! ## The Byte Ceiling Is Enforced While Streaming
//!
//! Headers are hints. A probe or a `Content-Length` above the ceiling rejects
//! a candidate early, but the real guarantee comes from counting body bytes as
//! they arrive and aborting the transfer the moment the count passes
//! `fetch.max_bytes`. Decompression is disabled in the client so the count is
//! of wire bytes. Together with the decoder's allocation limit this bounds
//! the memory and CPU one request can cost.
//!
//! ## Candidates Are Sequential
//!
//! The original URL, then its `http`/`https` twin, then the URL without its
//! query string. They are never raced: the first success wins, and when all
//! of them fail the error lists each one with its reason, in order.
//!
//! ## Typed Failures, Two Status Classes
//!
//! Each stage has its own error type. [`render::RenderError`] gathers them and
//! maps each to a client error (bad input, unreachable or unusable source) or
//! a server error (resize, encode, worker failure).
//!
//! ## Alpha Is Dropped
//!
//! Output is always three channels. Transparent pixels keep whatever color
//! they carried; nothing is composited against a background.

pub mod config;
pub mod fetch;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod raw;
pub mod render;
pub mod request;
pub mod server;

#[cfg(test)]
pub(crate) mod test_helpers;
