//! Serve-time runtime.
//!
//! Matches concrete requests against compiled contracts and renders their
//! responses, resolving request references and sampling delays. There is no
//! network layer here: callers hand in a [`ServedRequest`] and write out the
//! [`ServedResponse`] themselves.

mod matcher;
mod render;
mod request;
mod stubs;

pub use matcher::request_matches;
pub use render::{render_response, render_value, ServedResponse};
pub use request::{parse_query_string, ServedRequest};
pub use stubs::{StubSet, DEFAULT_PRIORITY};
