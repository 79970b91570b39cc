//! Two-sided contract values.
//!
//! - `dual`: the `(client, server)` pair and the side-tagging combinator
//! - `leaf`: the closed set of leaf kinds and request references
//! - `node`: body trees made of leaves
//! - `sides`: roles and the cross-side validation rules

mod dual;
mod leaf;
mod node;
mod sides;

pub use dual::{client, server, value, DualValue, Side, Tagged};
pub use leaf::{text_of, Fragment, Leaf, RequestRef};
pub use node::Node;
pub use sides::{assert_sides_match, check_placement, Role};
