//! Matching vocabulary shared by contracts and compiled stubs.
//!
//! - `strategy`: explicit comparisons (`equalTo`, `contains`, `absent`, ...)
//! - `body_matchers`: JSONPath/XPath addressed overrides
//! - `content_type`: header and body based content type detection

mod body_matchers;
mod content_type;
mod strategy;

pub use body_matchers::{
    by_command, by_date, by_equality, by_null, by_regex, by_time, by_timestamp, by_type,
    by_type_within, BodyMatcher, BodyMatchers, MatchingType, MatchingTypeValue, PathKind,
};
pub use content_type::ContentType;
pub use strategy::{MatchingStrategy, StrategyType};
