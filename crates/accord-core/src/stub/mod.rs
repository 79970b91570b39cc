//! Stub generation.
//!
//! Compiled HTTP contracts become WireMock stub mappings; messaging
//! contracts become message stubs. Scenario state, response delays and
//! metadata overrides are applied on the way out.

mod delay;
mod message;
mod overrides;
mod scenario;
mod wiremock;

pub use delay::Delay;
pub use message::{IncomingMessage, MessageStub, OutgoingMessage};
pub use overrides::StubOverrides;
pub use scenario::ScenarioStep;
pub use wiremock::{comparison_json, handlebars, RequestPattern, ResponseDefinition, StubMapping};
