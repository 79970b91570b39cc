//! Accord compiles consumer-driven contracts.
//!
//! A contract describes one HTTP interaction (or one messaging exchange)
//! with values that may differ between the client and the server side. From
//! it the compiler produces:
//!
//! - a WireMock stub mapping for the client side ([`stub::StubMapping`])
//! - test assertions for the server side ([`assertions::TestAssertion`])
//! - a serve-time matcher and renderer ([`serve::StubSet`])
//!
//! ```no_run
//! use accord_core::compile::Compiler;
//! use accord_core::contract::{Contract, Request, Response};
//! use accord_core::pattern::NamedPattern;
//! use accord_core::stub::StubMapping;
//!
//! let contract = Contract::http(
//!     "get_user",
//!     Request::new("GET")?.url(Request::any_matching("/users/[0-9]+")?)?,
//!     Response::ok().header("X-Id", Response::any(NamedPattern::Uuid))?,
//! );
//! let compiler = Compiler::default();
//! let compiled = compiler.compile(&contract)?;
//! let stub = StubMapping::from_compiled(&compiled, compiler.config())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assertions;
pub mod compile;
pub mod config;
pub mod contract;
pub mod error;
pub mod loader;
pub mod matching;
pub mod pattern;
pub mod serve;
pub mod stub;
pub mod value;

pub use compile::{CompiledContract, Compiler};
pub use config::CompilerConfig;
pub use contract::Contract;
pub use error::{CompileError, ContractError};
