//! A set of compiled stubs answering requests.

use crate::compile::{CompiledContract, CompiledHttp};
use crate::serve::{render_response, request_matches, ServedRequest, ServedResponse};
use crate::stub::ScenarioStep;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Priority used for stubs that declare none. Lower numbers win.
pub const DEFAULT_PRIORITY: u32 = 5;

struct Stub {
    name: String,
    priority: u32,
    scenario: Option<ScenarioStep>,
    http: CompiledHttp,
}

/// Compiled HTTP contracts in insertion order, plus scenario state.
///
/// The best match is the stub with the lowest priority number whose
/// matchers and scenario state accept the request; among equals the one
/// added last wins.
pub struct StubSet {
    stubs: RwLock<Vec<Stub>>,
    /// Current state per scenario name
    scenarios: RwLock<HashMap<String, String>>,
    rng: Mutex<StdRng>,
    request_count: AtomicU64,
}

impl Default for StubSet {
    fn default() -> Self {
        Self::new(0)
    }
}

impl StubSet {
    pub fn new(seed: u64) -> Self {
        Self {
            stubs: RwLock::new(Vec::new()),
            scenarios: RwLock::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            request_count: AtomicU64::new(0),
        }
    }

    /// Add a compiled contract. Returns false for ignored and messaging-only
    /// contracts, which serve nothing.
    pub fn add(&self, contract: &CompiledContract) -> bool {
        let Some(http) = contract.http.as_ref().filter(|_| !contract.ignored) else {
            debug!(contract = %contract.name, "not served");
            return false;
        };
        self.stubs.write().push(Stub {
            name: contract.name.clone(),
            priority: contract.priority.unwrap_or(DEFAULT_PRIORITY),
            scenario: contract.scenario.clone(),
            http: http.clone(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.stubs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.read().is_empty()
    }

    pub fn scenario_state(&self, scenario: &str) -> String {
        self.scenarios
            .read()
            .get(scenario)
            .cloned()
            .unwrap_or_else(|| "Started".to_string())
    }

    pub fn reset_scenarios(&self) {
        self.scenarios.write().clear();
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Name of the stub that would answer `request`, without side effects.
    pub fn find_match(&self, request: &ServedRequest) -> Option<String> {
        let stubs = self.stubs.read();
        self.best(&stubs, request).map(|index| stubs[index].name.clone())
    }

    fn best(&self, stubs: &[Stub], request: &ServedRequest) -> Option<usize> {
        let scenarios = self.scenarios.read();
        stubs
            .iter()
            .enumerate()
            .filter(|(_, stub)| {
                stub.scenario.as_ref().is_none_or(|step| {
                    let current = scenarios
                        .get(&step.scenario_name())
                        .map(String::as_str)
                        .unwrap_or("Started");
                    current == step.required_state()
                })
            })
            .filter(|(_, stub)| request_matches(&stub.http.request, request))
            .min_by(|(a_index, a), (b_index, b)| {
                a.priority.cmp(&b.priority).then(b_index.cmp(a_index))
            })
            .map(|(index, _)| index)
    }

    /// Answer a request: pick the best stub, advance its scenario and render
    /// its response. `None` when nothing matches.
    pub fn respond(&self, request: &ServedRequest) -> Option<ServedResponse> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let stubs = self.stubs.read();
        let Some(index) = self.best(&stubs, request) else {
            info!(method = %request.method, url = %request.url(), "no stub matched");
            return None;
        };
        let stub = &stubs[index];
        debug!(stub = %stub.name, "stub matched");

        if let Some(step) = &stub.scenario {
            if let Some(next) = step.new_state() {
                self.scenarios.write().insert(step.scenario_name(), next);
            }
        }

        let mut rng = self.rng.lock();
        Some(render_response(&stub.http.response, request, &mut *rng))
    }
}
