//! Stub overrides carried in contract metadata under `wiremock.stubMapping`.

use crate::error::ContractError;
use crate::stub::StubMapping;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Typed view of `metadata.wiremock.stubMapping`.
///
/// Scalar fields replace the synthesized ones. `request` and `response`
/// objects are merged key by key into the synthesized parts, nested objects
/// recursively. Applying the same overrides twice gives the same mapping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubOverrides {
    pub name: Option<String>,
    pub priority: Option<u32>,
    pub scenario_name: Option<String>,
    pub required_scenario_state: Option<String>,
    pub new_scenario_state: Option<String>,
    #[serde(default)]
    pub request: Map<String, Value>,
    #[serde(default)]
    pub response: Map<String, Value>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

impl StubOverrides {
    /// Read overrides from contract metadata. The value may be an object or
    /// a string holding JSON.
    pub fn from_metadata(metadata: &IndexMap<String, Value>) -> Result<Option<Self>, ContractError> {
        let Some(raw) = metadata.get("wiremock").and_then(|w| w.get("stubMapping")) else {
            return Ok(None);
        };
        let invalid =
            |e: serde_json::Error| ContractError::InvalidDocument(format!("wiremock.stubMapping: {e}"));
        let overrides = match raw {
            Value::String(text) => serde_json::from_str(text).map_err(invalid)?,
            other => serde_json::from_value(other.clone()).map_err(invalid)?,
        };
        Ok(Some(overrides))
    }

    pub fn apply(&self, mapping: &mut StubMapping) -> Result<(), ContractError> {
        if let Some(name) = &self.name {
            mapping.name = Some(name.clone());
        }
        if let Some(priority) = self.priority {
            mapping.priority = Some(priority);
        }
        if let Some(scenario) = &self.scenario_name {
            mapping.scenario_name = Some(scenario.clone());
        }
        if let Some(state) = &self.required_scenario_state {
            mapping.required_scenario_state = Some(state.clone());
        }
        if let Some(state) = &self.new_scenario_state {
            mapping.new_scenario_state = Some(state.clone());
        }
        if !self.request.is_empty() {
            mapping.request = merged(&mapping.request, &self.request)?;
        }
        if !self.response.is_empty() {
            mapping.response = merged(&mapping.response, &self.response)?;
            // A response carries one kind of delay.
            let sets = |key: &str| self.response.get(key).is_some_and(|value| !value.is_null());
            if sets("delayDistribution") && !sets("fixedDelayMilliseconds") {
                mapping.response.fixed_delay_milliseconds = None;
            }
            if sets("fixedDelayMilliseconds") && !sets("delayDistribution") {
                mapping.response.delay_distribution = None;
            }
        }
        for (key, value) in &self.metadata {
            mapping.metadata.insert(key.clone(), value.clone());
        }
        debug!(stub = ?mapping.name, "applied stub overrides");
        Ok(())
    }
}

fn merged<T>(base: &T, overrides: &Map<String, Value>) -> Result<T, ContractError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let invalid = |e: serde_json::Error| ContractError::InvalidDocument(format!("wiremock.stubMapping: {e}"));
    let mut value = serde_json::to_value(base).map_err(invalid)?;
    merge_into(&mut value, overrides);
    serde_json::from_value(value).map_err(invalid)
}

fn merge_into(target: &mut Value, overrides: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(overrides.clone());
        return;
    }
    let Value::Object(fields) = target else {
        return;
    };
    for (key, value) in overrides {
        match (fields.get_mut(key), value) {
            (Some(existing), Value::Object(nested)) if existing.is_object() => {
                merge_into(existing, nested)
            }
            _ => {
                fields.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::Delay;
    use serde_json::json;

    #[test]
    fn test_from_metadata_string_and_map() {
        let mut metadata = IndexMap::new();
        metadata.insert(
            "wiremock".to_string(),
            json!({"stubMapping": "{\"priority\": 3}"}),
        );
        let overrides = StubOverrides::from_metadata(&metadata).unwrap().unwrap();
        assert_eq!(overrides.priority, Some(3));

        metadata.insert(
            "wiremock".to_string(),
            json!({"stubMapping": {"response": {"fixedDelayMilliseconds": 5}}}),
        );
        let overrides = StubOverrides::from_metadata(&metadata).unwrap().unwrap();
        assert_eq!(overrides.response.get("fixedDelayMilliseconds"), Some(&json!(5)));
    }

    #[test]
    fn test_missing_overrides() {
        assert_eq!(StubOverrides::from_metadata(&IndexMap::new()).unwrap(), None);
    }

    #[test]
    fn test_delay_override_replaces_the_other_kind() {
        let mut mapping = StubMapping::default();
        mapping.response.fixed_delay_milliseconds = Some(200);
        let overrides: StubOverrides = serde_json::from_value(json!({
            "response": {"delayDistribution": {"type": "uniform", "lower": 10, "upper": 20}}
        }))
        .unwrap();
        overrides.apply(&mut mapping).unwrap();
        assert_eq!(mapping.response.fixed_delay_milliseconds, None);
        assert_eq!(
            mapping.response.delay_distribution,
            Some(Delay::Uniform { lower: 10, upper: 20 })
        );

        let overrides: StubOverrides =
            serde_json::from_value(json!({"response": {"fixedDelayMilliseconds": 50}})).unwrap();
        overrides.apply(&mut mapping).unwrap();
        assert_eq!(mapping.response.fixed_delay_milliseconds, Some(50));
        assert_eq!(mapping.response.delay_distribution, None);
    }

    #[test]
    fn test_merge_is_recursive() {
        let mut target = json!({"headers": {"A": "1"}, "status": 200});
        let overrides = json!({"headers": {"B": "2"}, "status": 201});
        merge_into(&mut target, overrides.as_object().unwrap());
        assert_eq!(target, json!({"headers": {"A": "1", "B": "2"}, "status": 201}));
    }
}
