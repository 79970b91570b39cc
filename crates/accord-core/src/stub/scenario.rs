use serde::{Deserialize, Serialize};

/// Position of a contract inside an ordered group.
///
/// Steps of one group share a scenario; each step requires the state the
/// previous one left behind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub group: String,
    pub order: u32,
    /// Number of ordered contracts in the group
    pub size: u32,
}

impl ScenarioStep {
    pub fn new(group: impl Into<String>, order: u32, size: u32) -> Self {
        Self {
            group: group.into(),
            order,
            size,
        }
    }

    pub fn scenario_name(&self) -> String {
        format!("Scenario_{}", self.group)
    }

    pub fn required_state(&self) -> String {
        if self.order == 0 {
            "Started".to_string()
        } else {
            format!("Step{}", self.order)
        }
    }

    /// `None` for the last step.
    pub fn new_state(&self) -> Option<String> {
        (self.order + 1 < self.size).then(|| format!("Step{}", self.order + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_step_scenario() {
        let steps: Vec<ScenarioStep> = (0..3).map(|order| ScenarioStep::new("orders", order, 3)).collect();
        assert_eq!(steps[0].scenario_name(), "Scenario_orders");
        assert_eq!(steps[0].required_state(), "Started");
        assert_eq!(steps[0].new_state().as_deref(), Some("Step1"));
        assert_eq!(steps[1].required_state(), "Step1");
        assert_eq!(steps[1].new_state().as_deref(), Some("Step2"));
        assert_eq!(steps[2].required_state(), "Step2");
        assert_eq!(steps[2].new_state(), None);
    }
}
