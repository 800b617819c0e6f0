use std::time::Duration;

/// Default wall-clock budget for one evaluation pass.
pub const DEFAULT_EVAL_BUDGET: Duration = Duration::from_secs(5);

/// Ports webhooks may never target, regardless of host.
pub const DEFAULT_BLOCKED_PORTS: &[u16] = &[22, 23, 25, 3306, 5432, 6379, 9200, 11211];

/// Engine configuration for evaluation limits and webhook dispatch
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock budget for one evaluation; on expiry the orchestrator
    /// fails open to the default redirect
    pub eval_budget: Duration,

    /// Capacity of the webhook dispatch queue; submissions beyond this
    /// are dropped (and logged), never blocked on
    pub webhook_queue_capacity: usize,

    /// Ports the webhook safety filter rejects
    pub blocked_webhook_ports: Vec<u16>,

    /// Maximum conditions a single rule may carry (authoring limit)
    pub max_conditions_per_rule: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eval_budget: DEFAULT_EVAL_BUDGET,
            webhook_queue_capacity: 256,
            blocked_webhook_ports: DEFAULT_BLOCKED_PORTS.to_vec(),
            max_conditions_per_rule: 5,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the evaluation time budget
    pub fn with_eval_budget(mut self, budget: Duration) -> Self {
        self.eval_budget = budget;
        self
    }

    /// Set the webhook queue capacity
    pub fn with_webhook_queue_capacity(mut self, capacity: usize) -> Self {
        self.webhook_queue_capacity = capacity;
        self
    }

    /// Replace the blocked webhook port list
    pub fn with_blocked_webhook_ports(mut self, ports: Vec<u16>) -> Self {
        self.blocked_webhook_ports = ports;
        self
    }

    /// Set the per-rule condition limit
    pub fn with_max_conditions_per_rule(mut self, max: usize) -> Self {
        self.max_conditions_per_rule = max;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.eval_budget.is_zero() {
            return Err("eval_budget must be greater than zero".to_string());
        }

        if self.webhook_queue_capacity == 0 {
            return Err("webhook_queue_capacity must be greater than 0".to_string());
        }

        if self.max_conditions_per_rule == 0 {
            return Err("max_conditions_per_rule must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.eval_budget, Duration::from_secs(5));
        assert_eq!(config.max_conditions_per_rule, 5);
    }

    #[test]
    fn test_builder_methods() {
        let config = EngineConfig::new()
            .with_eval_budget(Duration::from_millis(100))
            .with_webhook_queue_capacity(8)
            .with_blocked_webhook_ports(vec![6379])
            .with_max_conditions_per_rule(3);
        assert!(config.validate().is_ok());
        assert_eq!(config.eval_budget, Duration::from_millis(100));
        assert_eq!(config.webhook_queue_capacity, 8);
        assert_eq!(config.blocked_webhook_ports, vec![6379]);
        assert_eq!(config.max_conditions_per_rule, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::new()
            .with_eval_budget(Duration::ZERO)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_webhook_queue_capacity(0)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_max_conditions_per_rule(0)
            .validate()
            .is_err());
    }
}
