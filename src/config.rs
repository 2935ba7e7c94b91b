//! Dispatcher configuration.
//!
//! All settings come from the environment and are read once, at startup,
//! by [`DispatcherConfig::from_env`]. A missing value fails fast with a
//! [`ConfigError`] naming the variable, before any event is handled.
//!
//! | Variable              | Field                    |
//! |-----------------------|--------------------------|
//! | `DYNAMODB_TABLE_NAME` | `table_name`             |
//! | `SSM_PARAMETER_NAME`  | `secret_parameter_name`  |
//! | `ECS_CLUSTER_NAME`    | `cluster_name`           |
//! | `ECS_TASK_FAMILY`     | `task_family`            |
//! | `SUBNET_IDS`          | `subnet_ids` (comma list)|
//! | `SECURITY_GROUP_ID`   | `security_group_id`      |

use thiserror::Error;

use crate::platform::NetworkPlacement;

/// Environment variable holding the persistence table name.
pub const ENV_TABLE_NAME: &str = "DYNAMODB_TABLE_NAME";
/// Environment variable holding the secret parameter name.
pub const ENV_SECRET_PARAMETER: &str = "SSM_PARAMETER_NAME";
/// Environment variable holding the cluster name.
pub const ENV_CLUSTER_NAME: &str = "ECS_CLUSTER_NAME";
/// Environment variable holding the task definition family.
pub const ENV_TASK_FAMILY: &str = "ECS_TASK_FAMILY";
/// Environment variable holding the comma-separated subnet ids.
pub const ENV_SUBNET_IDS: &str = "SUBNET_IDS";
/// Environment variable holding the security group id.
pub const ENV_SECURITY_GROUP_ID: &str = "SECURITY_GROUP_ID";

/// Configuration loading errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    /// `SUBNET_IDS` contains no usable subnet id.
    #[error("SUBNET_IDS must list at least one subnet id")]
    NoSubnets,
}

/// Validated dispatcher configuration.
///
/// # Examples
///
/// ```
/// use ci_task_dispatcher::config::DispatcherConfig;
///
/// let config = DispatcherConfig::from_lookup(|key| match key {
///     "DYNAMODB_TABLE_NAME" => Some("tasks".to_string()),
///     "SSM_PARAMETER_NAME" => Some("/ci/webhook-token".to_string()),
///     "ECS_CLUSTER_NAME" => Some("ci".to_string()),
///     "ECS_TASK_FAMILY" => Some("gitlab-runner".to_string()),
///     "SUBNET_IDS" => Some("subnet-a, subnet-b".to_string()),
///     "SECURITY_GROUP_ID" => Some("sg-1".to_string()),
///     _ => None,
/// })
/// .unwrap();
/// assert_eq!(config.subnet_ids, vec!["subnet-a", "subnet-b"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Table holding pipeline task records.
    pub table_name: String,
    /// Name of the parameter holding the webhook secret.
    pub secret_parameter_name: String,
    /// Cluster tasks are launched in and stopped from.
    pub cluster_name: String,
    /// Task definition family; the newest active revision is launched.
    pub task_family: String,
    /// Subnets for task placement.
    pub subnet_ids: Vec<String>,
    /// Security group for task placement.
    pub security_group_id: String,
}

impl DispatcherConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary lookup function.
    ///
    /// Values are trimmed and blank values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing variable, or
    /// [`ConfigError::NoSubnets`] if the subnet list is empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let table_name = required(ENV_TABLE_NAME)?;
        let secret_parameter_name = required(ENV_SECRET_PARAMETER)?;
        let cluster_name = required(ENV_CLUSTER_NAME)?;
        let task_family = required(ENV_TASK_FAMILY)?;
        let subnet_ids = parse_subnets(&required(ENV_SUBNET_IDS)?)?;
        let security_group_id = required(ENV_SECURITY_GROUP_ID)?;

        Ok(Self {
            table_name,
            secret_parameter_name,
            cluster_name,
            task_family,
            subnet_ids,
            security_group_id,
        })
    }

    /// Network placement for launched tasks: configured subnets, the single
    /// security group, no public IP.
    pub fn network_placement(&self) -> NetworkPlacement {
        NetworkPlacement::private(self.subnet_ids.clone(), self.security_group_id.clone())
    }

    /// Sets the cluster name.
    pub fn with_cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = cluster_name.into();
        self
    }

    /// Sets the task definition family.
    pub fn with_task_family(mut self, task_family: impl Into<String>) -> Self {
        self.task_family = task_family.into();
        self
    }

    /// Sets the secret parameter name.
    pub fn with_secret_parameter_name(mut self, name: impl Into<String>) -> Self {
        self.secret_parameter_name = name.into();
        self
    }
}

fn parse_subnets(raw: &str) -> Result<Vec<String>, ConfigError> {
    let subnets: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if subnets.is_empty() {
        return Err(ConfigError::NoSubnets);
    }
    Ok(subnets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_TABLE_NAME, "tasks"),
            (ENV_SECRET_PARAMETER, "/ci/token"),
            (ENV_CLUSTER_NAME, "ci"),
            (ENV_TASK_FAMILY, "runner"),
            (ENV_SUBNET_IDS, "subnet-a,subnet-b"),
            (ENV_SECURITY_GROUP_ID, "sg-1"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<DispatcherConfig, ConfigError> {
        DispatcherConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_every_field() {
        let config = load(&env()).unwrap();
        assert_eq!(config.table_name, "tasks");
        assert_eq!(config.secret_parameter_name, "/ci/token");
        assert_eq!(config.cluster_name, "ci");
        assert_eq!(config.task_family, "runner");
        assert_eq!(config.subnet_ids, vec!["subnet-a", "subnet-b"]);
        assert_eq!(config.security_group_id, "sg-1");
    }

    #[test]
    fn each_missing_variable_is_named() {
        for key in [
            ENV_TABLE_NAME,
            ENV_SECRET_PARAMETER,
            ENV_CLUSTER_NAME,
            ENV_TASK_FAMILY,
            ENV_SUBNET_IDS,
            ENV_SECURITY_GROUP_ID,
        ] {
            let mut vars = env();
            vars.remove(key);
            assert_eq!(load(&vars), Err(ConfigError::Missing(key)));
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = env();
        vars.insert(ENV_CLUSTER_NAME, "   ");
        assert_eq!(load(&vars), Err(ConfigError::Missing(ENV_CLUSTER_NAME)));
    }

    #[test]
    fn subnet_list_is_trimmed_and_compacted() {
        let mut vars = env();
        vars.insert(ENV_SUBNET_IDS, " subnet-a , ,subnet-b,");
        assert_eq!(load(&vars).unwrap().subnet_ids, vec!["subnet-a", "subnet-b"]);

        vars.insert(ENV_SUBNET_IDS, ", ,");
        assert_eq!(load(&vars), Err(ConfigError::NoSubnets));
    }

    #[test]
    fn placement_is_private() {
        let placement = load(&env()).unwrap().network_placement();
        assert!(!placement.assign_public_ip);
        assert_eq!(placement.security_group, "sg-1");
        assert_eq!(placement.subnets.len(), 2);
    }
}
