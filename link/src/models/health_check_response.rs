use serde::{Deserialize, Serialize};

/// Health response of the platform auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResponse {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,
}
