//! HNAP request and response envelopes for the Motorola MB8611
//!
//! Every query goes through `GetMultipleHNAPs`: the request names the
//! sub-actions with empty string placeholders and the response mirrors them
//! with a `Response` suffix and a per-action `Result` status.

use crate::error::{ModemError, Result};
use crate::modem::HnapRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SOAP_NAMESPACE: &str = "http://purenetworks.com/HNAP1/";
const MULTIPLE_HNAPS: &str = "GetMultipleHNAPs";

pub const RESULT_OK: &str = "OK";

pub const CONNECTION_ACTIONS: [&str; 5] = [
    "GetMotoStatusStartupSequence",
    "GetMotoStatusConnectionInfo",
    "GetMotoStatusDownstreamChannelInfo",
    "GetMotoStatusUpstreamChannelInfo",
    "GetMotoLagStatus",
];

pub const LOG_ACTIONS: [&str; 2] = ["GetMotoStatusLog", "GetMotoStatusLogXXX"];

/// Login body. The challenge the modem answers with is never used and the
/// password travels in `PrivateLogin` as plain text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    action: &'static str,
    username: String,
    login_password: &'static str,
    captcha: &'static str,
    private_login: String,
}

impl LoginRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            action: "request",
            username: username.to_string(),
            login_password: "",
            captcha: "",
            private_login: password.to_string(),
        }
    }
}

impl HnapRequest for LoginRequest {
    fn action_name(&self) -> String {
        format!("{}Login", SOAP_NAMESPACE)
    }

    fn serialize_request(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ModemError::Decode {
            action: self.action_name(),
            source,
        })
    }
}

/// A `GetMultipleHNAPs` query for a fixed set of sub-actions
#[derive(Debug, Clone)]
pub struct QueryRequest {
    actions: Vec<String>,
}

impl QueryRequest {
    pub fn new(actions: &[&str]) -> Self {
        Self {
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn connection() -> Self {
        Self::new(&CONNECTION_ACTIONS)
    }

    pub fn logs() -> Self {
        Self::new(&LOG_ACTIONS)
    }

    fn body(&self) -> Value {
        let placeholders: Map<String, Value> = self
            .actions
            .iter()
            .map(|a| (a.clone(), Value::String(String::new())))
            .collect();

        let mut envelope = Map::new();
        envelope.insert(MULTIPLE_HNAPS.to_string(), Value::Object(placeholders));
        Value::Object(envelope)
    }
}

impl HnapRequest for QueryRequest {
    fn action_name(&self) -> String {
        format!("{}{}", SOAP_NAMESPACE, MULTIPLE_HNAPS)
    }

    fn serialize_request(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.body()).map_err(|source| ModemError::Decode {
            action: self.action_name(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginEnvelope {
    #[serde(rename = "LoginResponse")]
    pub login_response: LoginResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoginResponse {
    pub challenge: String,
    pub cookie: String,
    pub public_key: String,
    pub login_result: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionEnvelope {
    #[serde(rename = "GetMultipleHNAPsResponse")]
    pub response: ConnectionResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionResponse {
    #[serde(rename = "GetMotoStatusStartupSequenceResponse")]
    pub startup_sequence: StartupSequence,

    #[serde(rename = "GetMotoStatusConnectionInfoResponse")]
    pub connection_info: ConnectionInfo,

    #[serde(rename = "GetMotoStatusDownstreamChannelInfoResponse")]
    pub downstream: DownstreamChannelInfo,

    #[serde(rename = "GetMotoStatusUpstreamChannelInfoResponse")]
    pub upstream: UpstreamChannelInfo,

    #[serde(rename = "GetMotoLagStatusResponse")]
    pub lag_status: LagStatus,

    #[serde(rename = "GetMultipleHNAPsResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartupSequence {
    #[serde(rename = "MotoConnDSFreq")]
    pub ds_freq: String,
    #[serde(rename = "MotoConnConnectivityStatus")]
    pub connectivity_status: String,
    #[serde(rename = "MotoConnBootStatus")]
    pub boot_status: String,
    #[serde(rename = "MotoConnConfigurationFileStatus")]
    pub configuration_file_status: String,
    #[serde(rename = "MotoConnSecurityStatus")]
    pub security_status: String,
    #[serde(rename = "GetMotoStatusStartupSequenceResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionInfo {
    #[serde(rename = "MotoConnSystemUpTime")]
    pub system_up_time: String,
    #[serde(rename = "MotoConnNetworkAccess")]
    pub network_access: String,
    #[serde(rename = "GetMotoStatusConnectionInfoResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DownstreamChannelInfo {
    #[serde(rename = "MotoConnDownstreamChannel")]
    pub channels: String,
    #[serde(rename = "GetMotoStatusDownstreamChannelInfoResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamChannelInfo {
    #[serde(rename = "MotoConnUpstreamChannel")]
    pub channels: String,
    #[serde(rename = "GetMotoStatusUpstreamChannelInfoResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LagStatus {
    #[serde(rename = "MotoLagCurrentStatus")]
    pub current_status: String,
    #[serde(rename = "GetMotoLagStatusResult")]
    pub result: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsEnvelope {
    #[serde(rename = "GetMultipleHNAPsResponse")]
    pub response: LogsResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogsResponse {
    #[serde(rename = "GetMotoStatusLogResponse")]
    pub log: StatusLog,

    #[serde(rename = "GetMultipleHNAPsResult")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusLog {
    #[serde(rename = "MotoStatusLogList")]
    pub list: String,
    #[serde(rename = "GetMotoStatusLogResult")]
    pub result: String,
}
