//! HNAP protocol client
//!
//! This module separates the wire from the decoding. Requests implement
//! `HnapRequest`, bytes travel through a `Transport`, and `Session` ties
//! them together with the typed envelopes from the device module.
//! The session is created once by logging in and is never refreshed; once
//! the modem forgets the cookie every further call fails.

pub mod mb8611;

use crate::error::{ModemError, Result};
use crate::models::{ConnectionSnapshot, ConnectionSummary, LogMessageSet};
use async_trait::async_trait;
use mb8611::{ConnectionEnvelope, LoginEnvelope, LoginRequest, LogsEnvelope, QueryRequest, RESULT_OK};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A request the modem understands
pub trait HnapRequest {
    /// Value of the `SOAPAction` header the modem routes on
    fn action_name(&self) -> String;

    /// JSON body sent to the HNAP endpoint
    fn serialize_request(&self) -> Result<Vec<u8>>;
}

/// Moves one serialized request to the modem and returns the full body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: &str, action: &str, body: Vec<u8>) -> Result<Vec<u8>>;
}

/// An authenticated connection to the modem
pub struct Session<T: Transport> {
    endpoint: String,
    transport: T,
}

impl<T: Transport> Session<T> {
    /// Log in and return a session bound to `endpoint`.
    ///
    /// Any `LoginResult` other than `OK` is an [`ModemError::Auth`] carrying
    /// the raw response.
    pub async fn authenticate(
        endpoint: &str,
        transport: T,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let session = Self {
            endpoint: endpoint.to_string(),
            transport,
        };

        let request = LoginRequest::new(username, password);
        let raw = session.call(&request).await?;
        let envelope: LoginEnvelope = decode(&request.action_name(), &raw)?;
        let login = envelope.login_response;

        if login.login_result != RESULT_OK {
            return Err(ModemError::Auth {
                raw: String::from_utf8_lossy(&raw).into_owned(),
            });
        }

        debug!(
            challenge = %login.challenge,
            public_key = %login.public_key,
            has_cookie = !login.cookie.is_empty(),
            "Login accepted, challenge left unused"
        );
        Ok(session)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the modem's event log
    pub async fn fetch_logs(&self) -> Result<LogMessageSet> {
        let request = QueryRequest::logs();
        let raw = self.call(&request).await?;
        let envelope: LogsEnvelope = decode(&request.action_name(), &raw)?;
        let response = envelope.response;

        check_result("GetMultipleHNAPs", &response.result);
        check_result("GetMotoStatusLog", &response.log.result);

        let logs = LogMessageSet::from_raw(&response.log.list);
        debug!("Fetched {} log lines", logs.lines.len());
        Ok(logs)
    }

    /// Fetch the startup summary and both channel tables
    pub async fn fetch_connection_details(&self) -> Result<ConnectionSnapshot> {
        let request = QueryRequest::connection();
        let raw = self.call(&request).await?;
        let envelope: ConnectionEnvelope = decode(&request.action_name(), &raw)?;
        let response = envelope.response;

        check_result("GetMultipleHNAPs", &response.result);
        check_result("GetMotoStatusStartupSequence", &response.startup_sequence.result);
        check_result("GetMotoStatusConnectionInfo", &response.connection_info.result);
        check_result("GetMotoStatusDownstreamChannelInfo", &response.downstream.result);
        check_result("GetMotoStatusUpstreamChannelInfo", &response.upstream.result);
        check_result("GetMotoLagStatus", &response.lag_status.result);

        let startup = response.startup_sequence;
        let summary = ConnectionSummary {
            connectivity_status: startup.connectivity_status,
            boot_status: startup.boot_status,
            configuration_file_status: startup.configuration_file_status,
            security_status: startup.security_status,
            downstream_frequency: startup.ds_freq,
            uptime: response.connection_info.system_up_time,
            network_access: response.connection_info.network_access,
            lag_status: response.lag_status.current_status,
        };

        let snapshot = ConnectionSnapshot::from_blobs(
            summary,
            &response.downstream.channels,
            &response.upstream.channels,
        )?;
        debug!(
            "Fetched {} downstream / {} upstream channels",
            snapshot.downstream.len(),
            snapshot.upstream.len()
        );
        Ok(snapshot)
    }

    async fn call<R: HnapRequest>(&self, request: &R) -> Result<Vec<u8>> {
        let action = request.action_name();
        let body = request.serialize_request()?;
        debug!("POST {} [{}]", self.endpoint, action);
        self.transport.post(&self.endpoint, &action, body).await
    }
}

fn decode<D: DeserializeOwned>(action: &str, body: &[u8]) -> Result<D> {
    serde_json::from_slice(body).map_err(|source| ModemError::Decode {
        action: action.to_string(),
        source,
    })
}

// Sub-action results are reported, not enforced
fn check_result(action: &str, result: &str) {
    if result != RESULT_OK {
        warn!("{} returned result '{}'", action, result);
    }
}
