//! Data models for modem connection status and logs

use crate::error::{ModemError, Result};
use crate::parser;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const DOWNSTREAM_HEADERS: [&str; 9] = [
    "Channel",
    "Lock Status",
    "Modulation",
    "Channel ID",
    "Freq. (MHz)",
    "Pwr (dBmV)",
    "SNR (dB)",
    "Corrected",
    "Uncorrected",
];

pub const UPSTREAM_HEADERS: [&str; 7] = [
    "Channel",
    "Lock Status",
    "Channel Type",
    "Channel ID",
    "Symb. Rate (Ksym/sec)",
    "Freq. (MHz)",
    "Pwr (dBmV)",
];

/// One downstream channel as reported by the modem
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamChannel {
    pub channel: String,
    pub lock_status: String,
    pub modulation: String,
    pub channel_id: String,
    pub frequency: Decimal,
    pub power: Decimal,
    pub snr: Decimal,
    pub corrected: Decimal,
    pub uncorrected: Decimal,
}

impl DownstreamChannel {
    pub fn from_row(row: &[String]) -> Result<Self> {
        let [channel, lock_status, modulation, channel_id, frequency, power, snr, corrected, uncorrected] =
            row
        else {
            return Err(width_error("downstream", DOWNSTREAM_HEADERS.len(), row));
        };

        Ok(Self {
            channel: channel.clone(),
            lock_status: lock_status.clone(),
            modulation: modulation.clone(),
            channel_id: channel_id.clone(),
            frequency: decimal(frequency, "frequency")?,
            power: decimal(power, "power")?,
            snr: decimal(snr, "snr")?,
            corrected: decimal(corrected, "corrected")?,
            uncorrected: decimal(uncorrected, "uncorrected")?,
        })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.channel.clone(),
            self.lock_status.clone(),
            self.modulation.clone(),
            self.channel_id.clone(),
            self.frequency.to_string(),
            self.power.to_string(),
            self.snr.to_string(),
            self.corrected.to_string(),
            self.uncorrected.to_string(),
        ]
    }
}

/// One upstream channel as reported by the modem
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamChannel {
    pub channel: String,
    pub lock_status: String,
    pub channel_type: String,
    pub channel_id: String,
    pub symbol_rate: Decimal,
    pub frequency: Decimal,
    pub power: Decimal,
}

impl UpstreamChannel {
    pub fn from_row(row: &[String]) -> Result<Self> {
        let [channel, lock_status, channel_type, channel_id, symbol_rate, frequency, power] = row
        else {
            return Err(width_error("upstream", UPSTREAM_HEADERS.len(), row));
        };

        Ok(Self {
            channel: channel.clone(),
            lock_status: lock_status.clone(),
            channel_type: channel_type.clone(),
            channel_id: channel_id.clone(),
            symbol_rate: decimal(symbol_rate, "symbol rate")?,
            frequency: decimal(frequency, "frequency")?,
            power: decimal(power, "power")?,
        })
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.channel.clone(),
            self.lock_status.clone(),
            self.channel_type.clone(),
            self.channel_id.clone(),
            self.symbol_rate.to_string(),
            self.frequency.to_string(),
            self.power.to_string(),
        ]
    }
}

fn width_error(direction: &str, expected: usize, row: &[String]) -> ModemError {
    ModemError::MalformedPayload(format!(
        "{} channel row has {} columns, expected {}: {:?}",
        direction,
        row.len(),
        expected,
        row
    ))
}

fn decimal(value: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| {
        ModemError::MalformedPayload(format!("{} value '{}' is not a number: {}", column, value, e))
    })
}

/// Startup sequence and connection info reported alongside the channel tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSummary {
    pub connectivity_status: String,
    pub boot_status: String,
    pub configuration_file_status: String,
    pub security_status: String,
    pub downstream_frequency: String,
    pub uptime: String,
    pub network_access: String,
    pub lag_status: String,
}

/// Decoded channel tables for both directions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSnapshot {
    pub summary: ConnectionSummary,
    pub downstream: Vec<DownstreamChannel>,
    pub upstream: Vec<UpstreamChannel>,
}

impl ConnectionSnapshot {
    /// Build a snapshot from the raw channel blobs
    pub fn from_blobs(summary: ConnectionSummary, downstream: &str, upstream: &str) -> Result<Self> {
        let downstream = parser::decode_table(downstream)?
            .iter()
            .map(|row| DownstreamChannel::from_row(row))
            .collect::<Result<Vec<_>>>()?;
        let upstream = parser::decode_table(upstream)?
            .iter()
            .map(|row| UpstreamChannel::from_row(row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            summary,
            downstream,
            upstream,
        })
    }
}

/// A log line split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: Option<String>,
    pub date: Option<String>,
    pub priority: Option<String>,
    pub message: String,
}

/// Ordered log lines, oldest first as the modem reports them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogMessageSet {
    pub lines: Vec<String>,
}

impl LogMessageSet {
    pub fn from_raw(raw: &str) -> Self {
        Self {
            lines: parser::decode_log_lines(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lines.iter().map(|l| parser::parse_log_entry(l)).collect()
    }

    /// Text written to the log file: every line newline-terminated
    pub fn to_text(&self) -> String {
        self.lines.iter().map(|l| format!("{}\n", l)).collect()
    }
}
