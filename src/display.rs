//! Box-drawn tables for terminal output

use crate::models::{
    ConnectionSnapshot, ConnectionSummary, LogEntry, DOWNSTREAM_HEADERS, UPSTREAM_HEADERS,
};
use tabled::builder::Builder;
use tabled::settings::object::Rows;
use tabled::settings::{Alignment, Panel, Style};
use tabled::Table;

pub const LOG_HEADERS: [&str; 4] = ["Time", "Date", "Priority", "Message"];

/// Light box-drawn table with a centered title row above the headers
pub fn titled_table<I>(title: &str, headers: &[&str], rows: I) -> Table
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::modern())
        .with(Panel::header(title))
        .modify(Rows::first(), Alignment::center());
    table
}

pub fn summary_table(summary: &ConnectionSummary) -> Table {
    let items = [
        ("Connectivity", &summary.connectivity_status),
        ("Boot", &summary.boot_status),
        ("Configuration File", &summary.configuration_file_status),
        ("Security", &summary.security_status),
        ("Downstream Frequency", &summary.downstream_frequency),
        ("System Up Time", &summary.uptime),
        ("Network Access", &summary.network_access),
        ("Link Aggregation", &summary.lag_status),
    ];
    let rows = items
        .into_iter()
        .map(|(name, value)| vec![name.to_string(), value.clone()]);
    titled_table("CONNECTION", &["Item", "Status"], rows)
}

pub fn downstream_table(snapshot: &ConnectionSnapshot) -> Table {
    let rows = snapshot.downstream.iter().map(|ch| ch.to_row());
    titled_table("DOWNSTREAM", &DOWNSTREAM_HEADERS, rows)
}

pub fn upstream_table(snapshot: &ConnectionSnapshot) -> Table {
    let rows = snapshot.upstream.iter().map(|ch| ch.to_row());
    titled_table("UPSTREAM", &UPSTREAM_HEADERS, rows)
}

pub fn log_table(entries: &[LogEntry]) -> Table {
    let rows = entries.iter().map(|entry| {
        vec![
            entry.time.clone().unwrap_or_default(),
            entry.date.clone().unwrap_or_default(),
            entry.priority.clone().unwrap_or_default(),
            entry.message.clone(),
        ]
    });
    titled_table("EVENT LOG", &LOG_HEADERS, rows)
}
