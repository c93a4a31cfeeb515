//! Projection of downstream channel stats onto time-series points

use crate::models::DownstreamChannel;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

pub const MEASUREMENT: &str = "downstream";

/// Tag id of the point carrying summed error counts
pub const ERROR_SUM_ID: &str = "101";
/// Tag id of the point carrying the power spread across channels
pub const POWER_SPREAD_ID: &str = "102";

const FIELD_POWER: &str = "power";
const FIELD_SNR: &str = "snr";
const FIELD_CORRECTED: &str = "corrected_errors";
const FIELD_UNCORRECTED: &str = "uncorrected_errors";

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    fn downstream(
        id: &str,
        power: Decimal,
        snr: Decimal,
        corrected: Decimal,
        uncorrected: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            measurement: MEASUREMENT.to_string(),
            tags: BTreeMap::from([("id".to_string(), id.to_string())]),
            fields: BTreeMap::from([
                (FIELD_POWER.to_string(), power),
                (FIELD_SNR.to_string(), snr),
                (FIELD_CORRECTED.to_string(), corrected),
                (FIELD_UNCORRECTED.to_string(), uncorrected),
            ]),
            timestamp,
        }
    }
}

/// InfluxDB line protocol, nanosecond precision
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.measurement, &[',', ' ']))?;
        for (key, value) in &self.tags {
            write!(f, ",{}={}", escape(key, &[',', '=', ' ']), escape(value, &[',', '=', ' ']))?;
        }

        let fields = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape(key, &[',', '=', ' ']), value))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, " {}", fields)?;

        match self.timestamp.timestamp_nanos_opt() {
            Some(nanos) => write!(f, " {}", nanos),
            None => Ok(()),
        }
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Project downstream channels onto points stamped with the current time
pub fn project(channels: &[DownstreamChannel]) -> Vec<Point> {
    project_at(channels, Utc::now())
}

/// One point per channel, then the error-sum and power-spread points,
/// all sharing `timestamp`
pub fn project_at(channels: &[DownstreamChannel], timestamp: DateTime<Utc>) -> Vec<Point> {
    let mut points = Vec::with_capacity(channels.len() + 2);
    let mut total_corrected = Decimal::ZERO;
    let mut total_uncorrected = Decimal::ZERO;
    let mut powers = Vec::with_capacity(channels.len());

    for ch in channels {
        points.push(Point::downstream(
            &ch.channel,
            ch.power,
            ch.snr,
            ch.corrected,
            ch.uncorrected,
            timestamp,
        ));
        total_corrected += ch.corrected;
        total_uncorrected += ch.uncorrected;
        powers.push(ch.power.to_f64().unwrap_or_default());
    }

    info!("Total Corrected: {}", total_corrected);
    info!("Total Uncorrected: {}", total_uncorrected);

    points.push(Point::downstream(
        ERROR_SUM_ID,
        Decimal::ZERO,
        Decimal::ZERO,
        total_corrected,
        total_uncorrected,
        timestamp,
    ));
    points.push(Point::downstream(
        POWER_SPREAD_ID,
        power_spread(&powers),
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        timestamp,
    ));

    points
}

/// Max minus min power, rounded to one decimal place; zero without channels
fn power_spread(powers: &[f64]) -> Decimal {
    if powers.is_empty() {
        return Decimal::ZERO;
    }
    let max = powers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = powers.iter().copied().fold(f64::INFINITY, f64::min);
    Decimal::from_f64(max - min)
        .map(|d| d.round_dp(1))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel(id: &str, power: Decimal, corrected: i64, uncorrected: i64) -> DownstreamChannel {
        DownstreamChannel {
            channel: id.to_string(),
            lock_status: "Locked".to_string(),
            modulation: "QAM256".to_string(),
            channel_id: id.to_string(),
            frequency: Decimal::new(600, 0),
            power,
            snr: Decimal::new(400, 1),
            corrected: Decimal::from(corrected),
            uncorrected: Decimal::from(uncorrected),
        }
    }

    #[test]
    fn test_aggregate_points() {
        let channels = vec![
            channel("1", Decimal::new(50, 1), 2, 0),
            channel("2", Decimal::new(30, 1), 1, 1),
        ];
        let points = project(&channels);

        assert_eq!(points.len(), 4);
        let sum = &points[2];
        assert_eq!(sum.tags["id"], ERROR_SUM_ID);
        assert_eq!(sum.fields["corrected_errors"], Decimal::from(3));
        assert_eq!(sum.fields["uncorrected_errors"], Decimal::from(1));

        let spread = &points[3];
        assert_eq!(spread.tags["id"], POWER_SPREAD_ID);
        assert_eq!(spread.fields["power"], Decimal::new(20, 1));

        assert!(points.iter().all(|p| p.timestamp == points[0].timestamp));
        assert!(points.iter().all(|p| p.measurement == "downstream"));
    }

    #[test]
    fn test_spread_is_rounded() {
        let channels = vec![
            channel("1", Decimal::new(52, 1), 0, 0),
            channel("2", Decimal::new(-18, 1), 0, 0),
            channel("3", Decimal::new(31, 1), 0, 0),
        ];
        let points = project(&channels);
        assert_eq!(points[3].fields["power"], Decimal::new(70, 1));
    }

    #[test]
    fn test_decimal_sums_are_exact() {
        let channels: Vec<_> = (0..10)
            .map(|i| {
                let mut ch = channel(&i.to_string(), Decimal::ZERO, 0, 0);
                ch.corrected = Decimal::new(1, 1);
                ch
            })
            .collect();
        let points = project(&channels);
        assert_eq!(points[10].fields["corrected_errors"], Decimal::ONE);
    }

    #[test]
    fn test_no_channels() {
        let points = project(&[]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].fields["power"], Decimal::ZERO);
    }

    #[test]
    fn test_line_protocol() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let points = project_at(&[channel("7", Decimal::new(52, 1), 3, 0)], ts);

        assert_eq!(
            points[0].to_string(),
            "downstream,id=7 corrected_errors=3,power=5.2,snr=40.0,uncorrected_errors=0 1700000000000000000"
        );
    }

    #[test]
    fn test_line_protocol_escapes_tags() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let points = project_at(&[channel("a b,c", Decimal::ZERO, 0, 0)], ts);
        assert!(points[0].to_string().starts_with("downstream,id=a\\ b\\,c "));
    }
}
