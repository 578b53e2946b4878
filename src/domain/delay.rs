//! Enqueue delay.
//!
//! A delay arrives either as an integer number of seconds or as a duration
//! string. Two string syntaxes are understood: unit strings such as
//! `"1m30s"`, `"250ms"` or `"1.5s"`, and ISO-8601 durations such as
//! `"PT1M30S"`. Delays longer than [`Delay::MAX`] are rejected.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::{BrokerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delay(Duration);

impl Delay {
    pub const ZERO: Delay = Delay(Duration::ZERO);
    pub const MAX: Delay = Delay(Duration::from_secs(365 * 86_400));

    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn parse(input: &str) -> Result<Self> {
        parse_duration(input).and_then(|d| Self::bounded(d, input))
    }

    fn bounded(duration: Duration, input: &str) -> Result<Self> {
        if duration > Self::MAX.0 {
            return Err(BrokerError::InvalidDelay(format!(
                "{input:?} exceeds the maximum delay of {}",
                Self::MAX
            )));
        }
        Ok(Self(duration))
    }
}

impl From<Duration> for Delay {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}

impl Serialize for Delay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Delay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) if secs < 0 => Err(serde::de::Error::custom(
                "delay can not be negative",
            )),
            Raw::Seconds(secs) => Delay::bounded(Duration::from_secs(secs as u64), &secs.to_string())
                .map_err(serde::de::Error::custom),
            Raw::Text(text) => Delay::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

fn invalid(input: &str) -> BrokerError {
    BrokerError::InvalidDelay(format!("{input:?} is not a duration"))
}

fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(BrokerError::InvalidDelay(format!("{input:?} is negative")));
    }

    let from_secs = |secs: f64| Duration::try_from_secs_f64(secs).map_err(|_| invalid(input));

    if let Some(rest) = s.strip_prefix('P').or_else(|| s.strip_prefix('p')) {
        from_secs(parse_iso8601(rest, input)?)
    } else if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| invalid(input))
    } else if s.contains('.') {
        from_secs(parse_fractional(s, input)?)
    } else {
        humantime::parse_duration(s).map_err(|_| invalid(input))
    }
}

/// Unit strings with fractional numbers, e.g. `"1.5s"` or `"0.5h10m"`.
fn parse_fractional(s: &str, input: &str) -> Result<f64> {
    let mut total = 0.0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            return Err(invalid(input));
        }
        let value: f64 = rest[..number_end].parse().map_err(|_| invalid(input))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid(input)),
        };
        total += value * scale;
        rest = &rest[unit_end..];
    }

    Ok(total)
}

fn parse_iso8601(rest: &str, input: &str) -> Result<f64> {
    let (date, time) = match rest.find(['T', 't']) {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    if date.is_empty() && time.map_or(true, str::is_empty) {
        return Err(invalid(input));
    }

    let mut total = designators(date, &[('W', 604_800.0), ('D', 86_400.0)], input)?;
    if let Some(time) = time {
        if time.is_empty() {
            return Err(invalid(input));
        }
        total += designators(time, &[('H', 3600.0), ('M', 60.0), ('S', 1.0)], input)?;
    }
    Ok(total)
}

fn designators(part: &str, units: &[(char, f64)], input: &str) -> Result<f64> {
    let mut total = 0.0;
    let mut number = String::new();

    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
            continue;
        }
        let scale = units
            .iter()
            .find(|(unit, _)| *unit == c.to_ascii_uppercase())
            .map(|(_, scale)| *scale)
            .ok_or_else(|| invalid(input))?;
        if number.is_empty() {
            return Err(invalid(input));
        }
        total += number.parse::<f64>().map_err(|_| invalid(input))? * scale;
        number.clear();
    }

    if !number.is_empty() {
        return Err(invalid(input));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(input: &str) -> f64 {
        Delay::parse(input).unwrap().duration().as_secs_f64()
    }

    #[test]
    fn test_compound_strings() {
        assert_eq!(secs("10s"), 10.0);
        assert_eq!(secs("1m30s"), 90.0);
        assert_eq!(secs("2h"), 7200.0);
        assert_eq!(secs("250ms"), 0.25);
        assert_eq!(secs("1.5s"), 1.5);
        assert_eq!(secs("1h1m1s"), 3661.0);
        assert_eq!(secs("0.5h10m"), 2400.0);
    }

    #[test]
    fn test_iso8601_strings() {
        assert_eq!(secs("PT30S"), 30.0);
        assert_eq!(secs("PT1M30S"), 90.0);
        assert_eq!(secs("PT0.5S"), 0.5);
        assert_eq!(secs("P1D"), 86_400.0);
        assert_eq!(secs("P1DT1H"), 90_000.0);
    }

    #[test]
    fn test_bare_integer_string_is_seconds() {
        assert_eq!(secs("10"), 10.0);
    }

    #[test]
    fn test_zero_forms() {
        assert!(Delay::parse("").unwrap().is_zero());
        assert!(Delay::parse("0").unwrap().is_zero());
        assert!(Delay::parse("0s").unwrap().is_zero());
    }

    #[test]
    fn test_rejects_garbage() {
        for input in ["abc", "10x", "s", "-5s", "P", "PT", "PT5", "1m30"] {
            assert!(
                matches!(Delay::parse(input), Err(BrokerError::InvalidDelay(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_integer_and_string() {
        let d: Delay = serde_json::from_str("30").unwrap();
        assert_eq!(d.duration(), Duration::from_secs(30));

        let d: Delay = serde_json::from_str("\"1m\"").unwrap();
        assert_eq!(d.duration(), Duration::from_secs(60));

        assert!(serde_json::from_str::<Delay>("-1").is_err());
        assert!(serde_json::from_str::<Delay>("\"soon\"").is_err());
    }

    #[test]
    fn test_rejects_delays_beyond_maximum() {
        assert_eq!(Delay::parse("365d").unwrap(), Delay::MAX);
        for input in ["366d", "P400D", "99999999999", "18446744073709551616"] {
            assert!(
                matches!(Delay::parse(input), Err(BrokerError::InvalidDelay(_))),
                "{input} should be rejected"
            );
        }
        assert!(serde_json::from_str::<Delay>("9223372036854775807").is_err());
    }
}
