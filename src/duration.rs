//! Conversion between `std::time::Duration` and the restricted xs:duration grammar used in DASH
//! manifests.
//
// DASH attributes such as @mediaPresentationDuration, @minBufferTime and Period@duration are typed
// xs:duration in the MPD schema, but in practice (and in DASH-IF interoperability guidelines) only
// the day, hour, minute and second designators are meaningful. We accept
//
//    P[nD][T[nH][nM][n[.f]S]]
//
// and reject years, months and weeks, whose length in seconds is not well defined. The canonical
// output form is expressed in hours, minutes and seconds only, and always carries a seconds
// component: 376 seconds is "PT6M16S", zero is "PT0S".
//
// Durations are unsigned (std::time::Duration), so a leading "-" is rejected with a dedicated error
// message rather than being folded into the generic grammar error.

use std::time::Duration;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serializer};
use serde::de;
use tracing::trace;
use crate::DashMpdError;


const XS_DURATION_GRAMMAR: &str = "P[nD][T[nH][nM][nS]]";

lazy_static! {
    static ref XS_DURATION_RE: Regex = Regex::new(concat!(
        r"^P",
        r"(?:(?P<days>[0-9]+)D)?",
        r"(?:(?P<hastime>T)",
        r"(?:(?P<hours>[0-9]+)H)?",
        r"(?:(?P<minutes>[0-9]+)M)?",
        r"(?:(?P<seconds>[0-9]+)(?:\.(?P<fraction>[0-9]+))?S)?",
        r")?$")).unwrap();
}

fn grammar_error(s: &str) -> DashMpdError {
    DashMpdError::InvalidDuration(format!("{s:?} must be in the format {XS_DURATION_GRAMMAR}"))
}

fn overflow_error(s: &str) -> DashMpdError {
    DashMpdError::InvalidDuration(format!("{s:?} is too large to represent"))
}

// Multiply a captured decimal component by its weight in seconds, detecting overflow.
fn component_secs(s: &str, m: Option<regex::Match>, weight: u64) -> Result<u64, DashMpdError> {
    match m {
        None => Ok(0),
        Some(digits) => digits.as_str()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(weight))
            .ok_or_else(|| overflow_error(s)),
    }
}

/// Parse a DASH duration string such as `PT6M16S`, `PT1.97S` or `P1DT2H`.
///
/// Components that are absent default to zero. Fractional digits are only accepted on the seconds
/// component, and digits beyond nanosecond precision are truncated. Negative durations are
/// rejected.
pub fn parse_xs_duration(s: &str) -> Result<Duration, DashMpdError> {
    if s.starts_with('-') {
        return Err(DashMpdError::InvalidDuration(format!("{s:?}: duration cannot be negative")));
    }
    if s.len() < 3 {
        return Err(DashMpdError::InvalidDuration(
            format!("{s:?}: at least one number and designator are required")));
    }
    let m = XS_DURATION_RE.captures(s).ok_or_else(|| grammar_error(s))?;
    if m.name("hastime").is_some() &&
        m.name("hours").is_none() &&
        m.name("minutes").is_none() &&
        m.name("seconds").is_none()
    {
        // "P1DT": the time designator must be followed by at least one component
        return Err(grammar_error(s));
    }
    let mut secs: u64 = 0;
    for (cap, weight) in [("days", 86_400), ("hours", 3_600), ("minutes", 60), ("seconds", 1)] {
        let c = component_secs(s, m.name(cap), weight)?;
        secs = secs.checked_add(c).ok_or_else(|| overflow_error(s))?;
    }
    let mut nsecs: u32 = 0;
    if let Some(f) = m.name("fraction") {
        let mut f = f.as_str();
        if f.len() > 9 {
            f = &f[..9];
        }
        let padded = format!("{f:0<9}");
        nsecs = padded.parse::<u32>().map_err(|_| grammar_error(s))?;
    }
    trace!("parsed xs:duration {s} as {secs}s + {nsecs}ns");
    Ok(Duration::new(secs, nsecs))
}

/// Format a `Duration` in the canonical form `PT[hH][mM]s[.f]S`.
///
/// The hour component is omitted when zero, the minute component is omitted when zero and there is
/// no hour component, and the seconds component is always present. Trailing zeros of the fractional
/// seconds are trimmed.
pub fn format_xs_duration(d: &Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    out.push_str(&seconds.to_string());
    let nanos = d.subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push('S');
    out
}


// Deserialize an optional XML duration attribute to an Option<Duration>. A malformed value is an
// error, never silently dropped.
pub(crate) fn deserialize_xs_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: de::Deserializer<'de>,
{
    match <Option<String>>::deserialize(deserializer)? {
        Some(xs) => parse_xs_duration(xs.trim())
            .map(Some)
            .map_err(de::Error::custom),
        None => Ok(None),
    }
}

pub(crate) fn serialize_xs_duration<S>(oxs: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match oxs {
        Some(xs) => serializer.serialize_str(&format_xs_duration(xs)),
        // not reached for fields annotated with #[skip_serializing_none]
        None => serializer.serialize_none(),
    }
}
