//! Duration strings used throughout policy specs (`"30s"`, `"500ms"`, `"5m"`, `"2h"`).

use std::time::Duration;

/// Parse a duration string like `"5s"`, `"500ms"`, `"1m"`, `"2h"`.
///
/// A bare number is read as seconds. Values too large to represent are
/// rejected like malformed ones.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
