//! Small formatting helpers used by debug tracing; never on the hot path.

use crate::network::Timestamp;

/// Formats a seconds-since-midnight timestamp as `HH:MM:SS`, carrying past
/// 24:00 for post-midnight service instead of wrapping.
pub fn format_time(time: Timestamp) -> String {
    let hours = time / 3600;
    let minutes = (time % 3600) / 60;
    let seconds = time % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
