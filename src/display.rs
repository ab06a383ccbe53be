//! Truncation of pattern and subject text embedded in error messages.
//!
//! Long inputs keep `max / 2` bytes from each end and replace the middle with
//! a marker naming how many bytes were dropped:
//!
//! ```text
//!   aaaaaaaa... omitting 4096 bytes ...bbbbbbbb
//! ```
//!
//! Cut points are moved inwards to the nearest UTF-8 character boundary so a
//! multi-byte character is never split; invalid UTF-8 is rendered lossily.

use std::borrow::Cow;

/// Returns `text` unchanged when it fits in `max` bytes, otherwise the
/// elided form described in the module docs.
///
/// # Example
///
/// ```
/// use regexkit::display::truncate_for_display;
///
/// assert_eq!(truncate_for_display(b"short", 16), "short");
/// let long = "x".repeat(20);
/// assert_eq!(
///     truncate_for_display(long.as_bytes(), 8),
///     "xxxx... omitting 12 bytes ...xxxx"
/// );
/// ```
pub fn truncate_for_display(text: &[u8], max: usize) -> Cow<'_, str> {
    if text.len() <= max {
        return String::from_utf8_lossy(text);
    }
    let half = max / 2;
    let head_end = floor_boundary(text, half);
    let tail_start = ceil_boundary(text, text.len() - half);
    let omitted = tail_start - head_end;
    Cow::Owned(format!(
        "{}... omitting {} bytes ...{}",
        String::from_utf8_lossy(&text[..head_end]),
        omitted,
        String::from_utf8_lossy(&text[tail_start..]),
    ))
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

// At most three continuation bytes follow a leading byte; longer runs are
// not UTF-8 and get cut after three steps.
fn floor_boundary(text: &[u8], mut idx: usize) -> usize {
    let limit = idx.saturating_sub(3);
    while idx > limit && idx < text.len() && is_continuation(text[idx]) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &[u8], mut idx: usize) -> usize {
    let limit = (idx + 3).min(text.len());
    while idx < limit && is_continuation(text[idx]) {
        idx += 1;
    }
    idx
}
