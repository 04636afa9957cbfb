/// Multiplier for record and line counts (`10K` = 10 000).
pub const THOUSANDS: u64 = 1000;
/// Multiplier for byte sizes (`10K` = 10 240).
pub const KIBI: u64 = 1024;

/// Parses `<integer>[K|M|G]` (case-insensitive suffix) using `mult` as the
/// base: `K` is `mult`, `M` is `mult²`, `G` is `mult³`.
///
/// Malformed input yields `0` and overflow saturates; configuration
/// loading treats `0` as "no limit".
///
/// ```rust
/// use rotalog::config::{KIBI, THOUSANDS, parse_num_suffix};
///
/// assert_eq!(parse_num_suffix("10K", THOUSANDS), 10_000);
/// assert_eq!(parse_num_suffix("2M", KIBI), 2 * 1024 * 1024);
/// assert_eq!(parse_num_suffix("abc", KIBI), 0);
/// ```
#[must_use]
pub fn parse_num_suffix(input: &str, mult: u64) -> u64 {
    let s = input.trim();
    let (digits, power) = match s.chars().last() {
        Some('K' | 'k') if s.len() > 1 => (&s[..s.len() - 1], 1),
        Some('M' | 'm') if s.len() > 1 => (&s[..s.len() - 1], 2),
        Some('G' | 'g') if s.len() > 1 => (&s[..s.len() - 1], 3),
        _ => (s, 0),
    };
    let Ok(base) = digits.parse::<u64>() else {
        return 0;
    };
    (0..power).fold(base, |acc, _| acc.saturating_mul(mult))
}
