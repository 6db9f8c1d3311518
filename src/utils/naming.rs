use chrono::{DateTime, Utc};
use rand::Rng;

/// Number of random decimal digits in every generated name.
pub const SALT_DIGITS: usize = 10;

// Keeps `YYYYMMDD-<salt>-<original>` far below the usual 255 byte limit.
const MAX_ORIGINAL_LEN: usize = 200;

/// Derive the stored filename for an upload: `yyyymmdd-<salt>-<sanitized original>`,
/// lower-cased. The only randomness is drawn from `rng`.
pub fn generate_name<R: Rng + ?Sized>(original: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let salt: String = (0..SALT_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();

    format!("{}-{}-{}", now.format("%Y%m%d"), salt, sanitize(original)).to_lowercase()
}

fn sanitize(original: &str) -> String {
    let mut out = String::with_capacity(original.len());
    let mut in_whitespace = false;

    for c in original.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            out.push(c);
        }
    }

    // Everything left is ASCII, so byte offsets are char boundaries.
    if out.len() > MAX_ORIGINAL_LEN {
        out.split_off(out.len() - MAX_ORIGINAL_LEN)
    } else {
        out
    }
}
