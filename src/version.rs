//! Debian package version strings and their ordering.

use std::cmp::Ordering;
use std::fmt;

/// Literal `apt-cache policy` prints when a package has no installed or candidate version.
pub(crate) const NO_VERSION: &str = "(none)";

/// A parsed `[epoch:]upstream_version[-debian_revision]` string.
///
/// Parsing never fails. An empty string, `(none)` or a string without an upstream part
/// becomes the unknown version, which sorts below every real version and displays as the
/// literal it was parsed from. Characters outside the Debian policy alphabet are kept and
/// ordered by the same rules as everything else, so the ordering is total.
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    parts: Option<Parts>,
}

#[derive(Clone, Debug)]
struct Parts {
    /// Epoch digits with leading zeros removed; empty means 0.
    epoch: String,
    upstream: String,
    revision: Option<String>,
}

impl Version {
    pub fn parse(s: &str) -> Self {
        let raw = s.to_string();
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == NO_VERSION {
            return Self { raw, parts: None };
        }

        // A non-numeric prefix before the colon is not an epoch; the whole string is then
        // treated as the upstream version.
        let (epoch, remainder) = match trimmed.split_once(':') {
            Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
                (epoch.trim_start_matches('0'), rest)
            }
            _ => ("", trimmed),
        };

        let (upstream, revision) = match remainder.rsplit_once('-') {
            Some((upstream, revision)) => (upstream, Some(revision)),
            None => (remainder, None),
        };

        if upstream.is_empty() {
            return Self { raw, parts: None };
        }

        Self {
            raw,
            parts: Some(Parts {
                epoch: epoch.to_string(),
                upstream: upstream.to_string(),
                revision: revision.map(str::to_string),
            }),
        }
    }

    /// The unknown version rendered as `(none)`.
    pub fn none() -> Self {
        Self::parse(NO_VERSION)
    }

    pub fn is_known(&self) -> bool {
        self.parts.is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Epoch value; 0 when absent. `None` for the unknown version or an epoch too large for `u64`.
    pub fn epoch(&self) -> Option<u64> {
        let parts = self.parts.as_ref()?;
        if parts.epoch.is_empty() {
            Some(0)
        } else {
            parts.epoch.parse().ok()
        }
    }

    pub fn upstream(&self) -> Option<&str> {
        self.parts.as_ref().map(|parts| parts.upstream.as_str())
    }

    pub fn revision(&self) -> Option<&str> {
        self.parts.as_ref().and_then(|parts| parts.revision.as_deref())
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parts, &other.parts) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => compare_digit_run(&a.epoch, &b.epoch)
                .then_with(|| compare_component(&a.upstream, &b.upstream))
                .then_with(|| {
                    compare_component(
                        a.revision.as_deref().unwrap_or("0"),
                        b.revision.as_deref().unwrap_or("0"),
                    )
                }),
        }
    }
}

/// Compare two version strings with dpkg ordering.
pub fn compare(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

/// Sort weight of one byte in a non-digit run. `None` is the end of the run.
fn char_order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// Digit runs of any length, compared as integers.
fn compare_digit_run(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// dpkg `verrevcmp`: alternate non-digit runs compared by `char_order` and digit runs
/// compared numerically until both strings are exhausted.
fn compare_component(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    while i < a.len() || j < b.len() {
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = char_order(a.get(i).copied());
            let bc = char_order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            if i < a.len() {
                i += 1;
            }
            if j < b.len() {
                j += 1;
            }
        }

        let a_start = i;
        while i < a.len() && a[i].is_ascii_digit() {
            i += 1;
        }
        let b_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }

        // Digit runs are pure ASCII so the slices are valid UTF-8.
        let a_digits = std::str::from_utf8(&a[a_start..i]).unwrap_or("");
        let b_digits = std::str::from_utf8(&b[b_start..j]).unwrap_or("");
        match compare_digit_run(a_digits, b_digits) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_components() {
        let v = Version::parse("1:4.7.0+dfsg1-2");
        assert_eq!(v.epoch(), Some(1));
        assert_eq!(v.upstream(), Some("4.7.0+dfsg1"));
        assert_eq!(v.revision(), Some("2"));

        let v = Version::parse("0.18.0+dfsg-2+b1");
        assert_eq!(v.epoch(), Some(0));
        assert_eq!(v.upstream(), Some("0.18.0+dfsg"));
        assert_eq!(v.revision(), Some("2+b1"));

        let v = Version::parse("3.3.2.final~github");
        assert_eq!(v.upstream(), Some("3.3.2.final~github"));
        assert_eq!(v.revision(), None);

        let v = Version::parse("2.30-1-2");
        assert_eq!(v.upstream(), Some("2.30-1"));
        assert_eq!(v.revision(), Some("2"));
    }

    #[test]
    fn non_numeric_epoch_stays_in_upstream() {
        let v = Version::parse("abc:1.0");
        assert!(v.is_known());
        assert_eq!(v.epoch(), Some(0));
        assert_eq!(v.upstream(), Some("abc:1.0"));
    }

    #[test]
    fn tilde_sorts_before_everything() {
        assert_eq!(compare("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(compare("1.0~~a", "1.0~"), Ordering::Less);
        assert_eq!(compare("1.0~", "1.0"), Ordering::Less);
        assert_eq!(compare("1.0", "1.0a"), Ordering::Less);
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(compare("1:0.1", "2:0.0"), Ordering::Less);
        assert_eq!(compare("1:0.1", "9.9"), Ordering::Greater);
        assert_eq!(compare("0:1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare("00001:1.0", "1:1.0"), Ordering::Equal);
    }

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(compare("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare("1.010", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.01", "1.1"), Ordering::Equal);
        assert_eq!(
            compare("1.123456789012345678901234567890", "1.123456789012345678901234567891"),
            Ordering::Less
        );
    }

    #[test]
    fn letters_sort_before_punctuation() {
        assert_eq!(compare("1.0a", "1.0+"), Ordering::Less);
        assert_eq!(compare("1.0+", "1.0."), Ordering::Less);
        assert_eq!(compare("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn missing_revision_equals_zero() {
        assert_eq!(compare("1.0", "1.0-0"), Ordering::Equal);
        assert_eq!(compare("1.0", "1.0-1"), Ordering::Less);
        assert_eq!(compare("2.0-1", "2.0-1"), Ordering::Equal);
        assert_eq!(compare("1.0-1", "1.0-1ubuntu1"), Ordering::Less);
    }

    #[test]
    fn unknown_version_sorts_first_and_keeps_its_text() {
        let none = Version::parse("(none)");
        let empty = Version::parse("");
        assert!(!none.is_known());
        assert!(!empty.is_known());
        assert_eq!(none.to_string(), "(none)");
        assert_eq!(empty.to_string(), "");
        assert_eq!(none.cmp(&empty), Ordering::Equal);
        assert!(none < Version::parse("0"));
        assert!(none < Version::parse("~~"));
        assert!(!Version::parse("1:").is_known());
        assert!(!Version::parse("-1").is_known());
    }

    #[test]
    fn malformed_runs_still_order() {
        assert_eq!(compare("1.0_beta", "1.0_beta"), Ordering::Equal);
        assert_eq!(compare("1.0@", "1.0#"), Ordering::Greater);
        assert_eq!(compare("ü1", "ü2"), Ordering::Less);
    }

    #[test]
    fn ordering_is_total_and_transitive() {
        let samples = [
            "", "(none)", "0", "1.0~rc1", "1.0~~", "1.0~", "1.0", "1.0-0", "1.0-1", "1.0a",
            "1.0+b1", "1.0.1", "1.9", "1.10", "1:0.1", "2:0.0", "abc", "1.0_x", "1.0-1~bpo8",
        ];
        let versions: Vec<Version> = samples.iter().map(|s| Version::parse(s)).collect();

        for a in &versions {
            for b in &versions {
                let ab = a.cmp(b);
                assert_eq!(ab, b.cmp(a).reverse(), "antisymmetry {} vs {}", a, b);
                for c in &versions {
                    if ab != Ordering::Greater && b.cmp(c) != Ordering::Greater {
                        assert_ne!(a.cmp(c), Ordering::Greater, "{} <= {} <= {}", a, b, c);
                    }
                }
            }
        }
    }
}
