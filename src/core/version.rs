use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::sync::OnceLock;

fn version_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?").ok()
    })
    .as_ref()
}

/// Parses mod versions the way authors actually write them: "1.2.3",
/// "v1.2", "1.0.0-beta". Missing components are zero.
pub fn parse_lenient(version_str: &str) -> Option<Version> {
    let trimmed = version_str.trim();
    if let Ok(v) = Version::parse(trimmed.trim_start_matches(['v', 'V'])) {
        return Some(v);
    }

    let caps = version_pattern()?.captures(trimmed)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u64>().ok())
    };

    let mut version = Version::new(part(1)?, part(2)?, part(3)?);
    if let Some(pre) = caps.get(4) {
        version.pre = semver::Prerelease::new(pre.as_str()).ok()?;
    }
    Some(version)
}

/// Compares two version strings. `None` when either side is unparseable.
pub fn compare(local: &str, remote: &str) -> Option<Ordering> {
    Some(parse_lenient(local)?.cmp(&parse_lenient(remote)?))
}

/// Local strictly older than remote. Unparseable versions are never outdated.
pub fn is_outdated(local: &str, remote: &str) -> bool {
    compare(local, remote) == Some(Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_prefixed() {
        assert_eq!(parse_lenient("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_lenient("v2.0.1"), Some(Version::new(2, 0, 1)));
        assert_eq!(parse_lenient("0.9"), Some(Version::new(0, 9, 0)));
        assert_eq!(parse_lenient("3"), Some(Version::new(3, 0, 0)));
    }

    #[test]
    fn test_parse_prerelease() {
        let v = parse_lenient("1.0-beta.2").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 0, 0));
        assert_eq!(v.pre.as_str(), "beta.2");
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_lenient("latest"), None);
        assert_eq!(parse_lenient(""), None);
    }

    #[test]
    fn test_outdated() {
        assert!(is_outdated("1.0.0", "1.0.1"));
        assert!(is_outdated("1.2", "1.10.0"));
        assert!(!is_outdated("1.0.1", "1.0.1"));
        assert!(!is_outdated("2.0.0", "1.9.9"));
        assert!(!is_outdated("dev", "1.0.0"));
        assert!(is_outdated("1.0.0-rc.1", "1.0.0"));
    }
}
