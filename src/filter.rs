//! Object filter policy / 对象过滤策略
//!
//! Pure predicates over object size and key. Size bounds are strict
//! inequalities on both ends (an object of exactly `min` or `max` bytes is
//! excluded) and `max == 0` means unbounded. The key pattern is matched
//! anchored at the start of the key; it need not consume the whole key.

use regex::Regex;

/// Immutable filter built once per run / 每次运行构建一次的过滤器
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    min_size: u64,
    max_size: u64,
    pattern: Regex,
}

impl FilterPolicy {
    /// Build a policy. The pattern is compiled prefix-anchored; an empty
    /// pattern matches everything.
    pub fn new(min_size: u64, max_size: u64, pattern: &str) -> Result<Self, regex::Error> {
        let pattern = if pattern.is_empty() { ".*" } else { pattern };
        let pattern = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(Self {
            min_size,
            max_size,
            pattern,
        })
    }

    /// Size and key predicate combined / 大小与键名组合判断
    pub fn matches(&self, size_bytes: u64, key: &str) -> bool {
        self.in_size_limits(size_bytes) && self.pattern.is_match(key)
    }

    /// `size > min` and (`max == 0` or `size < max`)
    pub fn in_size_limits(&self, size_bytes: u64) -> bool {
        if self.max_size != 0 {
            return self.min_size < size_bytes && size_bytes < self.max_size;
        }
        self.min_size < size_bytes
    }
}

const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Human-readable byte size, binary units, two decimals / 可读文件大小
pub fn human_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }
    let mut value = size_bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(min: u64, max: u64, pattern: &str) -> FilterPolicy {
        FilterPolicy::new(min, max, pattern).unwrap()
    }

    #[test]
    fn test_size_limits_strict_bounds() {
        let p = policy(100, 200, "");
        assert!(!p.in_size_limits(100), "exact min is excluded");
        assert!(!p.in_size_limits(200), "exact max is excluded");
        assert!(p.in_size_limits(101));
        assert!(p.in_size_limits(199));
        assert!(!p.in_size_limits(0));
        assert!(!p.in_size_limits(201));
    }

    #[test]
    fn test_size_limits_unbounded_max() {
        let p = policy(1, 0, "");
        assert!(!p.in_size_limits(0));
        assert!(!p.in_size_limits(1));
        assert!(p.in_size_limits(2));
        assert!(p.in_size_limits(u64::MAX));
    }

    #[test]
    fn test_pattern_anchored_at_key_start() {
        let p = policy(0, 0, "backup");
        assert!(p.matches(10, "backup.sql"));
        assert!(p.matches(10, "backup"));
        assert!(!p.matches(10, "db/backup.sql"), "match must start at the key start");
    }

    #[test]
    fn test_pattern_need_not_consume_whole_key() {
        let p = policy(0, 0, "logs/");
        assert!(p.matches(10, "logs/2024/app.log"));
    }

    #[test]
    fn test_default_pattern_matches_everything() {
        let p = policy(0, 0, "");
        assert!(p.matches(1, "anything-at-all"));
        assert!(p.matches(1, ""));
    }

    #[test]
    fn test_extension_pattern() {
        let p = policy(0, 0, r".*\.(db|sql)$");
        assert!(p.matches(10, "dump/users.sql"));
        assert!(p.matches(10, "app.db"));
        assert!(!p.matches(10, "app.db.bak"));
        assert!(!p.matches(10, "readme.txt"));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(FilterPolicy::new(0, 0, "(unclosed").is_err());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0B");
        assert_eq!(human_size(100), "100.00B");
        assert_eq!(human_size(1023), "1023.00B");
        assert_eq!(human_size(1024), "1.00KB");
        assert_eq!(human_size(1536), "1.50KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.00GB");
    }
}
