use once_cell::sync::Lazy;
use regex::Regex;

// scheme://host/path, e.g. the OSC 7 "file://my-host/Users/me/project"
static CWD_SIGNAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/]*(/.*)$").expect("cwd signal regex is valid")
});

/// Extracts the path component of a raw directory signal reported by the
/// terminal surface. Returns `None` for anything not shaped like a URI.
pub fn parse_cwd_signal(raw: &str) -> Option<String> {
    CWD_SIGNAL_RE
        .captures(raw.trim())
        .and_then(|caps| caps.get(1))
        .map(|path| path.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_path_after_host() {
        assert_eq!(parse_cwd_signal("file://host/a"), Some("/a".to_string()));
        assert_eq!(
            parse_cwd_signal("file://my-mac.local/Users/me/project"),
            Some("/Users/me/project".to_string())
        );
        assert_eq!(parse_cwd_signal("file:///tmp"), Some("/tmp".to_string()));
        assert_eq!(parse_cwd_signal("file://host/"), Some("/".to_string()));
    }

    #[test]
    fn malformed_signals_are_rejected() {
        assert_eq!(parse_cwd_signal(""), None);
        assert_eq!(parse_cwd_signal("/just/a/path"), None);
        assert_eq!(parse_cwd_signal("file://host"), None);
        assert_eq!(parse_cwd_signal("not a uri at all"), None);
    }
}
