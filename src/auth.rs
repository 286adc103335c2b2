//! Session cookies for the download server
//!
//! Two cookie file layouts are accepted:
//! - Netscape/Mozilla `cookies.txt` exports (tab separated, name and value in
//!   fields 6 and 7)
//! - plain `name=value` lines
//!
//! Lines starting with `#` and blank lines are ignored.

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Cookies attached to every download request
///
/// Read-only after loading, so it is shared between workers without locking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    cookies: BTreeMap<String, String>,
}

impl AuthContext {
    /// Build a context from explicit name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse cookie file content
    pub fn parse(content: &str) -> Self {
        let mut cookies = BTreeMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() >= 7 {
                debug!(name = fields[5], "loaded cookie");
                cookies.insert(fields[5].to_string(), fields[6].to_string());
            } else if let Some((name, value)) = line.split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                debug!(name, "loaded cookie");
                cookies.insert(name.to_string(), value.trim().to_string());
            }
        }

        Self { cookies }
    }

    /// Load cookies from a file
    ///
    /// A missing file yields an empty context; the server will then answer with
    /// 401/403, which is reported per task.
    pub fn from_cookie_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "cookie file not found, downloading without a session");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let auth = Self::parse(&content);
        info!(path = %path.display(), count = auth.len(), "loaded cookies");
        Ok(auth)
    }

    /// Value of the `Cookie` request header, `None` without cookies
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Look up a cookie by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Number of cookies
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// True without cookies
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_netscape_format() {
        let content = "# Netscape HTTP Cookie File\n\
            # This is a generated file!\n\
            \n\
            .is.tue.mpg.de\tTRUE\t/\tTRUE\t1767225600\tPHPSESSID\tabc123\n\
            download.is.tue.mpg.de\tFALSE\t/\tFALSE\t0\ttoken\txyz\n";

        let auth = AuthContext::parse(content);
        assert_eq!(auth.len(), 2);
        assert_eq!(auth.get("PHPSESSID"), Some("abc123"));
        assert_eq!(auth.get("token"), Some("xyz"));
    }

    #[test]
    fn parses_simple_format_and_trims() {
        let auth = AuthContext::parse("PHPSESSID = abc123 \nlang=en\n=orphan\n");
        assert_eq!(auth.len(), 2);
        assert_eq!(auth.get("PHPSESSID"), Some("abc123"));
        assert_eq!(auth.get("lang"), Some("en"));
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let auth = AuthContext::parse("session=a=b==\n");
        assert_eq!(auth.get("session"), Some("a=b=="));
    }

    #[test]
    fn comments_and_garbage_are_skipped() {
        let auth = AuthContext::parse("# name=value\n   \nno separator here\n");
        assert!(auth.is_empty());
        assert_eq!(auth.cookie_header(), None);
    }

    #[test]
    fn cookie_header_joins_all_pairs() {
        let auth = AuthContext::from_pairs([("b", "2"), ("a", "1")]);
        assert_eq!(auth.cookie_header().as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn missing_file_yields_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let auth = AuthContext::from_cookie_file(&dir.path().join("cookies.txt")).unwrap();
        assert!(auth.is_empty());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "PHPSESSID=abc\n").unwrap();

        let auth = AuthContext::from_cookie_file(&path).unwrap();
        assert_eq!(auth.get("PHPSESSID"), Some("abc"));
    }
}
