//! Host extraction and normalization
//!
//! The block decision is made per host. A host is derived from whatever the
//! navigation context hands us (a full URL or a bare hostname) and
//! normalized: ASCII-lowercased, trimmed, and with one leading `www.` removed.

use std::fmt;

// =============================================================================
// Scheme and host position
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    Some(host_span(url, scheme_end))
}

/// Host span starting at `start`: skips userinfo, stops at port/path/query/fragment.
fn host_span(s: &str, start: usize) -> (usize, usize) {
    let bytes = s.as_bytes();

    // Skip userinfo
    let mut host_start = start;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' {
            break;
        }
    }

    // Find host end
    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    (host_start, host_end)
}

// =============================================================================
// Host
// =============================================================================

/// A normalized host name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Host(String);

impl Host {
    /// Derive a host from a URL or a bare hostname.
    ///
    /// Anything unparseable yields the empty host, which never matches a
    /// block pattern and cannot be added to the block list.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let raw = match get_host_position(input) {
            Some((start, end)) => &input[start..end],
            None => {
                let (start, end) = host_span(input, 0);
                &input[start..end]
            }
        };
        Self(normalize_host(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Host {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase and strip a single leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}
