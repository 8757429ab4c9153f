//! Flat `key=value` files: the `.nexstage.env` secrets file and
//! staging repository records share this format.

use std::collections::BTreeMap;
use std::path::Path;

use nexstage_util::errors::NexstageResult;

/// Parse `key=value` lines. Blank lines and `#` comments are skipped, keys
/// and values are trimmed, lines without `=` are ignored.
pub fn parse_key_values(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

/// Render a map back into `key=value` lines, preceded by an optional header
/// comment.
pub fn render_key_values(header: Option<&str>, values: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    if let Some(h) = header {
        out.push_str("# ");
        out.push_str(h);
        out.push('\n');
    }
    for (key, value) in values {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Loads a `.nexstage.env` file (shell-style `KEY=value` format).
///
/// `.nexstage.env` holds repository manager credentials. Values are
/// available via `${env:VAR}` interpolation in the global server table.
/// A missing file yields an empty map.
pub fn load_env_file(path: &Path) -> NexstageResult<BTreeMap<String, String>> {
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_key_values(&content))
}

/// Interpolate `${env:VAR}` references in a string.
///
/// Looks up values first from the provided `env_overrides` map (populated
/// from `.nexstage.env`), then falls back to process environment variables.
/// Unknown variables expand to the empty string.
pub fn interpolate(input: &str, env_overrides: &BTreeMap<String, String>) -> String {
    let mut result = input.to_string();
    while let Some(start) = result.find("${env:") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let end = start + end;
        let key = &result[start + 6..end];
        let value = env_overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .unwrap_or_default();
        result.replace_range(start..=end, &value);
    }
    result
}
