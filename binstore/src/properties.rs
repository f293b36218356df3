//! Minimal `key=value` text files used for database metadata and context tags.
//!
//! Lines starting with `#` or `!` are comments, blank lines are skipped and
//! whitespace around keys and values is trimmed. Lines without a separator
//! are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::BinStoreResult;

pub type Properties = BTreeMap<String, String>;

/// Parse properties from text.
pub fn parse_properties(text: &str) -> Properties {
    let mut props = Properties::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(sep) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..sep].trim();
        let value = line[sep + 1..].trim();
        if !key.is_empty() {
            props.insert(key.to_string(), value.to_string());
        }
    }
    props
}

/// Read a properties file.
pub fn read_properties(path: &Path) -> BinStoreResult<Properties> {
    let text = fs::read_to_string(path)?;
    Ok(parse_properties(&text))
}

/// Write the given entries, in order, preceded by a comment line.
pub fn write_properties<'a, I>(path: &Path, comment: &str, entries: I) -> BinStoreResult<()>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut text = format!("# {}\n", comment);
    for (key, value) in entries {
        text.push_str(key);
        text.push('=');
        text.push_str(&value);
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}
