use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Deserializer};

/// Write `content` to `path` via a sibling temp file and rename.
///
/// Readers never observe a half-written file: they see either the old
/// content or the new content.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn parse_decimal<E: serde::de::Error>(value: NumberOrString) -> Result<f64, E> {
    match value {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid decimal: {:?}", s))),
    }
}

/// Deserialize a money amount that the API may send either as a JSON number
/// or as a decimal string (`"1200.00"`).
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    parse_decimal(NumberOrString::deserialize(deserializer)?)
}

/// Optional variant of [`deserialize_decimal`]; `null` and a missing field
/// (with `#[serde(default)]`) both map to `None`.
pub fn deserialize_opt_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(value) => parse_decimal(value).map(Some),
        None => Ok(None),
    }
}
