use anyhow::{Context, Result};
use std::path::Path;

/// Parse a floating point series, one or more values per line separated
/// by commas or whitespace, ignoring blank lines and `#` comments.
pub fn parse_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let val: f64 = token
                .parse()
                .with_context(|| format!("line {}: not a number: {token}", idx + 1))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a floating point series from disk.
pub fn read_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_series(&text)
}

/// Parse sample indices (one per token, same separators as the series
/// format) for replaying externally detected peaks.
pub fn parse_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let val: usize = token
                .parse()
                .with_context(|| format!("line {}: not an index: {token}", idx + 1))?;
            out.push(val);
        }
    }
    if out.is_empty() {
        anyhow::bail!("no indices found");
    }
    Ok(out)
}

/// Read sample indices from disk.
pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_indices(&text)
}
