use pgtpl::{Params, Record};
use std::io::Read;
use std::path::Path;

/// The template from the command line, or stdin when none was given.
pub fn read_sql(sql: Option<String>) -> anyhow::Result<String> {
    if let Some(sql) = sql {
        return Ok(sql);
    }

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
    if buf.trim().is_empty() {
        anyhow::bail!("no SQL provided (pass it as an argument or pipe it to stdin)");
    }
    Ok(buf.trim_end().to_string())
}

/// Parse `--params` JSON: array → positional, object → named, absent → none.
pub fn parse_params(json: Option<&str>) -> anyhow::Result<Params> {
    let Some(json) = json else {
        return Ok(Params::None);
    };
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| anyhow::anyhow!("invalid --params JSON: {e}"))?;
    Ok(Params::try_from(value)?)
}

/// Load rows (a JSON array of objects) from `path`, or stdin when `None`.
pub fn read_rows(path: Option<&Path>) -> anyhow::Result<Vec<Record>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
            buf
        }
    };

    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("invalid rows JSON: {e}"))?;
    let serde_json::Value::Array(items) = value else {
        anyhow::bail!("rows must be a JSON array of objects");
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            Record::try_from(item).map_err(|e| anyhow::anyhow!("row {idx}: {e}"))
        })
        .collect()
}
