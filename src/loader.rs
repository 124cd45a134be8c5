use crate::error::FlowError;
use crate::model::RawFlow;
use std::path::Path;
use tracing::info;

/// Read every flow-definition unit (`.yaml`/`.yml`) in a directory.
///
/// Each unit holds zero or more raw flows as produced by the external flow
/// parser. An unreadable or unparsable unit is fatal; structural problems in
/// an individual flow are handled later, at normalization.
pub fn read_flows(dir: impl AsRef<Path>) -> Result<Vec<RawFlow>, FlowError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(FlowError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("invalid flow source directory: {}", dir.display()),
        )));
    }
    let mut flows = Vec::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    for path in entries {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !is_yaml {
            continue;
        }
        info!(file = %path.display(), "reading flow source");
        let content = std::fs::read_to_string(&path)?;
        let unit: Vec<RawFlow> = serde_yaml::from_str(&content)?;
        flows.extend(unit);
    }
    Ok(flows)
}
