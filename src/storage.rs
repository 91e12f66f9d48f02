use crate::errors::AppError;
use crate::models::AppData;
use std::path::Path;
use tokio::fs;
use tracing::error;

/// Reads the state file. A missing or unreadable file starts from empty state.
pub async fn load_data(path: &Path) -> AppData {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return AppData::default(),
        Err(err) => {
            error!(path = %path.display(), "failed to read data file: {err}");
            return AppData::default();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        error!(path = %path.display(), "failed to parse data file: {err}");
        AppData::default()
    })
}

/// Writes a sibling temp file, then renames it over `path`. Callers hold the data lock.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
