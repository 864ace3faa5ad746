use std::path::Path;

use super::constants::OUTPUT_EXTENSION;
use super::error::DetectHumansError;

/// Checks that `path` names the one container the writer can produce.
///
/// Extension matching is case-insensitive (`OUT.AVI` is accepted).
pub fn validate_output_path(path: &Path) -> Result<(), DetectHumansError> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION))
        .unwrap_or(false);

    if supported {
        Ok(())
    } else {
        Err(DetectHumansError::UnsupportedOutputFormat {
            path: path.to_path_buf(),
            expected: OUTPUT_EXTENSION,
        })
    }
}
