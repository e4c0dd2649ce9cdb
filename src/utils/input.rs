use std::fs;
use std::io::Read;
use std::path::Path;

use crate::cli::AppError;

/// Read a whole input document; `-` means stdin
pub(crate) fn read_input(path: &Path) -> Result<String, AppError> {
    let display = path.display().to_string();
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| AppError::Read {
                path: "<stdin>".to_string(),
                source,
            })?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|source| AppError::Read {
        path: display,
        source,
    })
}
