use crate::models::error::SError;
use camino::Utf8Path;
use std::io::Write;

pub struct FileUtils;

impl FileUtils {
    /// Writes `contents` to a sibling temp file and renames it over `path`,
    /// so readers never observe a half-written file.
    pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<(), SError> {
        let parent = path
            .parent()
            .ok_or_else(|| SError::IOError(format!("{} has no parent directory", path)))?;
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let written = std::fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        });

        match written.and_then(|_| std::fs::rename(&tmp, path)) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                Err(e.into())
            }
        }
    }
}
