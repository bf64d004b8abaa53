//! Output file writers.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use c2m_common::constants::{REGISTRY_ADDRESS_VAR, REGISTRY_PASSWORD_VAR, REGISTRY_USERNAME_VAR};
use c2m_common::error::{ConvertError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Writes `value` as pretty JSON indented by `indent` spaces.
///
/// # Errors
///
/// Returns an error if the file cannot be created, written or flushed.
pub fn write_json<T>(path: &Path, value: &T, indent: usize, trailing_newline: bool) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let pad = vec![b' '; indent];
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(&pad));
    value.serialize(&mut ser)?;
    if trailing_newline {
        writer.write_all(b"\n").map_err(|e| ConvertError::io(path, e))?;
    }
    writer.flush().map_err(|e| ConvertError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Writes the registry credential variables, the address prefilled.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_env_file(path: &Path, registry: &str) -> Result<()> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write!(
        writer,
        "{REGISTRY_USERNAME_VAR}=\n{REGISTRY_PASSWORD_VAR}=\n{REGISTRY_ADDRESS_VAR}={registry}\n"
    )
    .and_then(|()| writer.flush())
    .map_err(|e| ConvertError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote credentials file");
    Ok(())
}

/// Creates `path`, failing if it already exists.
///
/// # Errors
///
/// Returns [`ConvertError::DestinationExists`] on a collision, or an I/O
/// error if the directory cannot be created.
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(ConvertError::DestinationExists {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(ConvertError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_uses_requested_indent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        write_json(&path, &json!({"a": [1]}), 4, true).expect("write");
        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}\n");
    }

    #[test]
    fn json_without_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        write_json(&path, &json!({"a": 1}), 2, false).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn env_file_prefills_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".env");
        write_env_file(&path, "myregistry.io").expect("write");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "CONTAINER_REGISTRY_USERNAME=\nCONTAINER_REGISTRY_PASSWORD=\nCONTAINER_REGISTRY_ADDRESS=myregistry.io\n"
        );
    }

    #[test]
    fn fresh_dir_rejects_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("modules");
        create_fresh_dir(&path).expect("first create");
        assert!(matches!(
            create_fresh_dir(&path),
            Err(ConvertError::DestinationExists { .. })
        ));
    }

    #[test]
    fn missing_parent_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a/b");
        assert!(matches!(create_fresh_dir(&path), Err(ConvertError::Io { .. })));
    }
}
