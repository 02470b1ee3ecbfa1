//! Shared filesystem helpers.

use crate::error::{MmjError, OptionExt, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a half-written file behind.
///
/// Parent directories are created as needed. On unix the result is `0600`.
///
/// # Errors
///
/// Returns an error if the directory, temp file or rename fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_config(format!("Invalid output path: {}", path.display()))?;
    fs::create_dir_all(parent_dir)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_config(format!("Invalid output path: {}", path.display()))?;
    let temp_path = parent_dir.join(format!(".{file_name}.tmp"));

    let mut writer = BufWriter::new(File::create(&temp_path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| MmjError::Io(e.into_error()))?
        .sync_all()?;

    fs::rename(&temp_path, path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        let _ = fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Strip the longest run of spaces and tabs that every non-blank line
/// starts with. Lines holding only spaces and tabs become empty.
#[must_use]
pub fn dedent(text: &str) -> String {
    let is_blank = |l: &str| l.trim_start_matches([' ', '\t']).is_empty();
    let margin = text
        .lines()
        .filter(|l| !is_blank(l))
        .map(|l| &l[..l.len() - l.trim_start_matches([' ', '\t']).len()])
        .reduce(|common, indent| {
            let shared = common
                .bytes()
                .zip(indent.bytes())
                .take_while(|(a, b)| a == b)
                .count();
            &common[..shared]
        })
        .unwrap_or("");

    text.lines()
        .map(|l| {
            if is_blank(l) {
                ""
            } else {
                l.strip_prefix(margin).unwrap_or(l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
