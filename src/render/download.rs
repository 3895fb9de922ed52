//! Saving attachments to user-chosen paths.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MailError, Result};
use crate::model::Attachment;

use super::locations::LocationMap;

/// Longest file name we suggest for a download.
const MAX_NAME_LEN: usize = 150;

/// Turn an attachment name into something safe to suggest as a file name.
///
/// Path separators and other unsafe characters become `_`, leading dots are
/// dropped so the result is never hidden or a parent reference.
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            '-' | '.' | '_' | '@' | '+' | ' ' => c,
            _ => '_',
        })
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `path` if nothing is there yet, else the first free `stem_<n>.ext`.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_string);
    let parent = path.parent().unwrap_or(Path::new("."));

    (1u32..)
        .map(|n| match &ext {
            Some(ext) => parent.join(format!("{stem}_{n}.{ext}")),
            None => parent.join(format!("{stem}_{n}")),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Put an attachment at `dest`.
///
/// A temp copy already tracked under `key` is moved there; otherwise the
/// payload is written fresh.
pub fn save_attachment(
    attachment: &Attachment,
    key: &str,
    locations: &mut LocationMap,
    dest: &Path,
) -> Result<PathBuf> {
    let saved = if locations.contains(key) {
        locations.promote(key, dest)?
    } else {
        std::fs::write(dest, &attachment.payload).map_err(|e| MailError::io(dest, e))?;
        dest.to_path_buf()
    };
    info!(key, path = %saved.display(), "Attachment saved");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::locations::ScratchSpace;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report 2024.pdf"), "report 2024.pdf");
        assert_eq!(safe_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(safe_file_name(".bashrc"), "bashrc");
        assert_eq!(safe_file_name("a/b\\c:d*e"), "a_b_c_d_e");
        assert_eq!(safe_file_name(""), "attachment");
        assert_eq!(safe_file_name("..."), "attachment");
    }

    #[test]
    fn test_unique_path_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("photo.png");
        assert_eq!(unique_path(&first), first);
        std::fs::write(&first, b"1").unwrap();
        let second = unique_path(&first);
        assert_eq!(second, dir.path().join("photo_1.png"));
        std::fs::write(&second, b"2").unwrap();
        assert_eq!(unique_path(&first), dir.path().join("photo_2.png"));

        let bare = dir.path().join("README");
        std::fs::write(&bare, b"x").unwrap();
        assert_eq!(unique_path(&bare), dir.path().join("README_1"));
    }

    #[test]
    fn test_save_attachment_moves_tracked_copy() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path().join("scratch")).unwrap();
        let att = Attachment {
            filename: Some("a.txt".into()),
            content_id: None,
            content_type: None,
            payload: b"payload".to_vec(),
        };
        let temp = scratch.write_unique(&att.payload, Some("txt")).unwrap();
        let mut locations = LocationMap::new();
        locations.insert("a.txt", temp.clone());

        let dest = dir.path().join("a.txt");
        let saved = save_attachment(&att, "a.txt", &mut locations, &dest).unwrap();
        assert_eq!(saved, dest);
        assert!(!temp.exists());
        assert!(!locations.contains("a.txt"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_save_attachment_writes_untracked_payload() {
        let dir = tempfile::tempdir().unwrap();
        let att = Attachment {
            filename: Some("b.bin".into()),
            content_id: None,
            content_type: None,
            payload: vec![0, 1, 2],
        };
        let mut locations = LocationMap::new();
        let dest = dir.path().join("b.bin");
        save_attachment(&att, "b.bin", &mut locations, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), vec![0, 1, 2]);
    }
}
