use actix_multipart::form::tempfile::TempFile;
use anyhow::{Context, Result};
use std::path::Path;
use uuid::Uuid;

/// Persist an uploaded temp file under the uploads dir with a collision-free
/// name, returning the relative path stored on the record and served back
/// under `/uploads`.
pub fn persist_upload(file: &TempFile, upload_dir: &str) -> Result<String> {
    std::fs::create_dir_all(upload_dir)
        .with_context(|| format!("failed to create upload dir {upload_dir}"))?;

    let original = file.file_name.as_deref().unwrap_or("upload");
    let stored = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original));
    let dest = Path::new(upload_dir).join(&stored);

    // copy rather than rename: the temp file may live on another filesystem
    std::fs::copy(file.file.path(), &dest)
        .with_context(|| format!("failed to store upload as {}", dest.display()))?;

    Ok(format!("{}/{}", upload_dir.trim_end_matches('/'), stored))
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_path_and_shell_characters() {
        assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
    }

    #[test]
    fn degenerate_names_fall_back_to_a_default() {
        assert_eq!(sanitize_file_name("///"), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
