use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::config::Config;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"))
}

/// Strips path separators and shell-hostile characters from a client
/// supplied filename.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let clean = unsafe_chars().replace_all(base, "_").to_string();
    let clean = clean.trim_matches(['.', '_']).to_string();
    if clean.is_empty() {
        "file".to_string()
    } else {
        clean
    }
}

pub fn is_pdf(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Builds a per-upload unique name: `{prefix}_{user}_{uuid}_{original}`.
/// The random component keeps rapid repeat uploads from colliding.
pub fn unique_filename(prefix: &str, user_id: i64, original: &str) -> String {
    format!(
        "{}_{}_{}_{}",
        prefix,
        user_id,
        Uuid::new_v4().simple(),
        sanitize_filename(original)
    )
}

pub fn ensure_dirs(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(config.blind_papers_dir())?;
    std::fs::create_dir_all(config.camera_ready_dir())?;
    std::fs::create_dir_all(config.schedules_dir())?;
    std::fs::create_dir_all(config.certificates_dir())?;
    Ok(())
}

pub fn save_bytes(dir: &Path, filename: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let path = dir.join(filename);
    std::fs::write(&path, data)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_specials() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my paper (final).pdf"), "my_paper_final_.pdf");
        assert_eq!(sanitize_filename("///"), "file");
    }

    #[test]
    fn unique_filename_keeps_extension() {
        let name = unique_filename("paper", 3, "draft v2.pdf");
        assert!(name.starts_with("paper_3_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn back_to_back_uploads_get_distinct_names() {
        let a = unique_filename("paper", 3, "draft.pdf");
        let b = unique_filename("paper", 3, "draft.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn pdf_extension_check_is_case_insensitive() {
        assert!(is_pdf("a.PDF"));
        assert!(!is_pdf("a.pdf.exe"));
    }

    #[test]
    fn save_bytes_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bytes(dir.path(), "x.pdf", b"%PDF").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF");
    }
}
