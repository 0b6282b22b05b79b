//! Plain-text document loading for ingestion.

use intellicore_core::error::IndexError;
use intellicore_core::knowledge::Document;
use std::path::Path;
use tracing::warn;

/// Load one UTF-8 text file. Metadata `source` is the path as given.
pub fn load_text_document(path: &Path) -> Result<Document, IndexError> {
    if !path.is_file() {
        return Err(IndexError::LoadFailed {
            path: path.display().to_string(),
            reason: "file not found".into(),
        });
    }

    let text = std::fs::read_to_string(path).map_err(|e| IndexError::LoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(Document::new(text).with_metadata("source", path.display().to_string()))
}

/// Load every file in `dir` (non-recursive) whose extension is `extension`,
/// in path order. Unreadable files are skipped with a warning.
pub fn load_directory(dir: &Path, extension: &str) -> Result<Vec<Document>, IndexError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IndexError::LoadFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == extension))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match load_text_document(&path) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(error = %e, "Skipping unreadable document"),
        }
    }
    Ok(documents)
}

/// Load a single file, or every `.txt` file when `path` is a directory.
pub fn load_path(path: &Path) -> Result<Vec<Document>, IndexError> {
    if path.is_dir() {
        load_directory(path, "txt")
    } else {
        load_text_document(path).map(|d| vec![d])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_file_with_source_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc1.txt");
        std::fs::write(&path, "This is the first document about AI.").unwrap();

        let doc = load_text_document(&path).unwrap();
        assert_eq!(doc.content, "This is the first document about AI.");
        assert_eq!(doc.source(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = load_text_document(Path::new("/nonexistent/doc.txt")).unwrap_err();
        assert!(matches!(err, IndexError::LoadFailed { .. }));
    }

    #[test]
    fn directory_filters_by_extension_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# markdown").unwrap();

        let docs = load_directory(dir.path(), "txt").unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        let md = load_directory(dir.path(), "md").unwrap();
        assert_eq!(md.len(), 1);
    }

    #[test]
    fn load_path_handles_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        std::fs::write(&file, "solo").unwrap();

        assert_eq!(load_path(&file).unwrap().len(), 1);
        assert_eq!(load_path(dir.path()).unwrap().len(), 1);
    }
}
