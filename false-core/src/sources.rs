use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::CoreError;

/// File extensions recognised as FALSE source.
pub const SOURCE_EXTENSIONS: &[&str] = &["f", "false"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

pub fn is_source_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Collect the sources below `root`, sorted by path.
///
/// A plain file is returned as-is whatever its extension; directories are
/// walked recursively for `.f` and `.false` files.
pub fn load_sources(root: impl AsRef<Path>) -> Result<Vec<SourceFile>, CoreError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(CoreError::MissingSources(root.to_path_buf()));
    }
    if root.is_file() {
        let contents = fs::read_to_string(root)?;
        return Ok(vec![SourceFile {
            path: root.to_path_buf(),
            contents,
        }]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file() && is_source_path(path) {
            let contents = fs::read_to_string(path)?;
            files.push(SourceFile {
                path: path.to_path_buf(),
                contents,
            });
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_directories_for_sources() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("mkdir");
        fs::write(dir.path().join("b.false"), "2.").expect("write");
        fs::write(dir.path().join("a.f"), "1.").expect("write");
        fs::write(nested.join("c.f"), "3.").expect("write");
        fs::write(dir.path().join("notes.txt"), "X").expect("write");

        let files = load_sources(dir.path()).expect("load");
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).expect("prefix").to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.f"),
                PathBuf::from("b.false"),
                PathBuf::from("nested").join("c.f"),
            ]
        );
        assert_eq!(files[0].contents, "1.");
    }

    #[test]
    fn single_files_are_taken_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prog.txt");
        fs::write(&path, "1.").expect("write");
        let files = load_sources(&path).expect("load");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_roots_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_sources(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, CoreError::MissingSources(_)));
    }
}
