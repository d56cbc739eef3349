//! Source file discovery for the command line front end.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Returns true for TypeScript sources that carry function bodies.
///
/// Declaration files (`.d.ts`) only hold signatures and are skipped.
pub fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts") && !name.ends_with(".d.ts")
}

/// Returns an iterator over all TypeScript sources under `path`, in a stable order.
///
/// A `path` naming a single file yields that file when it is a source file.
pub fn find_source_files<P: AsRef<Path>>(path: P) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_find_source_files() {
        let temp_dir = tempdir().unwrap();
        let dir_path = temp_dir.path();
        fs::create_dir(dir_path.join("nested")).unwrap();

        File::create(dir_path.join("b.ts")).unwrap();
        File::create(dir_path.join("a.ts")).unwrap();
        File::create(dir_path.join("nested").join("c.ts")).unwrap();
        File::create(dir_path.join("types.d.ts")).unwrap();
        File::create(dir_path.join("notes.txt")).unwrap();

        let found: Vec<_> = find_source_files(dir_path)
            .map(|p| p.strip_prefix(dir_path).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("a.ts"), PathBuf::from("b.ts"), Path::new("nested").join("c.ts")]
        );

        temp_dir.close().unwrap();
    }

    #[test]
    fn test_single_file_path() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("only.ts");
        File::create(&file).unwrap();

        assert_eq!(find_source_files(&file).collect::<Vec<_>>(), vec![file]);
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("/path/to/module.ts")));
        assert!(!is_source_file(Path::new("module.d.ts")));
        assert!(!is_source_file(Path::new("module.py")));
        assert!(!is_source_file(Path::new("/path/to/dir/")));
    }
}
