//! Filesystem helpers shared by the pipeline stages.

use crate::{common::*, error::PathContext as _};

/// File names that operating systems drop into directories on their own.
const OS_ARTIFACTS: &[&str] = &["Thumbs.db", "desktop.ini"];

/// Returns true for entries such as `.DS_Store` that are not part of a dataset.
pub fn is_os_artifact(name: &str) -> bool {
    name.starts_with('.') || OS_ARTIFACTS.contains(&name)
}

/// Lists the entry names of a directory, sorted, with OS artifacts removed.
pub fn list_dir_names(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .at_path(dir)?
        .map(|entry| -> Result<_> {
            let entry = entry.at_path(dir)?;
            match entry.file_name().into_string() {
                Ok(name) => Ok(Some(name)),
                Err(name) => {
                    warn!(
                        "ignore '{}' in '{}', the name is not valid UTF-8",
                        name.to_string_lossy(),
                        dir.display()
                    );
                    Ok(None)
                }
            }
        })
        .filter_map(|result| result.transpose())
        .filter(|result| !matches!(result, Ok(name) if is_os_artifact(name)))
        .collect::<Result<_>>()?;
    names.sort_unstable();
    Ok(names)
}

/// Maps the file stem of every file in `dir` to its full file name.
///
/// When two files share a stem, the one sorting last wins.
pub fn stem_map(dir: &Path) -> Result<BTreeMap<String, String>> {
    let map = list_dir_names(dir)?
        .into_iter()
        .filter(|name| dir.join(name).is_file())
        .filter_map(|name| {
            let stem = Path::new(&name).file_stem()?.to_str()?.to_owned();
            Some((stem, name))
        })
        .collect();
    Ok(map)
}

pub(crate) fn create_dir_all(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).at_path(dir)
}

pub(crate) fn remove_dir_all(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir).at_path(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_artifacts_are_recognized() {
        assert!(is_os_artifact(".DS_Store"));
        assert!(is_os_artifact(".hidden"));
        assert!(is_os_artifact("Thumbs.db"));
        assert!(!is_os_artifact("img_01.tif"));
    }

    #[test]
    fn stem_map_skips_artifacts_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"").unwrap();
        fs::write(dir.path().join("b.tif"), b"").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let map = stem_map(dir.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], "a.png");
        assert_eq!(map["b"], "b.tif");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_left_out() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt as _};

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"").unwrap();
        let bad = OsStr::from_bytes(b"b\xff.png");
        if fs::write(dir.path().join(bad), b"").is_err() {
            // the filesystem refuses such names
            return;
        }

        assert_eq!(list_dir_names(dir.path()).unwrap(), vec!["a.png"]);
        assert_eq!(stem_map(dir.path()).unwrap().len(), 1);
    }
}
