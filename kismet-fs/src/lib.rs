//! Filesystem helpers for export destinations, built on `cap-std` and `camino`.
//!
//! Paths arrive from the command line, so they may be absolute or relative.
//! Each helper resolves an ambient base directory first and performs the
//! actual operation through the capability handle.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// How an existing output file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create the file or truncate it.
    #[default]
    Truncate,
    /// Create the file or append to its end.
    Append,
}

impl WriteMode {
    /// Pick [`WriteMode::Append`] when `append` is set.
    #[must_use]
    pub const fn from_append(append: bool) -> Self {
        if append { Self::Append } else { Self::Truncate }
    }

    fn open_options(self) -> fs_utf8::OpenOptions {
        let mut options = fs_utf8::OpenOptions::new();
        options.write(true).create(true);
        match self {
            Self::Truncate => options.truncate(true),
            Self::Append => options.append(true),
        };
        options
    }
}

/// Open `path` for writing, creating missing parent directories.
///
/// # Errors
///
/// Returns any IO error raised while creating the parent directories or
/// opening the file, and an error when `path` has no file name.
pub fn create_output_file(path: &Utf8Path, mode: WriteMode) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, file_name) = open_dir_and_file(path)?;
    dir.open_with(file_name.as_str(), &mode.open_options())
}

/// Open the directory containing `path` and return it with the file name.
///
/// A bare file name resolves against the current directory.
///
/// # Errors
///
/// Returns an error when `path` has no file name or its directory cannot be
/// opened.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists.
///
/// # Errors
///
/// Returns any IO error raised while opening the base directory or creating
/// the missing components.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

/// Whether `path` exists and is a regular file.
///
/// A missing file or directory yields `Ok(false)`.
///
/// # Errors
///
/// Returns IO errors other than [`io::ErrorKind::NotFound`].
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Split a parent path into an ambient base directory and a relative suffix.
///
/// # Errors
///
/// Returns an error for non-UTF-8 prefixes or when the base directory cannot
/// be opened.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::{fs, io::Write};
    use tempfile::TempDir;

    #[fixture]
    fn temp() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn utf8(dir: &TempDir, relative: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(relative)).expect("UTF-8 temp path")
    }

    fn write_line(path: &Utf8Path, mode: WriteMode, line: &str) {
        let mut file = create_output_file(path, mode).expect("open output");
        writeln!(file, "{line}").expect("write line");
    }

    #[rstest]
    fn creates_missing_parent_directories(temp: TempDir) {
        let path = utf8(&temp, "exports/2024/devices.csv");
        write_line(&path, WriteMode::Truncate, "lat,lon,id");
        assert_eq!(
            fs::read_to_string(&path).expect("read output"),
            "lat,lon,id\n"
        );
    }

    #[rstest]
    #[case(WriteMode::Truncate, "second\n")]
    #[case(WriteMode::Append, "first\nsecond\n")]
    fn existing_files_follow_write_mode(
        temp: TempDir,
        #[case] mode: WriteMode,
        #[case] expected: &str,
    ) {
        let path = utf8(&temp, "devices.csv");
        write_line(&path, WriteMode::Truncate, "first");
        write_line(&path, mode, "second");
        assert_eq!(fs::read_to_string(&path).expect("read output"), expected);
    }

    #[rstest]
    fn append_creates_missing_file(temp: TempDir) {
        let path = utf8(&temp, "fresh.csv");
        write_line(&path, WriteMode::Append, "row");
        assert_eq!(fs::read_to_string(&path).expect("read output"), "row\n");
    }

    #[rstest]
    #[case(false, WriteMode::Truncate)]
    #[case(true, WriteMode::Append)]
    fn mode_follows_append_flag(#[case] append: bool, #[case] expected: WriteMode) {
        assert_eq!(WriteMode::from_append(append), expected);
    }

    #[rstest]
    fn regular_file_checks(temp: TempDir) {
        let file = utf8(&temp, "survey.kismet");
        fs::write(&file, b"log").expect("write log");
        assert!(is_regular_file(&file).expect("inspect file"));
        assert!(!is_regular_file(&utf8(&temp, "missing.kismet")).expect("inspect missing"));
        assert!(!is_regular_file(&utf8(&temp, "nowhere/missing.kismet")).expect("inspect"));
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8");
        assert!(!is_regular_file(&dir).expect("inspect directory"));
    }

    #[rstest]
    fn bare_file_name_resolves_against_current_dir() {
        let (_, name) = open_dir_and_file(Utf8Path::new("devices.csv")).expect("split path");
        assert_eq!(name, "devices.csv");
    }

    #[cfg(unix)]
    #[rstest]
    fn absolute_parent_splits_at_root() {
        let (_, relative) =
            base_dir_and_relative(Utf8Path::new("/tmp/exports")).expect("split path");
        assert_eq!(relative, Utf8PathBuf::from("tmp/exports"));
    }
}
