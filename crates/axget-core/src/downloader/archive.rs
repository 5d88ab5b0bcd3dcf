//! Archive extraction (zip/war, tar, tar.gz) with optional root stripping.
//!
//! Archives produced by release tooling usually wrap everything in a single
//! top-level directory such as `open-suite-webapp-7.3.1/`. When root
//! stripping is requested and the archive declares exactly one directory
//! entry at depth one, the contents of that directory are lifted into the
//! destination and the wrapper is removed. Any other shape is left alone.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;

use crate::{AxGetError, Result};

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// Zip container, including `.war` and `.jar` files
    Zip,
    Tar,
    TarGz,
}

impl ArchiveType {
    /// Detect the archive type from the leading bytes of its content.
    ///
    /// Temporary download names carry no extension, so the content is the
    /// only reliable signal.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveType::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveType::TarGz)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    /// Read the start of `path` and detect its archive type
    pub fn detect(path: &Path) -> Result<Option<Self>> {
        let mut header = Vec::with_capacity(512);
        File::open(path)?.take(512).read_to_end(&mut header)?;
        Ok(Self::from_magic(&header))
    }
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract `archive_path` into `dest_dir`, creating it if needed.
    ///
    /// With `strip_root`, a single depth-one directory entry is treated as a
    /// wrapper and flattened away after extraction. Moving a wrapped entry
    /// onto a name that already exists in `dest_dir` is an error.
    pub fn extract(archive_path: &Path, dest_dir: &Path, strip_root: bool) -> Result<()> {
        let archive_type = ArchiveType::detect(archive_path)?.ok_or_else(|| {
            AxGetError::Extraction(format!(
                "Unrecognized archive format: {}",
                archive_path.display()
            ))
        })?;

        Self::extract_with_type(archive_path, dest_dir, archive_type, strip_root)
    }

    /// Extract an archive with explicit type
    pub fn extract_with_type(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
        strip_root: bool,
    ) -> Result<()> {
        fs::create_dir_all(dest_dir)?;

        let root_dirs = if strip_root {
            match archive_type {
                ArchiveType::Zip => Self::zip_root_dirs(archive_path)?,
                ArchiveType::Tar | ArchiveType::TarGz => {
                    Self::tar_root_dirs(archive_path, archive_type)?
                }
            }
        } else {
            BTreeSet::new()
        };

        match archive_type {
            ArchiveType::Zip => Self::extract_zip(archive_path, dest_dir)?,
            ArchiveType::Tar | ArchiveType::TarGz => {
                Self::extract_tar(archive_path, archive_type, dest_dir)?
            }
        }

        if root_dirs.len() == 1 {
            if let Some(wrapper) = root_dirs.iter().next() {
                log::debug!("Stripping wrapper directory {}/", wrapper);
                Self::lift_wrapper(dest_dir, wrapper)?;
            }
        } else if strip_root {
            log::debug!(
                "Archive has {} top-level directories, leaving layout as-is",
                root_dirs.len()
            );
        }

        Ok(())
    }

    fn open_zip(archive_path: &Path) -> Result<zip::ZipArchive<BufReader<File>>> {
        let file = File::open(archive_path)?;
        zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| AxGetError::Extraction(format!("Failed to open zip: {}", e)))
    }

    /// Directory entries of a zip whose name has exactly one component
    fn zip_root_dirs(archive_path: &Path) -> Result<BTreeSet<String>> {
        let archive = Self::open_zip(archive_path)?;

        Ok(archive
            .file_names()
            .filter(|name| name.ends_with('/'))
            .map(|name| name.trim_end_matches('/'))
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    /// Extract a zip archive
    fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
        let mut archive = Self::open_zip(archive_path)?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| AxGetError::Extraction(format!("Failed to read zip entry: {}", e)))?;

            let relative_path = file.enclosed_name().ok_or_else(|| {
                AxGetError::Extraction(format!(
                    "Path traversal detected in archive: {}",
                    file.name()
                ))
            })?;

            if relative_path.as_os_str().is_empty() {
                continue;
            }

            let outpath = dest_dir.join(&relative_path);

            if file.is_dir() {
                fs::create_dir_all(&outpath)?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut file, &mut outfile)
                .map_err(|e| AxGetError::Extraction(format!("Failed to extract {}: {}", file.name(), e)))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
                }
            }
        }

        Ok(())
    }

    fn open_tar(archive_path: &Path, archive_type: ArchiveType) -> Result<tar::Archive<Box<dyn Read>>> {
        let reader = BufReader::new(File::open(archive_path)?);
        let reader: Box<dyn Read> = match archive_type {
            ArchiveType::TarGz => Box::new(GzDecoder::new(reader)),
            _ => Box::new(reader),
        };
        Ok(tar::Archive::new(reader))
    }

    /// Directory entries of a tar whose path has exactly one component
    fn tar_root_dirs(archive_path: &Path, archive_type: ArchiveType) -> Result<BTreeSet<String>> {
        let mut archive = Self::open_tar(archive_path, archive_type)?;
        let mut dirs = BTreeSet::new();

        for entry in archive
            .entries()
            .map_err(|e| AxGetError::Extraction(format!("Failed to read tar: {}", e)))?
        {
            let entry = entry
                .map_err(|e| AxGetError::Extraction(format!("Failed to read tar entry: {}", e)))?;

            if !entry.header().entry_type().is_dir() {
                continue;
            }

            let path = entry
                .path()
                .map_err(|e| AxGetError::Extraction(format!("Invalid path in tar: {}", e)))?;

            let mut normal = path.components().filter(|c| !matches!(c, Component::CurDir));
            if let (Some(Component::Normal(name)), None) = (normal.next(), normal.next()) {
                dirs.insert(name.to_string_lossy().into_owned());
            }
        }

        Ok(dirs)
    }

    /// Extract a tar or tar.gz archive
    fn extract_tar(archive_path: &Path, archive_type: ArchiveType, dest_dir: &Path) -> Result<()> {
        let mut archive = Self::open_tar(archive_path, archive_type)?;

        for entry in archive
            .entries()
            .map_err(|e| AxGetError::Extraction(format!("Failed to read tar: {}", e)))?
        {
            let mut entry = entry
                .map_err(|e| AxGetError::Extraction(format!("Failed to read tar entry: {}", e)))?;

            let unpacked = entry
                .unpack_in(dest_dir)
                .map_err(|e| AxGetError::Extraction(format!("Failed to extract: {}", e)))?;

            if !unpacked {
                let path = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
                return Err(AxGetError::Extraction(format!(
                    "Path traversal detected in archive: {}",
                    path
                )));
            }
        }

        Ok(())
    }

    /// Move every child of `dest_dir/wrapper` into `dest_dir`, then remove
    /// the emptied wrapper.
    fn lift_wrapper(dest_dir: &Path, wrapper: &str) -> Result<()> {
        let wrapper_dir = dest_dir.join(wrapper);
        let children = fs::read_dir(&wrapper_dir)?.collect::<std::io::Result<Vec<_>>>()?;

        for child in children {
            let target = dest_dir.join(child.file_name());
            if target.symlink_metadata().is_ok() {
                return Err(AxGetError::Extraction(format!(
                    "Cannot move {} out of {}/: {} already exists",
                    child.file_name().to_string_lossy(),
                    wrapper,
                    target.display()
                )));
            }
            fs::rename(child.path(), &target)?;
        }

        fs::remove_dir(&wrapper_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    enum Entry {
        Dir(&'static str),
        File(&'static str, &'static str),
    }

    fn write_zip(path: &Path, entries: &[Entry]) {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for entry in entries {
            match entry {
                Entry::Dir(name) => writer.add_directory(*name, options).unwrap(),
                Entry::File(name, body) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(body.as_bytes()).unwrap();
                }
            }
        }
        fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[Entry]) {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for entry in entries {
            let mut header = tar::Header::new_gnu();
            match entry {
                Entry::Dir(name) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder.append_data(&mut header, name, std::io::empty()).unwrap();
                }
                Entry::File(name, body) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_mode(0o644);
                    header.set_size(body.len() as u64);
                    builder.append_data(&mut header, name, body.as_bytes()).unwrap();
                }
            }
        }
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn entry_names(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_archive_type_from_magic() {
        assert_eq!(ArchiveType::from_magic(b"PK\x03\x04rest"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_magic(&[0x1f, 0x8b, 0x08]), Some(ArchiveType::TarGz));

        let mut tar_header = vec![0u8; 512];
        tar_header[257..262].copy_from_slice(b"ustar");
        assert_eq!(ArchiveType::from_magic(&tar_header), Some(ArchiveType::Tar));

        assert_eq!(ArchiveType::from_magic(b"<html>Not Found</html>"), None);
    }

    #[test]
    fn test_single_wrapper_is_stripped() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("webapp");
        write_zip(
            &archive,
            &[
                Entry::Dir("ow-7.3.1/"),
                Entry::File("ow-7.3.1/pom.xml", "<project/>"),
                Entry::Dir("ow-7.3.1/src/"),
                Entry::File("ow-7.3.1/src/App.java", "class App {}"),
            ],
        );

        let dest = tmp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest, true).unwrap();

        assert_eq!(
            entry_names(&dest),
            BTreeSet::from(["pom.xml".to_string(), "src".to_string()])
        );
        assert_eq!(fs::read_to_string(dest.join("pom.xml")).unwrap(), "<project/>");
        assert!(dest.join("src/App.java").is_file());
    }

    #[test]
    fn test_wrapper_kept_without_strip_root() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("webapp");
        write_zip(
            &archive,
            &[Entry::Dir("ow/"), Entry::File("ow/pom.xml", "x")],
        );

        let dest = tmp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest, false).unwrap();

        assert_eq!(entry_names(&dest), BTreeSet::from(["ow".to_string()]));
    }

    #[test]
    fn test_two_top_level_directories_left_unchanged() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("war");
        write_zip(
            &archive,
            &[
                Entry::Dir("WEB-INF/"),
                Entry::File("WEB-INF/web.xml", "<web-app/>"),
                Entry::Dir("img/"),
                Entry::File("img/axelor.png", "png"),
                Entry::File("index.html", "<html/>"),
            ],
        );

        let dest = tmp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest, true).unwrap();

        assert_eq!(
            entry_names(&dest),
            BTreeSet::from([
                "WEB-INF".to_string(),
                "img".to_string(),
                "index.html".to_string()
            ])
        );
    }

    #[test]
    fn test_no_directory_entries_left_unchanged() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("flat");
        // Nested file without an explicit directory entry does not count
        write_zip(
            &archive,
            &[Entry::File("wrap/a.txt", "a"), Entry::File("b.txt", "b")],
        );

        let dest = tmp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest, true).unwrap();

        assert_eq!(
            entry_names(&dest),
            BTreeSet::from(["wrap".to_string(), "b.txt".to_string()])
        );
    }

    #[test]
    fn test_flatten_collision_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("clash");
        write_zip(
            &archive,
            &[
                Entry::Dir("w/"),
                Entry::File("w/README", "inner"),
                Entry::File("README", "outer"),
            ],
        );

        let dest = tmp.path().join("out");
        let err = ArchiveExtractor::extract(&archive, &dest, true).unwrap_err();

        assert!(matches!(err, AxGetError::Extraction(ref msg) if msg.contains("already exists")));
        assert_eq!(fs::read_to_string(dest.join("README")).unwrap(), "outer");
    }

    #[test]
    fn test_tar_gz_wrapper_is_stripped() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("suite");
        write_tar_gz(
            &archive,
            &[
                Entry::Dir("aos-7.3.1/"),
                Entry::File("aos-7.3.1/build.gradle", "apply plugin"),
                Entry::Dir("aos-7.3.1/axelor-base/"),
                Entry::File("aos-7.3.1/axelor-base/build.gradle", "base"),
            ],
        );

        let dest = tmp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest, true).unwrap();

        assert_eq!(
            entry_names(&dest),
            BTreeSet::from(["build.gradle".to_string(), "axelor-base".to_string()])
        );
    }

    #[test]
    fn test_malformed_zip_is_an_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("broken");
        fs::write(&archive, b"PK\x03\x04this is not really a zip").unwrap();

        let err = ArchiveExtractor::extract(&archive, &tmp.path().join("out"), true).unwrap_err();
        assert!(matches!(err, AxGetError::Extraction(_)));
    }

    #[test]
    fn test_unknown_format_is_an_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("page");
        fs::write(&archive, b"<html>Not Found</html>").unwrap();

        let err = ArchiveExtractor::extract(&archive, &tmp.path().join("out"), true).unwrap_err();
        assert!(matches!(err, AxGetError::Extraction(ref msg) if msg.contains("Unrecognized")));
    }
}
