//! CBZ archive assembly.
//!
//! One archive per volume. Entries are renamed to a 4-digit sequential index
//! that runs across the whole volume, keeping only the original extension.
//! Pages are written in the order given, never re-read from a directory.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// File name component used for the volume without a label.
const UNLABELED_VOLUME: &str = "none";

/// Errors raised while writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Reading a page or writing the archive file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The file being read or written.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The zip writer rejected an entry or could not finish.
    #[error("zip error writing {path}: {source}")]
    Zip {
        /// The archive file.
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}

/// A downloaded page file, not yet opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    /// Full path of the file.
    pub path: PathBuf,
    /// Original file name, used only for its extension.
    pub name: String,
}

impl PageSource {
    /// Page at `path`, named after its final path component.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Opens the file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the file cannot be opened.
    pub fn open(self) -> Result<(File, String), ArchiveError> {
        let file = File::open(&self.path).map_err(|e| ArchiveError::io(&self.path, e))?;
        Ok((file, self.name))
    }
}

/// Archive file name for a volume: `{base}-volume-{label}.cbz`.
///
/// The empty label becomes `none`.
#[must_use]
pub fn archive_file_name(base_name: &str, label: &str) -> String {
    let label = if label.is_empty() {
        UNLABELED_VOLUME
    } else {
        label
    };
    format!("{base_name}-volume-{label}.cbz")
}

/// Writes the given pages, in order, into a new archive at `output`.
///
/// Each reader is dropped as soon as its bytes are copied. The parent
/// directory is created if missing. Returns the number of entries written.
///
/// # Errors
///
/// Returns [`ArchiveError`] on the first failing page or write. The archive
/// may be left partially written.
pub fn write_archive<I, R>(output: &Path, pages: I) -> Result<usize, ArchiveError>
where
    I: IntoIterator<Item = Result<(R, String), ArchiveError>>,
    R: Read,
{
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }

    let file = File::create(output).map_err(|e| ArchiveError::io(output, e))?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut index = 0usize;
    for page in pages {
        let (mut reader, name) = page?;
        index += 1;
        let entry = entry_name(index, &name);

        zip.start_file(entry.clone(), options)
            .map_err(|e| ArchiveError::zip(output, e))?;
        io::copy(&mut reader, &mut zip).map_err(|e| ArchiveError::io(output, e))?;
        debug!(entry = %entry, source = %name, "added page");
    }

    let file = zip.finish().map_err(|e| ArchiveError::zip(output, e))?;
    file.sync_all().map_err(|e| ArchiveError::io(output, e))?;
    Ok(index)
}

/// Builds the archive for one volume from its pages, already in volume order.
///
/// Files are opened one at a time as the archive is written.
///
/// # Errors
///
/// Returns [`ArchiveError`] if a page cannot be read or the archive cannot be
/// written.
#[instrument(skip(pages, output), fields(pages = pages.len(), output = %output.display()))]
pub fn build<P: AsRef<Path>>(
    label: &str,
    pages: &[P],
    output: &Path,
) -> Result<usize, ArchiveError> {
    let sources = pages.iter().map(|p| PageSource::new(p.as_ref()).open());
    let entries = write_archive(output, sources)?;
    debug!(entries, "archive written");
    Ok(entries)
}

fn entry_name(index: usize, original: &str) -> String {
    match Path::new(original).extension() {
        Some(ext) => format!("{index:04}.{}", ext.to_string_lossy()),
        None => format!("{index:04}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;
    use zip::ZipArchive;

    use super::*;
    use crate::pages::page_file_name;

    fn entries_of(path: &Path) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut body = String::new();
                entry.read_to_string(&mut body).unwrap();
                (entry.name().to_string(), body)
            })
            .collect()
    }

    fn chapter_pages(root: &Path, name: &str, pages: &[&str]) -> Vec<PathBuf> {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        pages
            .iter()
            .map(|page| {
                let path = dir.join(page);
                std::fs::write(&path, format!("{name}/{page}")).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name("berserk", "1"), "berserk-volume-1.cbz");
        assert_eq!(archive_file_name("berserk", "1_2"), "berserk-volume-1_2.cbz");
        assert_eq!(archive_file_name("berserk", ""), "berserk-volume-none.cbz");
    }

    #[test]
    fn test_entry_name_keeps_extension_only() {
        assert_eq!(entry_name(1, "001_abc.jpg"), "0001.jpg");
        assert_eq!(entry_name(27, "x.tar.png"), "0027.png");
        assert_eq!(entry_name(3, "noext"), "0003");
    }

    #[test]
    fn test_write_archive_numbers_entries_sequentially() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("nested/out/vol.cbz");
        let pages = vec![
            Ok((Cursor::new(b"one".to_vec()), "zzz.png".to_string())),
            Ok((Cursor::new(b"two".to_vec()), "aaa.jpg".to_string())),
        ];

        let written = write_archive(&output, pages).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            entries_of(&output),
            vec![
                ("0001.png".to_string(), "one".to_string()),
                ("0002.jpg".to_string(), "two".to_string()),
            ]
        );
    }

    #[test]
    fn test_write_archive_entries_are_deflated() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("vol.cbz");
        let pages = vec![Ok((Cursor::new(vec![0u8; 4096]), "p.jpg".to_string()))];
        write_archive(&output, pages).unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    }

    #[test]
    fn test_write_archive_stops_on_failing_page() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("vol.cbz");
        let pages = vec![
            Ok((Cursor::new(b"one".to_vec()), "a.jpg".to_string())),
            Err(ArchiveError::io(
                "missing.jpg",
                io::Error::new(io::ErrorKind::NotFound, "gone"),
            )),
        ];

        let result = write_archive(&output, pages);
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
    }

    #[test]
    fn test_page_source_name_is_file_name() {
        let source = PageSource::new("/tmp/chapter/007_x.png");
        assert_eq!(source.name, "007_x.png");
        assert_eq!(source.path, PathBuf::from("/tmp/chapter/007_x.png"));
    }

    #[test]
    fn test_build_concatenates_chapters_without_reset() {
        let tmp = TempDir::new().unwrap();
        let mut pages = chapter_pages(
            tmp.path(),
            "c1",
            &["001_a.jpg", "002_b.jpg", "003_c.jpg"],
        );
        pages.extend(chapter_pages(tmp.path(), "c2", &["001_d.jpg", "002_e.jpg"]));
        let output = tmp.path().join("out").join(archive_file_name("w", "1"));

        let written = build("1", &pages, &output).unwrap();

        assert_eq!(written, 5);
        let entries = entries_of(&output);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["0001.jpg", "0002.jpg", "0003.jpg", "0004.jpg", "0005.jpg"]
        );
        assert_eq!(entries[3].1, "c2/001_d.jpg");
    }

    #[test]
    fn test_build_keeps_given_order_past_a_thousand_pages() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("long");
        std::fs::create_dir(&dir).unwrap();
        let pages: Vec<PathBuf> = (0..1001)
            .map(|i| {
                let path = dir.join(page_file_name(i, "p.jpg"));
                std::fs::write(&path, i.to_string()).unwrap();
                path
            })
            .collect();
        let output = tmp.path().join("long.cbz");

        assert_eq!(build("1", &pages, &output).unwrap(), 1001);

        let entries = entries_of(&output);
        for (position, (name, body)) in entries.iter().enumerate() {
            assert_eq!(name, &format!("{:04}.jpg", position + 1));
            assert_eq!(body, &position.to_string());
        }
        assert_eq!(entries[1000].1, "1000");
    }

    #[test]
    fn test_build_missing_page_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("vol.cbz");
        let result = build("1", &[tmp.path().join("absent.jpg")], &output);
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
    }

    #[test]
    fn test_build_with_no_pages_writes_empty_archive() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("empty.cbz");

        assert_eq!(build::<PathBuf>("1", &[], &output).unwrap(), 0);
        assert!(entries_of(&output).is_empty());
    }
}
