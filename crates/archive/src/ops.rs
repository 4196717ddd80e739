//! Archive Operations

use crate::ArchiveFormat;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, write::GzEncoder};
use std::io::{Cursor, Write};
use tracing::instrument;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

const GZIP_LEVEL: GzCompression = GzCompression::best();
const BZIP2_LEVEL: BzCompression = BzCompression::best();
// Permissions recorded for every entry; the archive only carries plain files.
const ENTRY_MODE: u32 = 0o644;

impl ArchiveFormat {
    /// Package ordered `(name, content)` pairs into a single in-memory archive.
    ///
    /// Entries are written in iteration order. Names must be non-empty and
    /// must not contain path separators; callers are expected to have
    /// disambiguated duplicates with [`unique_names`](crate::unique_names)
    /// beforehand.
    ///
    /// # Examples
    ///
    /// ```
    /// use renamer_archive::ArchiveFormat;
    ///
    /// let bytes = ArchiveFormat::Zip
    ///     .build([("A.txt".to_string(), b"alpha".to_vec()), ("B.txt".to_string(), b"beta".to_vec())])
    ///     .unwrap();
    /// assert!(bytes.starts_with(b"PK"));
    /// ```
    #[instrument(skip_all, fields(format = %self, entries, size))]
    pub fn build(&self, entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Result<Vec<u8>> {
        let entries: Vec<(String, Vec<u8>)> = entries.into_iter().collect();
        for (name, _) in &entries {
            validate_entry_name(name)?;
        }
        tracing::Span::current().record("entries", entries.len());
        let bytes = match self {
            ArchiveFormat::Zip => build_zip(&entries)?,
            ArchiveFormat::TarGz => {
                let encoder = GzEncoder::new(Vec::new(), GZIP_LEVEL);
                build_tar(encoder, &entries)?.finish().or_raise(|| ErrorKind::Encoder)?
            },
            ArchiveFormat::TarBz2 => {
                let encoder = BzEncoder::new(Vec::new(), BZIP2_LEVEL);
                build_tar(encoder, &entries)?.finish().or_raise(|| ErrorKind::Encoder)?
            },
        };
        tracing::Span::current().record("size", bytes.len());
        Ok(bytes)
    }
}

fn validate_entry_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
        exn::bail!(ErrorKind::InvalidEntryName(name.to_string()));
    }
    Ok(())
}

fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated).unix_permissions(ENTRY_MODE);
    for (name, data) in entries {
        writer.start_file(name.as_str(), options).or_raise(|| ErrorKind::Encoder)?;
        writer.write_all(data).or_raise(|| ErrorKind::Encoder)?;
    }
    Ok(writer.finish().or_raise(|| ErrorKind::Encoder)?.into_inner())
}

fn build_tar<W: Write>(inner: W, entries: &[(String, Vec<u8>)]) -> Result<W> {
    let mut builder = tar::Builder::new(inner);
    let mtime = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(ENTRY_MODE);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice()).or_raise(|| ErrorKind::Encoder)?;
    }
    builder.into_inner().or_raise(|| ErrorKind::Encoder)
}
