//! Archive packaging for renamed batches.
//!
//! This crate wraps the zip and tar writers behind a unified [`ArchiveFormat`]
//! enum, providing:
//!
//! - **Format selection** from configuration strings ([`FromStr`](std::str::FromStr))
//! - **Packaging** of ordered `(name, content)` pairs into a single in-memory
//!   archive ([`ArchiveFormat::build`])
//! - **Name disambiguation** so two entries renamed to the same thing both
//!   survive packaging ([`unique_names`])
//!
//! Zip is the default and matches what browsers expect from a "download all"
//! button. The tar variants reuse the gzip/bzip2 encoders at their best
//! compression level.

mod construct;
pub mod error;
mod ops;
mod unique;
mod util;

pub use crate::unique::unique_names;

/// A supported archive format. Defaults to [`Zip`](Self::Zip).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Zip with deflate (.zip)
    #[default]
    Zip,
    /// Gzip-compressed tarball (.tar.gz)
    TarGz,
    /// Bzip2-compressed tarball (.tar.bz2)
    TarBz2,
}

#[cfg(test)]
mod tests {
    use crate::ArchiveFormat;

    #[test]
    fn archive_format_default() {
        assert_eq!(ArchiveFormat::default(), ArchiveFormat::Zip);
    }
}
