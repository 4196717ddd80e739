use crate::ArchiveFormat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for ArchiveFormat {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl ArchiveFormat {
    /// Returns the file extension (including the leading dot) for this format.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarBz2 => ".tar.bz2",
        }
    }

    /// Returns the short name used in configuration.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
        }
    }

    /// Returns the MIME type to send alongside a download.
    #[inline]
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::TarGz => "application/gzip",
            ArchiveFormat::TarBz2 => "application/x-bzip2",
        }
    }

    /// Appends this format's extension to a file stem.
    #[must_use]
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}{}", self.extension())
    }
}

impl Serialize for ArchiveFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArchiveFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: crate::error::Error| serde::de::Error::custom((*e).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::ArchiveFormat;
    use rstest::rstest;

    #[rstest]
    #[case(ArchiveFormat::Zip, "renamed_files.zip", "application/zip")]
    #[case(ArchiveFormat::TarGz, "renamed_files.tar.gz", "application/gzip")]
    #[case(ArchiveFormat::TarBz2, "renamed_files.tar.bz2", "application/x-bzip2")]
    fn test_file_name_and_content_type(
        #[case] format: ArchiveFormat,
        #[case] file_name: &str,
        #[case] content_type: &str,
    ) {
        assert_eq!(format.file_name("renamed_files"), file_name);
        assert_eq!(format.content_type(), content_type);
        // Display round-trips through FromStr.
        assert_eq!(format.to_string().parse::<ArchiveFormat>().unwrap(), format);
    }
}
