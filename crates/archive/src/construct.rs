use crate::ArchiveFormat;
use crate::error::{Error, ErrorKind};
use std::str::FromStr;

impl FromStr for ArchiveFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "targz" => Ok(ArchiveFormat::TarGz),
            "tar.bz2" | "tbz2" | "tbz" | "tarbz2" => Ok(ArchiveFormat::TarBz2),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ArchiveFormat;
    use rstest::rstest;

    #[rstest]
    #[case("zip", ArchiveFormat::Zip)]
    #[case("ZIP", ArchiveFormat::Zip)]
    #[case(".zip", ArchiveFormat::Zip)]
    #[case("tar.gz", ArchiveFormat::TarGz)]
    #[case("tgz", ArchiveFormat::TarGz)]
    #[case("tar.bz2", ArchiveFormat::TarBz2)]
    #[case(" tbz2 ", ArchiveFormat::TarBz2)]
    fn test_from_str(#[case] test: &str, #[case] expected: ArchiveFormat) {
        assert_eq!(test.parse::<ArchiveFormat>().unwrap(), expected);
    }

    #[rstest]
    #[case("rar")]
    #[case("tar")]
    #[case("")]
    fn test_from_str_invalid(#[case] test: &str) {
        assert!(test.parse::<ArchiveFormat>().is_err());
    }
}
