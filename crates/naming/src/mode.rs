use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// How the naming service is asked to look at a file.
///
/// This is a single setting for a whole job, not a per-file choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// Name from the current file name and a text excerpt of the content.
    #[default]
    Text,
    /// Name from the image itself.
    Image,
}

impl NamingMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingMode::Text => "text",
            NamingMode::Image => "image",
        }
    }
}

impl Display for NamingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(NamingMode::Text),
            "image" => Ok(NamingMode::Image),
            _ => exn::bail!(ErrorKind::InvalidMode(s.to_string())),
        }
    }
}
