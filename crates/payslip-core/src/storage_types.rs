use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Destination backend types
///
/// Defined in core because configuration selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationBackend {
    /// Google Drive folder tree
    Drive,
    /// Local (or mounted) directory tree with the same layout
    Local,
}

impl FromStr for DestinationBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drive" | "google-drive" | "gdrive" => Ok(DestinationBackend::Drive),
            "local" => Ok(DestinationBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid destination backend: {}", s)),
        }
    }
}

impl Display for DestinationBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DestinationBackend::Drive => write!(f, "drive"),
            DestinationBackend::Local => write!(f, "local"),
        }
    }
}
