use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package formats that can be migrated between projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Maven,
    Nuget,
}

impl PackageType {
    pub const ALL: [PackageType; 2] = [PackageType::Maven, PackageType::Nuget];

    /// Segment used in `package_type=` queries and in package file URLs
    pub fn as_path_segment(self) -> &'static str {
        match self {
            PackageType::Maven => "maven",
            PackageType::Nuget => "nuget",
        }
    }
}

/// Package types in first-seen order, without repeats
pub fn unique_package_types(types: impl IntoIterator<Item = PackageType>) -> Vec<PackageType> {
    let mut out: Vec<PackageType> = Vec::new();
    for t in types {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Default,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageStatus::Default => f.write_str("default"),
        }
    }
}

/// A package as returned by `GET /projects/:id/packages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: u64,
    /// Package name, e.g. `com/example/lib` for Maven
    pub name: String,
    pub version: String,
    pub package_type: PackageType,
    pub status: PackageStatus,
}

/// One physical file of a package, as returned by
/// `GET /projects/:id/packages/:package_id/package_files`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageFile {
    pub id: u64,
    pub package_id: u64,
    pub created_at: DateTime<FixedOffset>,
    pub file_name: String,
    /// Declared size in bytes
    pub size: u64,
    pub file_md5: String,
    pub file_sha1: String,
    #[serde(default)]
    pub file_sha256: Option<String>,
}
