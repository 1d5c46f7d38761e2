mod package;

pub use package::{Package, PackageFile, PackageStatus, PackageType, unique_package_types};
