//! The migration pipeline: list, download, verify, upload.
//!
//! Everything runs strictly in sequence. A file is fully handled before the
//! next one starts and a package before the next package. Listing and upload
//! failures abort the run; verification problems are only recorded.

use crate::config::{Config, MigrationConfig};
use crate::error::Result;
use crate::models::{Package, PackageFile};
use crate::registry::RegistryClient;
use byte_unit::{Byte, UnitType};
use derive_more::Display;
use sha2::Digest;

/// A non-fatal problem noticed while verifying a downloaded file
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Anomaly {
    #[display("{file}: downloaded file has wrong size {actual} (expected: {expected})")]
    SizeMismatch {
        file: String,
        expected: u64,
        actual: u64,
    },

    #[display("{file}: {algorithm} mismatch {actual} (expected: {expected})")]
    ChecksumMismatch {
        file: String,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },
}

/// What a pipeline pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub packages: usize,
    pub files: usize,
    pub bytes_downloaded: u64,
    pub uploaded: usize,
    /// Files that would have been uploaded without dry run
    pub skipped_dry_run: usize,
    pub anomalies: Vec<Anomaly>,
}

/// A source package together with its files, as listed
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub package: Package,
    pub files: Vec<PackageFile>,
}

impl PackageEntry {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

pub struct TransferPipeline {
    source: RegistryClient,
    destination: RegistryClient,
    options: MigrationConfig,
}

impl TransferPipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let source = RegistryClient::new(&config.source, config.migration.per_page)?;
        let destination = RegistryClient::new(&config.destination, config.migration.per_page)?;
        Ok(Self::with_clients(source, destination, config.migration.clone()))
    }

    pub fn with_clients(
        source: RegistryClient,
        destination: RegistryClient,
        options: MigrationConfig,
    ) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    pub fn options(&self) -> &MigrationConfig {
        &self.options
    }

    /// Migrate every package of every configured type
    pub async fn run(&self) -> Result<TransferReport> {
        let mut report = TransferReport::default();

        if self.options.dry_run {
            tracing::info!("Dry run: nothing will be uploaded");
        }

        for &package_type in &self.options.package_types {
            let packages = self.source.list_packages(package_type).await?;
            tracing::info!(
                package_type = %package_type,
                count = packages.len(),
                "Listed source packages"
            );

            for package in &packages {
                self.transfer_package(package, &mut report).await?;
            }
        }

        tracing::info!(
            packages = report.packages,
            files = report.files,
            uploaded = report.uploaded,
            anomalies = report.anomalies.len(),
            "Transfer finished, {} downloaded",
            format_size(report.bytes_downloaded)
        );

        Ok(report)
    }

    /// List source packages and their files without downloading anything
    pub async fn inventory(&self) -> Result<Vec<PackageEntry>> {
        let mut entries = Vec::new();
        for &package_type in &self.options.package_types {
            for package in self.source.list_packages(package_type).await? {
                let files = self.source.list_package_files(package.id).await?;
                entries.push(PackageEntry { package, files });
            }
        }
        Ok(entries)
    }

    async fn transfer_package(&self, package: &Package, report: &mut TransferReport) -> Result<()> {
        report.packages += 1;
        tracing::info!(
            "{} | {} | {} | {} | {}",
            package.package_type,
            package.id,
            package.name,
            package.version,
            package.status
        );

        let files = self.source.list_package_files(package.id).await?;
        for file in &files {
            self.transfer_file(package, file, report).await?;
        }
        Ok(())
    }

    async fn transfer_file(
        &self,
        package: &Package,
        file: &PackageFile,
        report: &mut TransferReport,
    ) -> Result<()> {
        report.files += 1;
        tracing::info!("\t{} | {}", file.file_name, file.file_sha1);

        let download_url = self.source.file_url(package, file);
        tracing::debug!(url = %download_url, "Downloading");

        let data = self.source.download(&download_url).await?;
        report.bytes_downloaded += data.len() as u64;

        for anomaly in verify(file, &data, self.options.verify_checksums) {
            tracing::warn!("error: {anomaly}");
            report.anomalies.push(anomaly);
        }

        let upload_url = self.destination.file_url(package, file);
        tracing::debug!(url = %upload_url, "Upload target");

        if self.options.dry_run {
            report.skipped_dry_run += 1;
            return Ok(());
        }

        self.destination.upload(&upload_url, data).await?;
        report.uploaded += 1;
        Ok(())
    }
}

/// Compare downloaded content with what the listing declared.
///
/// The size is always checked. Digests are only compared when
/// `verify_checksums` is set; SHA-1 is reported by GitLab but not checked.
pub fn verify(file: &PackageFile, data: &[u8], verify_checksums: bool) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    let actual = data.len() as u64;
    if actual != file.size {
        anomalies.push(Anomaly::SizeMismatch {
            file: file.file_name.clone(),
            expected: file.size,
            actual,
        });
    }

    if !verify_checksums {
        return anomalies;
    }

    let md5 = format!("{:x}", md5::compute(data));
    if !md5.eq_ignore_ascii_case(&file.file_md5) {
        anomalies.push(Anomaly::ChecksumMismatch {
            file: file.file_name.clone(),
            algorithm: "MD5",
            expected: file.file_md5.clone(),
            actual: md5,
        });
    }

    if let Some(expected) = &file.file_sha256 {
        let sha256 = format!("{:x}", sha2::Sha256::digest(data));
        if !sha256.eq_ignore_ascii_case(expected) {
            anomalies.push(Anomaly::ChecksumMismatch {
                file: file.file_name.clone(),
                algorithm: "SHA-256",
                expected: expected.clone(),
                actual: sha256,
            });
        }
    }

    anomalies
}

/// Human readable binary size, e.g. `4.2 MiB`
pub fn format_size(bytes: u64) -> String {
    let byte = Byte::from_u64(bytes);
    format!("{:.1}", byte.get_appropriate_unit(UnitType::Binary))
}
