use crate::config::RegistryEndpoint;
use crate::error::{Error, Result};
use crate::models::{Package, PackageFile, PackageType};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

// Sent as `PRIVATE-TOKEN`; header names are case-insensitive
pub const TOKEN_HEADER: &str = "private-token";
pub const NEXT_PAGE_HEADER: &str = "x-next-page";

/// HTTP client bound to a single registry project.
///
/// The access token is installed as a default header, so every request made
/// through this client carries it and no other client ever sees it.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    projects_url: String,
    per_page: u32,
}

impl RegistryClient {
    pub fn new(endpoint: &RegistryEndpoint, per_page: u32) -> Result<Self> {
        let mut token = HeaderValue::from_str(&endpoint.private_token)
            .map_err(|_| Error::config("private_token contains invalid header characters"))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            projects_url: projects_url(endpoint),
            per_page,
        })
    }

    /// `{base}/api/v4/projects/{project}`
    pub fn projects_url(&self) -> &str {
        &self.projects_url
    }

    pub fn packages_url(&self) -> String {
        format!("{}/packages", self.projects_url)
    }

    pub fn package_files_url(&self, package_id: u64) -> String {
        format!("{}/packages/{}/package_files", self.projects_url, package_id)
    }

    /// Location of a package file in this project, used both to download
    /// from the source and to upload to the destination
    pub fn file_url(&self, package: &Package, file: &PackageFile) -> String {
        format!(
            "{}/packages/{}/{}/{}/{}",
            self.projects_url,
            package.package_type.as_path_segment(),
            package.name,
            package.version,
            file.file_name
        )
    }

    pub async fn list_packages(&self, package_type: PackageType) -> Result<Vec<Package>> {
        let url = self.packages_url();
        self.get_all(&url, &[("package_type", package_type.as_path_segment())])
            .await
    }

    pub async fn list_package_files(&self, package_id: u64) -> Result<Vec<PackageFile>> {
        let url = self.package_files_url(package_id);
        self.get_all(&url, &[]).await
    }

    /// Fetch raw file bytes
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transfer(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transfer(url, format!("HTTP {status}: {body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transfer(url, e))?;
        Ok(bytes.to_vec())
    }

    /// PUT raw file bytes
    pub async fn upload(&self, url: &str, data: Vec<u8>) -> Result<()> {
        let response = self
            .http
            .put(url)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| Error::transfer(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transfer(url, format!("HTTP {status}: {body}")));
        }

        Ok(())
    }

    /// GET a JSON array, following GitLab's `x-next-page` pagination header
    async fn get_all<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let per_page = self.per_page.to_string();
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_str = page.to_string();
            let response = self
                .http
                .get(url)
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page_str.as_str())])
                .send()
                .await
                .map_err(|e| Error::protocol(url, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::protocol(url, format!("HTTP {status}: {body}")));
            }

            let next_page = next_page(response.headers());
            let body = response.bytes().await.map_err(|e| Error::protocol(url, e))?;
            let mut batch: Vec<T> = serde_json::from_slice(&body)
                .map_err(|e| Error::protocol(url, format!("invalid response body: {e}")))?;
            items.append(&mut batch);

            match next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(items)
    }
}

fn projects_url(endpoint: &RegistryEndpoint) -> String {
    // Path-style project ids must be URL-encoded
    let project = endpoint.project_id.trim().replace('/', "%2F");
    format!(
        "{}/api/v4/projects/{}",
        endpoint.base_address.trim_end_matches('/'),
        project
    )
}

fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
