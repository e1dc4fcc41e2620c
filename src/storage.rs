//! # Input Localization
//!
//! Resolves dataset inputs for the CLI. The slice engine itself only opens
//! local files (the array-store library works on file handles), so remote
//! inputs are fetched to a temporary file first:
//!
//! - **Local paths**: used in place, nothing is copied.
//! - **S3 objects** (`s3://bucket/key`): downloaded through the AWS SDK
//!   into a `tempfile::NamedTempFile` that lives as long as the returned
//!   [`InputSource`].
//!
//! Credentials come from the environment / AWS configuration the SDK
//! already understands. This layer is read-only; the façade never writes a
//! dataset back.

use std::io::Write;
use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use log::debug;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;

/// Errors that can occur while resolving an input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS S3 GetObject error: {0}")]
    S3GetObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>,
    ),

    #[error("AWS S3 HeadObject error: {0}")]
    S3HeadObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>,
    ),

    #[error("AWS ByteStream error: {0}")]
    ByteStream(String),

    #[error("Invalid S3 path format: {0}")]
    InvalidS3Path(String),

    #[error("Input not found: {0}")]
    NotFound(String),
}

/// Result type for input resolution.
pub type InputResult<T> = Result<T, InputError>;

/// Read access to one input location.
///
/// Implementations are interchangeable behind the same interface; all
/// operations are async so remote backends stay responsive.
#[async_trait::async_trait]
pub trait InputFetcher: Send + Sync {
    /// Reads the entire input.
    ///
    /// # Errors
    /// Returns `InputError::NotFound` for missing inputs.
    async fn fetch(&self, path: &str) -> InputResult<Vec<u8>>;

    /// Checks whether the input exists.
    async fn exists(&self, path: &str) -> InputResult<bool>;
}

/// Local filesystem fetcher.
#[derive(Debug, Clone)]
pub struct LocalFetcher;

#[async_trait::async_trait]
impl InputFetcher for LocalFetcher {
    async fn fetch(&self, path: &str) -> InputResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(InputError::NotFound(path.to_string()))
            }
            Err(e) => Err(InputError::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> InputResult<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(InputError::Io(e)),
        }
    }
}

/// Amazon S3 fetcher.
///
/// Credentials load from environment variables, the AWS credentials file,
/// or IAM roles when running on AWS infrastructure.
#[derive(Debug, Clone)]
pub struct S3Fetcher {
    client: S3Client,
}

impl S3Fetcher {
    /// Creates a fetcher with the default AWS configuration.
    pub async fn new() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        S3Fetcher {
            client: S3Client::new(&config),
        }
    }

    /// Creates a fetcher from an existing SDK configuration.
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        S3Fetcher {
            client: S3Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl InputFetcher for S3Fetcher {
    async fn fetch(&self, path: &str) -> InputResult<Vec<u8>> {
        let (bucket, key) = parse_s3_path(path)?;

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                aws_sdk_s3::error::SdkError::ServiceError(service_err)
                    if service_err.err().is_no_such_key() =>
                {
                    InputError::NotFound(path.to_string())
                }
                _ => InputError::S3GetObject(e),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| InputError::ByteStream(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn exists(&self, path: &str) -> InputResult<bool> {
        let (bucket, key) = parse_s3_path(path)?;

        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(aws_sdk_s3::error::SdkError::ServiceError(service_err))
                if service_err.err().is_not_found() =>
            {
                Ok(false)
            }
            Err(e) => Err(InputError::S3HeadObject(e)),
        }
    }
}

/// Picks the fetcher matching a path's scheme.
pub async fn fetcher_for(path: &str) -> Box<dyn InputFetcher> {
    if path.starts_with("s3://") {
        Box::new(S3Fetcher::new().await)
    } else {
        Box::new(LocalFetcher)
    }
}

/// A dataset input resolved to something openable on the local filesystem.
///
/// Keep the source alive while the dataset is open: dropping it deletes the
/// temporary file a remote input was localized into.
#[derive(Debug)]
pub enum InputSource {
    Local(PathBuf),
    Remote {
        origin: String,
        local: NamedTempFile,
    },
}

impl InputSource {
    /// The local path to hand to the reader.
    pub fn path(&self) -> &Path {
        match self {
            InputSource::Local(path) => path,
            InputSource::Remote { local, .. } => local.path(),
        }
    }

    /// The spelling the user supplied, for messages.
    pub fn origin(&self) -> String {
        match self {
            InputSource::Local(path) => path.display().to_string(),
            InputSource::Remote { origin, .. } => origin.clone(),
        }
    }
}

/// Resolves a user-supplied input to a local file, fetching it if remote.
pub async fn resolve_input(input: &str) -> InputResult<InputSource> {
    let fetcher = fetcher_for(input).await;
    if input.starts_with("s3://") {
        let data = fetcher.fetch(input).await?;
        let mut local = NamedTempFile::with_suffix(".nc")?;
        local.write_all(&data)?;
        local.flush()?;
        debug!(
            "localized '{}' to {} ({} bytes)",
            input,
            local.path().display(),
            data.len()
        );
        Ok(InputSource::Remote {
            origin: input.to_string(),
            local,
        })
    } else {
        if !fetcher.exists(input).await? {
            return Err(InputError::NotFound(input.to_string()));
        }
        Ok(InputSource::Local(PathBuf::from(input)))
    }
}

/// Splits `s3://bucket/key` into its bucket and key components.
pub fn parse_s3_path(s3_path: &str) -> InputResult<(String, String)> {
    if !s3_path.starts_with("s3://") {
        return Err(InputError::InvalidS3Path(format!(
            "S3 path must start with 's3://': {s3_path}"
        )));
    }

    let path_without_scheme = &s3_path[5..];
    let parts: Vec<&str> = path_without_scheme.splitn(2, '/').collect();

    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(InputError::InvalidS3Path(format!(
            "Invalid S3 path format. Expected 's3://bucket/key': {s3_path}"
        )));
    }

    Ok((parts[0].to_string(), parts[1].to_string()))
}
