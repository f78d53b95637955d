use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tubegrab_core::models::settings::{ProxySettings, TransferSettings};

use crate::core::filename::{output_path, part_path_for};
use crate::core::http_client;
use crate::models::media::{TransferOutcome, TransferProgress};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {status} from media host")]
    HttpStatus { status: u16 },
    #[error("transfer did not finish within {0:?}")]
    Timeout(Duration),
    #[error("downloaded file is empty")]
    EmptyFile,
    #[error("body ended early: expected {expected} bytes, received {actual}")]
    Incomplete { expected: u64, actual: u64 },
    #[error("server returned {0} instead of media, the URL may have expired")]
    UnexpectedContent(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("write error (disk full?): {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::HttpStatus { .. } => "HttpStatusError",
            TransferError::Timeout(_) => "Timeout",
            TransferError::EmptyFile => "EmptyFile",
            TransferError::Incomplete { .. } => "Incomplete",
            TransferError::UnexpectedContent(_) => "UnexpectedContent",
            TransferError::Request(_) => "RequestError",
            TransferError::Io(_) => "IOError",
        }
    }
}

/// Percentage with two decimals. Only a finished body reports 100.
pub fn percent_of(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    if downloaded >= total {
        return 100.0;
    }
    let raw = (downloaded as f64 / total as f64) * 100.0;
    ((raw * 100.0).round() / 100.0).min(99.99)
}

/// Streams one resolved asset to `<dir>/<id>.<ext>`.
#[derive(Clone)]
pub struct DirectDownloader {
    client: reqwest::Client,
    settings: TransferSettings,
}

impl DirectDownloader {
    pub fn new(settings: TransferSettings, proxy: &ProxySettings) -> anyhow::Result<Self> {
        let client = http_client::build_media_client(&settings, proxy)?;
        Ok(Self { client, settings })
    }

    pub async fn download(
        &self,
        url: &str,
        dir: &Path,
        id: &str,
        progress_tx: mpsc::Sender<TransferProgress>,
    ) -> Result<TransferOutcome, TransferError> {
        tokio::fs::create_dir_all(dir).await?;
        let output = output_path(dir, id, &self.settings.file_extension);
        let part_path = part_path_for(&output);
        let limit = self.settings.timeout();

        let streamed = match tokio::time::timeout(
            limit,
            self.stream_to_file(url, &part_path, &progress_tx),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(TransferError::Timeout(limit)),
        };

        let result = match streamed {
            Ok(bytes) => {
                tracing::debug!("[direct] {} streamed {} bytes", id, bytes);
                finalize(&part_path, &output).await
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = tokio::fs::remove_file(&part_path).await;
        }
        result
    }

    async fn stream_to_file(
        &self,
        url: &str,
        part_path: &Path,
        progress_tx: &mpsc::Sender<TransferProgress>,
    ) -> Result<u64, TransferError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::HttpStatus {
                status: status.as_u16(),
            });
        }

        if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            if let Ok(ct_str) = ct.to_str() {
                if ct_str.contains("text/html") {
                    return Err(TransferError::UnexpectedContent(ct_str.to_string()));
                }
            }
        }

        let total_size = response.content_length().filter(|n| *n > 0);
        let chunk_size = self.settings.chunk_size.max(1);

        let file = tokio::fs::File::create(part_path).await?;
        let mut file = tokio::io::BufWriter::with_capacity(256 * 1024, file);
        let mut downloaded: u64 = 0;
        let mut last_percent = 0.0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => match total_size {
                    Some(expected) if downloaded < expected => {
                        tracing::warn!("[direct] body cut off after {} bytes: {}", downloaded, e);
                        return Err(TransferError::Incomplete {
                            expected,
                            actual: downloaded,
                        });
                    }
                    _ => return Err(e.into()),
                },
            };
            for slice in chunk.chunks(chunk_size) {
                file.write_all(slice).await?;
                downloaded += slice.len() as u64;

                let percent = match total_size {
                    Some(total) => percent_of(downloaded, total).max(last_percent),
                    None => 0.0,
                };
                last_percent = percent;

                let _ = progress_tx
                    .send(TransferProgress {
                        downloaded_bytes: downloaded,
                        total_bytes: total_size,
                        percent,
                    })
                    .await;
            }
        }

        file.flush().await?;

        if let Some(expected) = total_size {
            if downloaded < expected {
                return Err(TransferError::Incomplete {
                    expected,
                    actual: downloaded,
                });
            }
        }

        Ok(downloaded)
    }
}

async fn finalize(part_path: &Path, output: &Path) -> Result<TransferOutcome, TransferError> {
    if tokio::fs::metadata(part_path).await.is_err() {
        return Err(TransferError::EmptyFile);
    }
    tokio::fs::rename(part_path, output).await?;

    let size = match tokio::fs::metadata(output).await {
        Ok(m) => m.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TransferError::EmptyFile)
        }
        Err(e) => return Err(e.into()),
    };

    if size == 0 {
        let _ = tokio::fs::remove_file(output).await;
        return Err(TransferError::EmptyFile);
    }

    Ok(TransferOutcome {
        file_path: output.to_path_buf(),
        file_size_bytes: size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_two_decimals() {
        assert_eq!(percent_of(1, 3), 33.33);
        assert_eq!(percent_of(2, 3), 66.67);
    }

    #[test]
    fn percent_only_hits_100_when_done() {
        assert_eq!(percent_of(99_999, 100_000), 99.99);
        assert_eq!(percent_of(100_000, 100_000), 100.0);
        assert_eq!(percent_of(100_001, 100_000), 100.0);
    }

    #[test]
    fn percent_unknown_total_is_zero() {
        assert_eq!(percent_of(500, 0), 0.0);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(TransferError::EmptyFile.kind(), "EmptyFile");
        assert_eq!(TransferError::HttpStatus { status: 403 }.kind(), "HttpStatusError");
        assert_eq!(TransferError::Timeout(Duration::from_secs(1)).kind(), "Timeout");
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(TransferError::from(io).kind(), "IOError");
    }

    #[tokio::test]
    async fn finalize_rejects_zero_byte_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.mp4");
        let part = part_path_for(&output);
        tokio::fs::write(&part, b"").await.unwrap();

        let err = finalize(&part, &output).await.unwrap_err();
        assert!(matches!(err, TransferError::EmptyFile));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn finalize_missing_part_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.mp4");
        let err = finalize(&part_path_for(&output), &output).await.unwrap_err();
        assert!(matches!(err, TransferError::EmptyFile));
    }

    #[tokio::test]
    async fn finalize_renames_part() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a.mp4");
        let part = part_path_for(&output);
        tokio::fs::write(&part, b"abcd").await.unwrap();

        let outcome = finalize(&part, &output).await.unwrap();
        assert_eq!(outcome.file_size_bytes, 4);
        assert!(output.exists());
        assert!(!part.exists());
    }
}
