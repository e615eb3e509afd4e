use std::time::Duration;

use reqwest::header::LOCATION;
use url::Url;

use super::errors::MdsError;

/// HTTP client for metadata downloads.
///
/// Redirects are followed by [`download`] so the hop count stays bounded.
pub(super) fn build_client() -> Result<reqwest::Client, MdsError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| MdsError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Fetches `url`, following at most `max_redirects` redirects.
///
/// # Errors
/// * `MdsError::TooManyRedirects` - A redirect arrives after the limit is spent
/// * `MdsError::DownloadFailed` - Transport failure or a non-success status
pub(super) async fn download(
    client: &reqwest::Client,
    url: &str,
    max_redirects: usize,
) -> Result<Vec<u8>, MdsError> {
    let mut current =
        Url::parse(url).map_err(|e| MdsError::Config(format!("Invalid URL {url}: {e}")))?;

    for hop in 0..=max_redirects {
        let response = client.get(current.clone()).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    MdsError::DownloadFailed(format!("{status} from {current} without Location"))
                })?;
            if hop == max_redirects {
                tracing::error!("Redirect limit {} reached at {}", max_redirects, current);
                return Err(MdsError::TooManyRedirects(format!(
                    "More than {max_redirects} redirects from {url}"
                )));
            }

            let next = current.join(location).map_err(|e| {
                MdsError::DownloadFailed(format!("Invalid redirect target {location}: {e}"))
            })?;
            tracing::debug!("Redirect {} from {} to {}", hop + 1, current, next);
            current = next;
            continue;
        }

        if !status.is_success() {
            tracing::error!("Download of {} failed with status {}", current, status);
            return Err(MdsError::DownloadFailed(format!("{status} from {current}")));
        }

        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), current);
        return Ok(body.to_vec());
    }

    Err(MdsError::TooManyRedirects(format!(
        "More than {max_redirects} redirects from {url}"
    )))
}
