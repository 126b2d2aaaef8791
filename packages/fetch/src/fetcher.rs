//! Page fetching with retry.
//!
//! HTTP 429 and transport failures are retried with exponential backoff
//! (`backoff_factor * 2^attempt`) up to `retries` attempts in total. Any
//! other non-200 status is permanent. No sleep follows the final attempt.

use crate::client::{HttpClient, HttpRequest};
use crate::FetchOptions;

/// Fetches `url` and returns its body as text, or `None` if every attempt
/// failed. Never returns an error; every failure path is logged.
pub async fn fetch_html<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    options: &FetchOptions,
) -> Option<String> {
    let request =
        HttpRequest::new(url, options.timeout).with_header("User-Agent", &options.user_agent);
    let retries = options.retries;

    for attempt in 0..retries {
        let is_last = attempt + 1 >= retries;

        match client.get(&request).await {
            Ok(response) if response.is_ok() => return Some(response.text()),
            Ok(response) if response.status == 429 => {
                if is_last {
                    log::warn!(
                        "Rate limit hit for {url} on final attempt {}/{retries}",
                        attempt + 1
                    );
                    break;
                }
                let wait = options.backoff(attempt);
                log::warn!("Rate limit hit for {url}, waiting {wait:?}");
                tokio::time::sleep(wait).await;
            }
            Ok(response) => {
                log::error!("Failed to fetch {url}: Status {}", response.status);
                return None;
            }
            Err(e) => {
                log::error!(
                    "Error fetching {url} (attempt {}/{retries}): {e}",
                    attempt + 1
                );
                if !is_last {
                    tokio::time::sleep(options.backoff(attempt)).await;
                }
            }
        }
    }

    log::error!("Failed to fetch {url} after {retries} attempts");
    None
}
