// src/render/http.rs
// =============================================================================
// A PageRenderer backed by a plain HTTP client.
//
// How it works:
// 1. GET the page (redirects followed, bounded timeout)
// 2. Anything other than a 2xx status is a failed fetch
// 3. Non-HTML responses and bodies over the size limit are failed fetches
// 4. Parse the HTML and extract body text + links (see html.rs)
//
// Links are resolved against the final URL after redirects, so a site that
// redirects "/" to "/en/" still yields correct absolute links.
// =============================================================================

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use super::html::extract_page;
use super::{PageContent, PageRenderer};
use crate::config::RendererConfig;
use crate::error::FetchError;

/// Fetches pages over HTTP with a shared, connection-pooling client.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

// Content types we know how to pull text out of
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
            max_body_bytes: config.max_body_bytes,
        })
    }

    // Reads the body chunk by chunk so an oversized page is dropped early
    async fn read_body(&self, mut response: Response) -> Result<String, FetchError> {
        if response
            .content_length()
            .is_some_and(|length| length > self.max_body_bytes as u64)
        {
            return Err(FetchError::ContentTooLarge {
                max: self.max_body_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.categorize_error(e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::ContentTooLarge {
                    max: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    // Sorts reqwest failures into our error variants.
    // reqwest only exposes a few predicates, so DNS and TLS problems are
    // recognized from the error text.
    fn categorize_error(&self, error: reqwest::Error) -> FetchError {
        let message = error.to_string();
        let lowered = message.to_lowercase();

        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            if lowered.contains("dns") {
                FetchError::Dns(message)
            } else {
                FetchError::Connect(message)
            }
        } else if lowered.contains("certificate") || lowered.contains("ssl") {
            FetchError::Tls(message)
        } else {
            FetchError::Http(message)
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn fetch_page(&self, url: &str) -> Result<PageContent, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.categorize_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // A missing header is given the benefit of the doubt
        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default().to_lowercase();
            if !is_html(&content_type) {
                return Err(FetchError::Render(format!(
                    "unsupported content type '{content_type}'"
                )));
            }
        }

        let final_url = response.url().clone();
        let body = self.read_body(response).await?;

        let page = extract_page(&body, &final_url)?;
        debug!(url, final_url = %final_url, links = page.links.len(), "rendered page");
        Ok(page)
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    HTML_CONTENT_TYPES.contains(&mime)
}
