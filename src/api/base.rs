//! JSON-over-HTTP transport shared by every resource call.

use parking_lot::RwLock;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::ApiConfig;
use crate::error::CrmError;

pub struct BaseApi {
    client: reqwest::Client,
    base_url: url::Url,
    token: RwLock<Option<String>>,
}

impl BaseApi {
    pub fn new(config: &ApiConfig) -> Result<Self, CrmError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url::Url::parse(config.base_url.trim())?,
            token: RwLock::new(config.token.clone().filter(|t| !t.is_empty())),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token.filter(|t| !t.is_empty());
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Append `segments` to the base path and add `params` as the query.
    ///
    /// Each segment is percent-encoded on its own, so an id containing `/`,
    /// `?` or `#` stays a single segment.
    pub fn url(&self, segments: &[&str], params: &[(&str, String)]) -> Result<url::Url, CrmError> {
        let mut url = self.base_url.clone();
        push_segments(&mut url, segments).map_err(CrmError::Validation)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and decode the JSON reply. An empty body decodes as `null`.
    pub async fn request<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, CrmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let result = match self.url(segments, params) {
            Ok(url) => self.send(method.clone(), url, body).await,
            Err(e) => Err(e),
        };
        result.inspect_err(|e| {
            log::error!("API {} /{} failed: {}", method, segments.join("/"), e)
        })
    }

    async fn send<B, T>(&self, method: Method, url: url::Url, body: Option<&B>) -> Result<T, CrmError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        let token = self.token.read().clone();
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(CrmError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T, CrmError> {
        self.request::<Value, T>(Method::GET, segments, params, None)
            .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, CrmError> {
        self.request(Method::POST, segments, &[], Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, CrmError> {
        self.request(Method::PUT, segments, &[], Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, CrmError> {
        self.request::<Value, T>(Method::DELETE, segments, &[], None)
            .await
    }
}

/// Append path segments to `url`, percent-encoding each one.
///
/// Empty, `.` and `..` segments are refused since they would collapse or
/// climb the path.
pub fn push_segments(url: &mut url::Url, segments: &[&str]) -> Result<(), String> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.trim().is_empty() || **s == "." || **s == "..")
    {
        return Err(format!("invalid path segment {:?}", bad));
    }
    let mut path = url
        .path_segments_mut()
        .map_err(|()| "base URL cannot take a path".to_string())?;
    path.pop_if_empty().extend(segments);
    Ok(())
}
