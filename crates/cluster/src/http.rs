//! Cluster client over the Elasticsearch-compatible REST API.

use crate::error::{ClusterError, ClusterResult};
use crate::models::{
    ClusterHealth, Hit, LifecyclePolicy, PolicyEntry, Query, RepositoryInfo, SEARCH_SIZE,
    SnapshotInfo, SnapshotList, TIMESTAMP_FIELD, TimestampRange,
};
use crate::traits::{Cluster, DocumentApi, LifecycleApi, SnapshotApi};
use async_trait::async_trait;
use deepfreeze_core::config::ClusterConfig;
use deepfreeze_core::timestamp::from_epoch_millis;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::instrument;

#[derive(Clone)]
enum Auth {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

/// HTTP implementation of [`Cluster`].
#[derive(Clone)]
pub struct HttpCluster {
    http: reqwest::Client,
    base_url: Url,
    auth: Auth,
}

impl std::fmt::Debug for HttpCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCluster")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpCluster {
    pub fn new(config: &ClusterConfig) -> ClusterResult<Self> {
        config.validate().map_err(ClusterError::Config)?;
        let base_url = Url::parse(&config.url)
            .map_err(|e| ClusterError::Config(format!("invalid cluster URL {}: {e}", config.url)))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let auth = match (&config.username, &config.password, &config.api_key) {
            (Some(username), Some(password), _) => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            (_, _, Some(key)) => Auth::ApiKey(key.clone()),
            _ => Auth::None,
        };
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join `path` onto the base URL, keeping any path prefix the base carries.
    fn url(&self, path: &str) -> ClusterResult<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| ClusterError::Config(format!("invalid URL {joined}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> ClusterResult<reqwest::RequestBuilder> {
        let req = self.http.request(method, self.url(path)?);
        Ok(match &self.auth {
            Auth::None => req,
            Auth::Basic { username, password } => req.basic_auth(username, Some(password)),
            Auth::ApiKey(key) => req.header(reqwest::header::AUTHORIZATION, format!("ApiKey {key}")),
        })
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> ClusterResult<(StatusCode, String)> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ClusterResult<T> {
        let (status, body) = self.execute(req).await?;
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> ClusterResult<()> {
        let (status, body) = self.execute(req).await?;
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(())
    }

    /// Like `send_json`, but a 404 yields None.
    async fn send_optional<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> ClusterResult<Option<T>> {
        let (status, body) = self.execute(req).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

fn api_error(status: StatusCode, body: String) -> ClusterError {
    ClusterError::Api {
        status: status.as_u16(),
        body,
    }
}

fn parse_millis(agg: &Value) -> ClusterResult<Option<time::OffsetDateTime>> {
    match agg.get("value").and_then(Value::as_f64) {
        Some(millis) => from_epoch_millis(millis)
            .map(Some)
            .map_err(|e| ClusterError::UnexpectedResponse(format!("timestamp aggregation: {e}"))),
        None => Ok(None),
    }
}

#[async_trait]
impl DocumentApi for HttpCluster {
    #[instrument(skip(self))]
    async fn index_exists(&self, index: &str) -> ClusterResult<bool> {
        let (status, body) = self.execute(self.request(Method::HEAD, index)?).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(api_error(s, body)),
        }
    }

    #[instrument(skip(self))]
    async fn create_index(&self, index: &str) -> ClusterResult<()> {
        let (status, body) = self.execute(self.request(Method::PUT, index)?).await?;
        if status.is_success() {
            tracing::info!(index = %index, "created index");
            return Ok(());
        }
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(api_error(status, body))
    }

    #[instrument(skip(self))]
    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>> {
        let req = self.request(Method::GET, &format!("{index}/_doc/{id}"))?;
        let response: Option<Value> = self.send_optional(req).await?;
        Ok(response.and_then(|mut doc| match doc.get("found").and_then(Value::as_bool) {
            Some(false) => None,
            _ => doc.get_mut("_source").map(Value::take),
        }))
    }

    #[instrument(skip(self, source))]
    async fn put_document(&self, index: &str, id: &str, source: &Value) -> ClusterResult<()> {
        let req = self
            .request(Method::PUT, &format!("{index}/_doc/{id}"))?
            .query(&[("refresh", "true")])
            .json(source);
        self.send_empty(req).await
    }

    #[instrument(skip(self, partial))]
    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> ClusterResult<()> {
        let req = self
            .request(Method::POST, &format!("{index}/_update/{id}"))?
            .query(&[("refresh", "true")])
            .json(&json!({ "doc": partial }));
        let (status, body) = self.execute(req).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound(format!("{index}/{id}")));
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search(&self, index: &str, query: &Query) -> ClusterResult<Vec<Hit>> {
        let req = self
            .request(Method::POST, &format!("{index}/_search"))?
            .json(&json!({ "query": query.to_json(), "size": SEARCH_SIZE }));
        let (status, body) = self.execute(req).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound(index.to_string()));
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        let response: Value = serde_json::from_str(&body)?;
        let hits = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| {
                        Some(Hit {
                            id: hit.get("_id")?.as_str()?.to_string(),
                            source: hit.get("_source")?.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn refresh(&self, index: &str) -> ClusterResult<()> {
        self.send_empty(self.request(Method::POST, &format!("{index}/_refresh"))?)
            .await
    }

    #[instrument(skip(self), fields(count = indices.len()))]
    async fn timestamp_range(&self, indices: &[String]) -> ClusterResult<TimestampRange> {
        if indices.is_empty() {
            return Ok(TimestampRange::default());
        }
        let req = self
            .request(Method::POST, &format!("{}/_search", indices.join(",")))?
            .query(&[("ignore_unavailable", "true"), ("allow_no_indices", "true")])
            .json(&json!({
                "size": 0,
                "aggs": {
                    "earliest": { "min": { "field": TIMESTAMP_FIELD } },
                    "latest": { "max": { "field": TIMESTAMP_FIELD } }
                }
            }));
        let response: Value = self.send_json(req).await?;
        let Some(aggs) = response.get("aggregations") else {
            return Ok(TimestampRange::default());
        };
        Ok(TimestampRange {
            earliest: aggs.get("earliest").map(parse_millis).transpose()?.flatten(),
            latest: aggs.get("latest").map(parse_millis).transpose()?.flatten(),
        })
    }
}

#[async_trait]
impl SnapshotApi for HttpCluster {
    #[instrument(skip(self))]
    async fn list_repositories(&self) -> ClusterResult<BTreeMap<String, RepositoryInfo>> {
        self.send_json(self.request(Method::GET, "_snapshot")?).await
    }

    #[instrument(skip(self))]
    async fn get_repository(&self, name: &str) -> ClusterResult<Option<RepositoryInfo>> {
        let req = self.request(Method::GET, &format!("_snapshot/{name}"))?;
        let response: Option<BTreeMap<String, RepositoryInfo>> = self.send_optional(req).await?;
        Ok(response.and_then(|mut repos| repos.remove(name)))
    }

    #[instrument(skip(self, info))]
    async fn create_repository(&self, name: &str, info: &RepositoryInfo) -> ClusterResult<()> {
        let req = self
            .request(Method::PUT, &format!("_snapshot/{name}"))?
            .json(info);
        self.send_empty(req).await?;
        tracing::info!(repository = %name, "registered snapshot repository");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_repository(&self, name: &str) -> ClusterResult<()> {
        let (status, body) = self
            .execute(self.request(Method::DELETE, &format!("_snapshot/{name}"))?)
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_snapshots(&self, repository: &str) -> ClusterResult<Vec<SnapshotInfo>> {
        let req = self.request(Method::GET, &format!("_snapshot/{repository}/_all"))?;
        let list: SnapshotList = self.send_json(req).await?;
        Ok(list.snapshots)
    }
}

#[async_trait]
impl LifecycleApi for HttpCluster {
    #[instrument(skip(self))]
    async fn list_policies(&self) -> ClusterResult<BTreeMap<String, PolicyEntry>> {
        self.send_json(self.request(Method::GET, "_ilm/policy")?).await
    }

    #[instrument(skip(self, policy))]
    async fn put_policy(&self, name: &str, policy: &LifecyclePolicy) -> ClusterResult<()> {
        let req = self
            .request(Method::PUT, &format!("_ilm/policy/{name}"))?
            .json(&json!({ "policy": policy }));
        self.send_empty(req).await
    }
}

#[async_trait]
impl Cluster for HttpCluster {
    #[instrument(skip(self))]
    async fn health(&self) -> ClusterResult<ClusterHealth> {
        self.send_json(self.request(Method::GET, "_cluster/health")?)
            .await
    }
}
