use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde_json::{Value, json};
use tracing::debug;

use super::{
    Access, AuthApi, AuthUser, Backend, ServiceError, Session, StorageApi, StoredObject, TableApi,
    UserUpdate,
    query::{Filter, Query, filter_params},
};

/// HTTP client for the hosted service (PostgREST tables, object storage, GoTrue auth).
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl RemoteClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            bucket: bucket.into(),
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn storage_object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.base_url)
    }

    fn request(&self, method: Method, url: &str, access: Access<'_>) -> RequestBuilder {
        let bearer = access.token().unwrap_or(self.api_key.as_str());
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = builder.send().await.map_err(ServiceError::transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::from_response(status.as_u16(), &body))
    }

    async fn send_rows(&self, builder: RequestBuilder) -> Result<Vec<Value>, ServiceError> {
        let response = self.send(builder).await?;
        let text = response.text().await.map_err(ServiceError::transport)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(single) => Ok(vec![single]),
            Err(err) => Err(ServiceError::new(
                500,
                format!("failed to parse table response: {err}"),
            )),
        }
    }
}

#[async_trait]
impl TableApi for RemoteClient {
    async fn select(&self, access: Access<'_>, query: &Query) -> Result<Vec<Value>, ServiceError> {
        debug!(table = %query.table, "select");
        let builder = self
            .request(Method::GET, &self.rest_url(&query.table), access)
            .query(&query.to_params());
        self.send_rows(builder).await
    }

    async fn count(&self, access: Access<'_>, table: &str) -> Result<u64, ServiceError> {
        let builder = self
            .request(Method::HEAD, &self.rest_url(table), access)
            .query(&[("select", "*")])
            .header("Prefer", "count=exact");
        let response = self.send(builder).await?;
        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        parse_content_range_total(range).ok_or_else(|| {
            ServiceError::new(500, format!("missing row count in Content-Range `{range}`"))
        })
    }

    async fn insert(
        &self,
        access: Access<'_>,
        table: &str,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, ServiceError> {
        debug!(table, rows = rows.len(), "insert");
        let builder = self
            .request(Method::POST, &self.rest_url(table), access)
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_rows(builder).await
    }

    async fn update(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ServiceError> {
        debug!(table, "update");
        let builder = self
            .request(Method::PATCH, &self.rest_url(table), access)
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send_rows(builder).await
    }

    async fn delete(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
    ) -> Result<usize, ServiceError> {
        debug!(table, "delete");
        let builder = self
            .request(Method::DELETE, &self.rest_url(table), access)
            .query(&filter_params(filters))
            .header("Prefer", "return=representation");
        Ok(self.send_rows(builder).await?.len())
    }
}

#[async_trait]
impl StorageApi for RemoteClient {
    async fn upload(
        &self,
        access: Access<'_>,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ServiceError> {
        debug!(path, size = bytes.len(), "storage upload");
        let builder = self
            .request(Method::POST, &self.storage_object_url(path), access)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.send(builder).await.map(|_| ())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn object_path(&self, public_url: &str) -> Option<String> {
        object_path_under(public_url, &self.public_url(""))
    }

    async fn remove(&self, access: Access<'_>, paths: &[String]) -> Result<(), ServiceError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let builder = self
            .request(Method::DELETE, &url, access)
            .json(&json!({ "prefixes": paths }));
        self.send(builder).await.map(|_| ())
    }

    async fn download(&self, path: &str) -> Result<StoredObject, ServiceError> {
        let builder = self.request(Method::GET, &self.public_url(path), Access::Anonymous);
        let response = self.send(builder).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_string();
        let bytes = response.bytes().await.map_err(ServiceError::transport)?;
        Ok(StoredObject {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl AuthApi for RemoteClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let builder = self
            .request(Method::POST, &self.auth_url("token"), Access::Anonymous)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(builder).await?;
        response
            .json::<Session>()
            .await
            .map_err(|err| ServiceError::new(500, format!("invalid session payload: {err}")))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        let builder = self.request(
            Method::POST,
            &self.auth_url("logout"),
            Access::User(access_token),
        );
        self.send(builder).await.map(|_| ())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, ServiceError> {
        let builder = self.request(Method::GET, &self.auth_url("user"), Access::User(access_token));
        match self.send(builder).await {
            Ok(response) => response
                .json::<AuthUser>()
                .await
                .map(Some)
                .map_err(|err| ServiceError::new(500, format!("invalid user payload: {err}"))),
            Err(err) if err.is_unauthorized() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<AuthUser, ServiceError> {
        let builder = self
            .request(Method::PUT, &self.auth_url("user"), Access::User(access_token))
            .json(update);
        let response = self.send(builder).await?;
        response
            .json::<AuthUser>()
            .await
            .map_err(|err| ServiceError::new(500, format!("invalid user payload: {err}")))
    }
}

impl Backend for RemoteClient {
    fn backend_tag(&self) -> &'static str {
        "remote"
    }
}

/// Extracts the total from a `Content-Range` header such as `0-0/42` or `*/0`.
pub(crate) fn parse_content_range_total(range: &str) -> Option<u64> {
    let (_, total) = range.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Object path of a public URL built on `prefix` (the public URL of the bucket root).
pub(crate) fn object_path_under(public_url: &str, prefix: &str) -> Option<String> {
    let path = public_url.strip_prefix(prefix)?;
    let path = path.split(['?', '#']).next().unwrap_or_default();
    (!path.is_empty()).then(|| path.to_string())
}
