//! Client for the remote inventory REST API.
//!
//! This is the external collaborator every view fetches from: one method per
//! endpoint, JSON in and out. Failures carry the message the UI shows as a
//! toast plus the remote status code when one was received, so handlers can
//! pass a search-miss 404 through instead of flattening it. No retries and
//! no caching happen here; consistency between sessions is the remote API's
//! problem.

use crate::record::Record;
use crate::session::UserRecord;
use log::warn;
use serde::Serialize;
use serde_json::Value;

/// Credentials for `/login_user/` and `/create_user/`.
#[derive(Debug, Serialize)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A failed call to the remote API.
///
/// `status` is the remote HTTP status when the API answered at all; `None`
/// means the request never completed (connection refused, decode failure).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    fn transport(err: reqwest::Error) -> ApiError {
        ApiError {
            status: None,
            message: format!("failed to reach inventory API: {err}"),
        }
    }

    fn decode(err: reqwest::Error) -> ApiError {
        ApiError {
            status: None,
            message: format!("invalid response from inventory API: {err}"),
        }
    }

    /// Build an error from a non-2xx response, extracting the FastAPI-style
    /// `detail` message when the body carries one.
    async fn from_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let message = match response.json::<Value>().await {
            Ok(body) => body
                .get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("inventory API returned {status}")),
            Err(_) => format!("inventory API returned {status}"),
        };
        ApiError {
            status: Some(status.as_u16()),
            message,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ApiClient {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a collection endpoint and decode it as a list of records.
    async fn get_list(&self, path: &str) -> Result<Vec<Record>, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !response.status().is_success() {
            let error = ApiError::from_response(response).await;
            warn!("GET {path} failed: {}", error.message);
            return Err(error);
        }

        response.json::<Vec<Record>>().await.map_err(ApiError::decode)
    }

    /// POST a JSON body, discarding the response body on success.
    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }

    // List fetches, one per entity kind.

    pub async fn get_users(&self) -> Result<Vec<Record>, ApiError> {
        self.get_list("/get_users/").await
    }

    pub async fn get_products(&self) -> Result<Vec<Record>, ApiError> {
        self.get_list("/get_products/").await
    }

    pub async fn get_categories(&self) -> Result<Vec<Record>, ApiError> {
        self.get_list("/get_categories/").await
    }

    pub async fn get_transactions(&self) -> Result<Vec<Record>, ApiError> {
        self.get_list("/get_transactions/").await
    }

    pub async fn get_logs(&self) -> Result<Vec<Record>, ApiError> {
        self.get_list("/get_logs/").await
    }

    pub async fn get_transactions_by_user_name(
        &self,
        name: &str,
    ) -> Result<Vec<Record>, ApiError> {
        let path = format!("/get_transactions_by_user_name/{}/", urlencoding::encode(name));
        self.get_list(&path).await
    }

    pub async fn get_transactions_by_product_name(
        &self,
        name: &str,
    ) -> Result<Vec<Record>, ApiError> {
        let path = format!(
            "/get_transactions_by_product_name/{}/",
            urlencoding::encode(name)
        );
        self.get_list(&path).await
    }

    /// Verify credentials against the remote API.
    ///
    /// The API owns password storage and verification entirely; on success
    /// it returns the logged-in user object this app keeps in the session.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserRecord, ApiError> {
        let response = self
            .http
            .post(self.url("/login_user/"))
            .json(credentials)
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        response.json::<UserRecord>().await.map_err(ApiError::decode)
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.post_json("/create_user/", credentials).await
    }

    // Mutations: fire one request, surface one message. The optimistic
    // quantity patch after a purchase/restock belongs to the calling view.

    pub async fn create_product(&self, product: &Value) -> Result<(), ApiError> {
        self.post_json("/create_product/", product).await
    }

    pub async fn create_category(&self, category: &Value) -> Result<(), ApiError> {
        self.post_json("/create_category/", category).await
    }

    pub async fn create_transaction(&self, transaction: &Value) -> Result<(), ApiError> {
        self.post_json("/create_transaction/", transaction).await
    }

    pub async fn update_product(&self, id: i64, product: &Value) -> Result<(), ApiError> {
        self.put(&format!("/update_product/{id}/"), product).await
    }

    pub async fn update_category(&self, id: i64, category: &Value) -> Result<(), ApiError> {
        self.put(&format!("/update_category/{id}/"), category).await
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/delete_product/{id}/")).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/delete_category/{id}/")).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/delete_user/{id}/")).await
    }

    async fn put<T: Serialize>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let response = self
            .http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .await
            .map_err(ApiError::transport)?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/get_products/"), "http://localhost:8000/get_products/");
    }

    #[test]
    fn search_terms_are_path_encoded() {
        let encoded = urlencoding::encode("left handed screwdriver");
        assert_eq!(encoded, "left%20handed%20screwdriver");
    }
}
