// Per-call request descriptor.
//
// An `ApiRequest` is built by the caller, handed to `ApiClient::send`, and
// dropped when the call completes. It is cloned into each retry attempt's
// builder, never mutated by the client.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Method, path, body, header overrides and query pairs for one call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: HeaderMap,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach any serializable value as the JSON body.
    pub fn json(self, body: &impl Serialize) -> Result<Self, Error> {
        Ok(self.body(serde_json::to_value(body)?))
    }

    /// Override or add a header. Overrides win over the client's defaults
    /// (`Content-Type`, `Authorization`).
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append one query pair. Pairs keep insertion order.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append every pair from a flat key → value mapping.
    pub fn query_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Build the absolute URL: `{base}{path}?{query}`.
    ///
    /// The base keeps its own path (e.g. `/api`); the query string is
    /// form-urlencoded and omitted entirely when there are no pairs.
    pub fn url(&self, base: &Url) -> Result<Url, Error> {
        let base = base.as_str().trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("http://localhost:5000/api").unwrap()
    }

    #[test]
    fn joins_path_onto_base_path() {
        let url = ApiRequest::get("/products/42").url(&base()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/products/42");
    }

    #[test]
    fn tolerates_trailing_and_missing_slashes() {
        let base = Url::parse("http://localhost:5000/api/").unwrap();
        let url = ApiRequest::get("categories").url(&base).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/categories");
    }

    #[test]
    fn empty_query_adds_no_question_mark() {
        let url = ApiRequest::get("/sales").url(&base()).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn query_is_form_encoded_in_insertion_order() {
        let url = ApiRequest::get("/products")
            .query("search", "green tea")
            .query("minPrice", 10)
            .query_pairs([("sortOrder", "asc")])
            .url(&base())
            .unwrap();
        assert_eq!(url.query(), Some("search=green+tea&minPrice=10&sortOrder=asc"));
    }

    #[test]
    fn json_body_is_captured() {
        let req = ApiRequest::post("/categories")
            .json(&json!({ "name": "Drinks" }))
            .unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.body_value(), Some(&json!({ "name": "Drinks" })));
    }
}
