// Endpoint helpers for the POS backend.
//
// Payloads are opaque JSON: this layer moves data, it does not model the
// catalog. Every helper goes through `ApiClient::send`, so all of them get
// the same headers, retries and normalization.

use serde::Serialize;
use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;

/// Currency used for payment intents when none is given.
pub const DEFAULT_CURRENCY: &str = "thb";

// ── Product search ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters for `GET /products`. Only fields that are set reach the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub in_stock: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Look up a single scanned barcode.
    pub fn barcode(code: impl Into<String>) -> Self {
        Self {
            barcode: Some(code.into()),
            ..Self::default()
        }
    }

    /// The query pairs, camelCase keys, in declaration order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value {
                pairs.push((key, v));
            }
        };

        push("search", self.search.clone());
        push("category", self.category.clone());
        push("barcode", self.barcode.clone());
        push("minPrice", self.min_price.map(|v| v.to_string()));
        push("maxPrice", self.max_price.map(|v| v.to_string()));
        push("minRating", self.min_rating.map(|v| v.to_string()));
        push("inStock", self.in_stock.map(|v| v.to_string()));
        push("sortBy", self.sort_by.clone());
        push("sortOrder", self.sort_order.map(|o| o.as_str().to_owned()));
        push("page", self.page.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        pairs
    }
}

// ── Endpoints ────────────────────────────────────────────────────────

impl ApiClient {
    // Dashboard

    pub async fn dashboard_stats(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/dashboard/stats")).await
    }

    // Products

    pub async fn products(&self, query: &ProductQuery) -> Result<Value, Error> {
        self.send(ApiRequest::get("/products").query_pairs(query.to_pairs()))
            .await
    }

    pub async fn product(&self, id: &str) -> Result<Value, Error> {
        self.send(ApiRequest::get(format!("/products/{id}"))).await
    }

    pub async fn create_product(&self, product: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::post("/products").json(product)?).await
    }

    pub async fn update_product(&self, id: &str, product: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::put(format!("/products/{id}")).json(product)?)
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<Value, Error> {
        self.send(ApiRequest::delete(format!("/products/{id}"))).await
    }

    // Categories

    pub async fn categories(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/categories")).await
    }

    pub async fn create_category(&self, category: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::post("/categories").json(category)?).await
    }

    // Suppliers

    pub async fn suppliers(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/suppliers")).await
    }

    pub async fn create_supplier(&self, supplier: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::post("/suppliers").json(supplier)?).await
    }

    // Members

    pub async fn members(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/members")).await
    }

    /// Members are keyed by phone number.
    pub async fn member(&self, phone: &str) -> Result<Value, Error> {
        self.send(ApiRequest::get(format!("/members/{phone}"))).await
    }

    pub async fn create_member(&self, member: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::post("/members").json(member)?).await
    }

    // Sales

    pub async fn create_sale(&self, sale: &impl Serialize) -> Result<Value, Error> {
        self.send(ApiRequest::post("/sales").json(sale)?).await
    }

    pub async fn sales(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/sales")).await
    }

    // Reports

    /// Sales report, optionally bounded by ISO dates.
    pub async fn sales_report(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, Error> {
        let mut request = ApiRequest::get("/reports/sales");
        if let Some(start) = start_date {
            request = request.query("startDate", start);
        }
        if let Some(end) = end_date {
            request = request.query("endDate", end);
        }
        self.send(request).await
    }

    pub async fn inventory_report(&self) -> Result<Value, Error> {
        self.send(ApiRequest::get("/reports/inventory")).await
    }

    // Payments

    /// Create a payment intent. `currency` defaults to [`DEFAULT_CURRENCY`].
    pub async fn create_payment_intent(
        &self,
        amount: f64,
        currency: Option<&str>,
    ) -> Result<Value, Error> {
        let body = json!({
            "amount": amount,
            "currency": currency.unwrap_or(DEFAULT_CURRENCY),
        });
        self.send(ApiRequest::post("/payments/create-intent").body(body))
            .await
    }
}
