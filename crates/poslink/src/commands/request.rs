//! Raw request command: any method, any path, optional JSON body.

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;

use poslink_api::{ApiClient, ApiRequest};

use crate::cli::{HttpMethod, RequestArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(client: &ApiClient, args: RequestArgs) -> Result<(), CliError> {
    let request = build(args)?;
    let value = client.send(request).await?;
    output::print_output(&output::render_json(&value)?);
    Ok(())
}

fn build(args: RequestArgs) -> Result<ApiRequest, CliError> {
    let mut request = match args.method {
        HttpMethod::Get => ApiRequest::get(args.path),
        HttpMethod::Post => ApiRequest::post(args.path),
        HttpMethod::Put => ApiRequest::put(args.path),
        HttpMethod::Delete => ApiRequest::delete(args.path),
    };

    let body = match (args.data, args.data_file) {
        (Some(raw), _) => Some(raw),
        (None, Some(path)) => Some(std::fs::read_to_string(path)?),
        (None, None) => None,
    };
    if let Some(raw) = body {
        request = request.body(serde_json::from_str::<Value>(&raw)?);
    }

    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    for raw in &args.query {
        let (key, value) = parse_query(raw)?;
        request = request.query(key, value);
    }
    Ok(request)
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), CliError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::validation("header", format!("expected 'Name: value', got '{raw}'")))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| CliError::validation("header", format!("{e}: {raw}")))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| CliError::validation("header", format!("{e}: {raw}")))?;
    Ok((name, value))
}

fn parse_query(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(CliError::validation(
            "query",
            format!("expected 'key=value', got '{raw}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::Method;
    use reqwest::header::CONTENT_TYPE;
    use serde_json::json;
    use url::Url;

    use super::*;

    fn args(method: HttpMethod, path: &str) -> RequestArgs {
        RequestArgs {
            method,
            path: path.into(),
            data: None,
            data_file: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    #[test]
    fn builds_body_headers_and_query() {
        let mut a = args(HttpMethod::Post, "/sales");
        a.data = Some(r#"{"total": 250}"#.into());
        a.headers = vec!["Content-Type: text/plain".into()];
        a.query = vec!["dryRun=true".into()];

        let req = build(a).unwrap();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.body_value(), Some(&json!({ "total": 250 })));
        assert_eq!(req.headers()[CONTENT_TYPE], "text/plain");

        let base = Url::parse("http://localhost:5000/api").unwrap();
        assert_eq!(
            req.url(&base).unwrap().as_str(),
            "http://localhost:5000/api/sales?dryRun=true"
        );
    }

    #[test]
    fn reads_body_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(&path, r#"{"name": "Snacks"}"#).unwrap();

        let mut a = args(HttpMethod::Put, "/categories/1");
        a.data_file = Some(path);
        let req = build(a).unwrap();
        assert_eq!(req.body_value(), Some(&json!({ "name": "Snacks" })));
    }

    #[test]
    fn rejects_malformed_input() {
        let mut a = args(HttpMethod::Post, "/sales");
        a.data = Some("{not json".into());
        assert!(matches!(build(a), Err(CliError::Json(_))));

        assert!(parse_header("no-colon").is_err());
        assert!(parse_header("Bad Name: x").is_err());
        assert!(parse_query("=value").is_err());
        assert!(parse_query("novalue").is_err());
        assert_eq!(parse_query("page=2").unwrap(), ("page", "2"));
        assert_eq!(parse_query("q=a=b").unwrap(), ("q", "a=b"));
    }
}
