use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use url::Url;

const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "host",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Identity of a request inside a cache namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl WorkerRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method.as_str().to_string(),
            url: self.url.as_str().to_string(),
        }
    }

    /// Headers worth forwarding to the origin.
    pub fn end_to_end_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers.iter() {
            if !is_hop_by_hop(name.as_str()) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers
    }
}

/// A response as stored in, or served from, a cache namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(serialize_with = "encode_body", deserialize_with = "decode_body")]
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn from_parts(status: StatusCode, headers: &HeaderMap, body: Vec<u8>) -> Self {
        let headers = headers
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        Self {
            status: status.as_u16(),
            headers,
            body,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: b"offline and the application shell is not cached".to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    ShellFallback,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

fn encode_body<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(body))
}

fn decode_body<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, HOST};

    use super::*;

    #[test]
    fn test_key_includes_method() {
        let url = Url::parse("http://localhost:8080/app.js").unwrap();
        let get = WorkerRequest::get(url.clone());
        let post = WorkerRequest {
            method: Method::POST,
            ..WorkerRequest::get(url)
        };

        assert_eq!(get.key().to_string(), "GET http://localhost:8080/app.js");
        assert_ne!(get.key(), post.key());
    }

    #[test]
    fn test_hop_by_hop_headers_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("localhost:8085"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let response = CachedResponse::from_parts(StatusCode::OK, &headers, b"<html></html>".to_vec());
        assert_eq!(
            response.headers,
            vec![("content-type".to_string(), "text/html".to_string())]
        );

        let request = WorkerRequest {
            headers,
            ..WorkerRequest::get(Url::parse("http://localhost:8080/").unwrap())
        };
        let forwarded = request.end_to_end_headers();
        assert_eq!(forwarded.len(), 1);
        assert!(forwarded.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_body_is_stored_as_base64() {
        let response = CachedResponse {
            status: 200,
            headers: vec![],
            body: vec![0, 159, 146, 150],
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["body"], "AJ+Slg==");

        let decoded: CachedResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, response);
    }
}
