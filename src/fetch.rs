//! Retrieval of the user batch, either from the random-user API or from a
//! saved response on disk.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use image::DynamicImage;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ApiConfig, APP_NAME};
use crate::user::User;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid API url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("response is not a user list")]
    Decode(#[from] serde_json::Error),
}

/// Where the session's users come from.
#[derive(Debug, Clone)]
pub enum UserSource {
    Api(ApiConfig),
    File(PathBuf),
}

impl UserSource {
    pub fn describe(&self) -> String {
        match self {
            UserSource::Api(api) => api.url.clone(),
            UserSource::File(path) => path.display().to_string(),
        }
    }
}

/// Messages delivered from background workers to the event loop.
pub enum LoadEvent {
    Users(Result<Vec<User>, FetchError>),
    Photo {
        url: String,
        result: anyhow::Result<DynamicImage>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    results: Vec<User>,
}

pub fn request_url(api: &ApiConfig) -> Result<reqwest::Url, FetchError> {
    let mut params = vec![("results", api.results.to_string())];
    if let Some(nat) = &api.nationality {
        params.push(("nat", nat.clone()));
    }
    reqwest::Url::parse_with_params(&api.url, &params).map_err(|err| FetchError::InvalidUrl {
        url: api.url.clone(),
        reason: err.to_string(),
    })
}

pub fn http_client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("userdeck/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn decode_users(body: &[u8]) -> Result<Vec<User>, FetchError> {
    let response: ApiResponse = serde_json::from_slice(body)?;
    Ok(response.results)
}

pub fn fetch_users(source: &UserSource) -> Result<Vec<User>, FetchError> {
    match source {
        UserSource::File(path) => {
            let body = fs::read(path).map_err(|source| FetchError::Read {
                path: path.clone(),
                source,
            })?;
            decode_users(&body)
        }
        UserSource::Api(api) => {
            let url = request_url(api)?;
            let url_text = url.to_string();
            let request_error = |source| FetchError::Request {
                url: url_text.clone(),
                source,
            };
            tracing::debug!(url = %url_text, "requesting users");
            let client = http_client().map_err(request_error)?;
            let response = client.get(url).send().map_err(request_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url_text.clone(),
                    status,
                });
            }
            let body = response.bytes().map_err(request_error)?;
            decode_users(&body)
        }
    }
}

/// Run the one fetch of the session on a background thread.
///
/// Exactly one `LoadEvent::Users` is sent, unless the receiver is gone.
pub fn spawn_fetch(source: UserSource, events: Sender<LoadEvent>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{APP_NAME}-fetch"))
        .spawn(move || {
            let result = fetch_users(&source);
            match &result {
                Ok(users) => tracing::info!(count = users.len(), source = %source.describe(), "users fetched"),
                Err(err) => tracing::error!(error = %err, source = %source.describe(), "user fetch failed"),
            }
            let _ = events.send(LoadEvent::Users(result));
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn request_url_carries_count_and_nationality() {
        let url = request_url(&ApiConfig::default()).unwrap();
        assert_eq!(url.as_str(), "https://randomuser.me/api/?results=12&nat=us");
    }

    #[test]
    fn request_url_without_nationality() {
        let api = ApiConfig {
            nationality: None,
            results: 3,
            ..ApiConfig::default()
        };
        let url = request_url(&api).unwrap();
        assert_eq!(url.query(), Some("results=3"));
    }

    #[test]
    fn request_url_rejects_garbage() {
        let api = ApiConfig {
            url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(request_url(&api), Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn decode_reads_results_array() {
        let body = br#"{"results":[{"name":{"first":"Ann","last":"Lee"}},{"name":{"first":"Bob","last":"Lee"}}],"info":{"seed":"x"}}"#;
        let users = decode_users(body).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].display_name(), "Bob Lee");
    }

    #[test]
    fn decode_tolerates_missing_results() {
        assert!(decode_users(b"{}").unwrap().is_empty());
    }

    #[test]
    fn decode_keeps_every_record_when_fields_are_null_or_mistyped() {
        let body = br#"{"results":[
            {"name":{"first":"Ann","last":"Lee"},"email":"ann@example.com"},
            {"name":{"first":"Bob","last":"Lee"},"email":null},
            {"name":{"first":"Cid","last":null},"location":{"city":"Salem","postcode":null}},
            {"name":{"first":42},"dob":null,"location":{"street":{"number":"9","name":"Mill Rd"}},"picture":[]}
        ]}"#;
        let users = decode_users(body).unwrap();
        assert_eq!(users.len(), 4);
        assert_eq!(users[0].email, "ann@example.com");
        assert_eq!(users[1].email, "");
        assert_eq!(users[1].display_name(), "Bob Lee");
        assert_eq!(users[2].location.city, "Salem");
        assert_eq!(users[2].location.postcode.to_string(), "");
        assert_eq!(users[2].name.last, "");
        assert_eq!(users[3].name.first, "");
        assert_eq!(users[3].birth_date(), "");
        assert_eq!(users[3].location.street.to_string(), "0 Mill Rd");
        assert_eq!(users[3].picture.medium, "");
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(matches!(decode_users(b"<html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn file_source_reads_saved_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, r#"{"results":[{"email":"a@b.c"}]}"#).unwrap();
        let users = fetch_users(&UserSource::File(path)).unwrap();
        assert_eq!(users[0].email, "a@b.c");
    }

    #[test]
    fn spawned_fetch_reports_missing_file() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_fetch(UserSource::File(PathBuf::from("/nonexistent/users.json")), tx).unwrap();
        handle.join().unwrap();
        match rx.recv().unwrap() {
            LoadEvent::Users(Err(FetchError::Read { .. })) => {}
            _ => panic!("expected a read error"),
        }
    }
}
