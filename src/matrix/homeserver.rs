use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::MatrixError;

use super::wire::{ErrorBody, LoginRequest, LoginResponse, MessagesResponse, SyncRequest, SyncResponse};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
/// Added on top of the long-poll timeout for each `/sync` request.
const SYNC_GRACE: Duration = Duration::from_secs(30);

/// The subset of the Matrix client-server API the session needs.
#[async_trait]
pub trait Homeserver: Send + Sync {
    async fn login(&self, user_id: &str, password: &str) -> Result<LoginResponse, MatrixError>;

    async fn sync(
        &self,
        access_token: &str,
        request: &SyncRequest,
    ) -> Result<SyncResponse, MatrixError>;

    /// Backward pagination of a room's history starting at `from`.
    async fn messages(
        &self,
        access_token: &str,
        room_id: &str,
        from: Option<&str>,
        limit: u32,
    ) -> Result<MessagesResponse, MatrixError>;
}

pub struct HttpHomeserver {
    client: Client,
    base_url: Url,
}

impl HttpHomeserver {
    pub fn new(base_url: &str) -> Result<Self, MatrixError> {
        let base_url =
            Url::parse(base_url).map_err(|err| MatrixError::InvalidUrl(format!("{base_url}: {err}")))?;
        let client = Client::builder().build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, MatrixError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| MatrixError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty()
                .extend(["_matrix", "client", "v3"])
                .extend(segments);
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, MatrixError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| MatrixError::Decode(err.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default();
        Err(MatrixError::Api {
            status: status.as_u16(),
            errcode: error.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
            message: error.error.unwrap_or_else(|| status.to_string()),
        })
    }
}

#[async_trait]
impl Homeserver for HttpHomeserver {
    async fn login(&self, user_id: &str, password: &str) -> Result<LoginResponse, MatrixError> {
        let url = self.endpoint(&["login"])?;
        log::debug!("POST {url} for {user_id}");

        let request = self
            .client
            .post(url)
            .timeout(LOGIN_TIMEOUT)
            .json(&LoginRequest::password(user_id, password));
        Self::send(request).await
    }

    async fn sync(
        &self,
        access_token: &str,
        request: &SyncRequest,
    ) -> Result<SyncResponse, MatrixError> {
        let url = self.endpoint(&["sync"])?;

        let mut query = vec![("timeout", request.timeout_ms.to_string())];
        if let Some(since) = &request.since {
            query.push(("since", since.clone()));
        }
        if let Some(filter) = request.filter() {
            query.push(("filter", filter));
        }

        let builder = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&query)
            .timeout(Duration::from_millis(request.timeout_ms) + SYNC_GRACE);
        Self::send(builder).await
    }

    async fn messages(
        &self,
        access_token: &str,
        room_id: &str,
        from: Option<&str>,
        limit: u32,
    ) -> Result<MessagesResponse, MatrixError> {
        let url = self.endpoint(&["rooms", room_id, "messages"])?;

        let mut query = vec![("dir", "b".to_string()), ("limit", limit.to_string())];
        if let Some(from) = from {
            query.push(("from", from.to_string()));
        }

        let builder = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&query)
            .timeout(LOGIN_TIMEOUT);
        Self::send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn login_handler(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["password"] == "secret" {
            (
                StatusCode::OK,
                Json(json!({
                    "user_id": body["identifier"]["user"],
                    "access_token": "token-1",
                    "device_id": "DEV"
                })),
            )
        } else {
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "errcode": "M_FORBIDDEN", "error": "Invalid username or password" })),
            )
        }
    }

    #[tokio::test]
    async fn login_returns_token_on_success() {
        let base = serve(Router::new().route("/_matrix/client/v3/login", post(login_handler))).await;
        let homeserver = HttpHomeserver::new(&base).unwrap();

        let response = homeserver.login("@alice:example.org", "secret").await.unwrap();

        assert_eq!(response.user_id, "@alice:example.org");
        assert_eq!(response.access_token, "token-1");
        assert_eq!(response.device_id.as_deref(), Some("DEV"));
    }

    #[tokio::test]
    async fn login_error_carries_homeserver_message() {
        let base = serve(Router::new().route("/_matrix/client/v3/login", post(login_handler))).await;
        let homeserver = HttpHomeserver::new(&base).unwrap();

        let err = homeserver.login("@alice:example.org", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid username or password");
        assert!(matches!(err, MatrixError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn sync_sends_token_since_and_filter() {
        async fn sync_handler(
            headers: HeaderMap,
            Query(query): Query<HashMap<String, String>>,
        ) -> Json<Value> {
            Json(json!({
                "next_batch": format!(
                    "{}|{}|{}",
                    headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or(""),
                    query.get("since").map(String::as_str).unwrap_or("-"),
                    query.contains_key("filter"),
                ),
            }))
        }

        let base = serve(Router::new().route("/_matrix/client/v3/sync", get(sync_handler))).await;
        let homeserver = HttpHomeserver::new(&base).unwrap();

        let initial = homeserver
            .sync(
                "tok",
                &SyncRequest {
                    since: None,
                    timeout_ms: 0,
                    timeline_limit: Some(30),
                },
            )
            .await
            .unwrap();
        assert_eq!(initial.next_batch, "Bearer tok|-|true");

        let incremental = homeserver
            .sync(
                "tok",
                &SyncRequest {
                    since: Some("s1".to_string()),
                    timeout_ms: 0,
                    timeline_limit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(incremental.next_batch, "Bearer tok|s1|false");
    }

    #[tokio::test]
    async fn messages_escapes_room_id_and_paginates_backwards() {
        async fn messages_handler(
            Path(room_id): Path<String>,
            Query(query): Query<HashMap<String, String>>,
        ) -> Json<Value> {
            Json(json!({
                "chunk": [{
                    "type": "m.room.message",
                    "event_id": "$old",
                    "sender": "@bob:example.org",
                    "content": { "body": format!("{room_id} {} {}", query["dir"], query["from"]) }
                }],
                "end": "t0"
            }))
        }

        let base = serve(Router::new().route(
            "/_matrix/client/v3/rooms/{room_id}/messages",
            get(messages_handler),
        ))
        .await;
        let homeserver = HttpHomeserver::new(&base).unwrap();

        let page = homeserver
            .messages("tok", "!abc:example.org", Some("t5"), 10)
            .await
            .unwrap();

        assert_eq!(page.chunk[0].content_str("body"), Some("!abc:example.org b t5"));
        assert_eq!(page.end.as_deref(), Some("t0"));
    }

    #[test]
    fn rejects_unparsable_base_url() {
        assert!(matches!(
            HttpHomeserver::new("not a url"),
            Err(MatrixError::InvalidUrl(_))
        ));
    }
}
