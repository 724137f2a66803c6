use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::dao::{
    mirror::Mirror,
    models::{MatchSummary, PlayerSlot},
    storage::StorageResult,
};

use super::{
    config::RestMirrorConfig,
    error::{RestMirrorError, RestMirrorResult},
    models::{
        CURRENT_PLAYER_RPC, CurrentPlayerArgs, CurrentTurnPatch, NOT_GAMEOVER_FILTER,
        SUMMARY_COLUMNS, id_filter,
    },
};

const REST_PREFIX: &str = "rest/v1";

/// [`Mirror`] backed by a PostgREST-style HTTP interface.
#[derive(Clone)]
pub struct RestMirror {
    client: Client,
    base_url: Arc<str>,
    table: Arc<str>,
    api_key: Option<Arc<str>>,
}

/// Decode listed rows, dropping (and logging) the ones that do not parse so a
/// single malformed row does not hide every other match from the sweep.
fn parse_summaries(rows: Vec<Value>) -> Vec<MatchSummary> {
    rows.into_iter()
        .filter_map(|row| {
            let match_id = row
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing id>")
                .to_owned();
            match serde_json::from_value::<MatchSummary>(row) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(match_id = %match_id, error = %err, "skipping malformed mirror row");
                    None
                }
            }
        })
        .collect()
}

impl RestMirror {
    /// Build the HTTP client; no request is issued until the first call.
    pub fn new(config: RestMirrorConfig) -> RestMirrorResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestMirrorError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            table: Arc::<str>::from(config.matches_table),
            api_key: config.api_key.map(Arc::<str>::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, REST_PREFIX, path);
        let builder = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            builder
                .header("apikey", key.as_ref())
                .bearer_auth(key.as_ref())
        } else {
            builder
        }
    }

    async fn send(
        &self,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> RestMirrorResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| RestMirrorError::RequestSend {
                path: path.to_owned(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            status => Err(RestMirrorError::RequestStatus {
                path: path.to_owned(),
                status,
            }),
        }
    }

    async fn decode<T>(path: &str, response: reqwest::Response) -> RestMirrorResult<T>
    where
        T: DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| RestMirrorError::DecodeResponse {
                path: path.to_owned(),
                source,
            })
    }

    async fn list_active(&self) -> RestMirrorResult<Vec<MatchSummary>> {
        let path = self.table.to_string();
        let builder = self
            .request(Method::GET, &path)
            .query(&[("select", SUMMARY_COLUMNS), ("status", NOT_GAMEOVER_FILTER)]);
        let response = self.send(&path, builder).await?;
        let rows = Self::decode::<Vec<Value>>(&path, response).await?;

        Ok(parse_summaries(rows))
    }

    async fn find_summary(&self, match_id: &str) -> RestMirrorResult<Option<MatchSummary>> {
        let path = self.table.to_string();
        let filter = id_filter(match_id);
        let builder = self.request(Method::GET, &path).query(&[
            ("select", SUMMARY_COLUMNS),
            ("id", filter.as_str()),
            ("limit", "1"),
        ]);
        let response = self.send(&path, builder).await?;
        let mut rows = Self::decode::<Vec<MatchSummary>>(&path, response).await?;

        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn current_player_slot(&self, match_id: &str) -> RestMirrorResult<Option<PlayerSlot>> {
        let builder = self
            .request(Method::POST, CURRENT_PLAYER_RPC)
            .json(&CurrentPlayerArgs { match_id });
        let response = self.send(CURRENT_PLAYER_RPC, builder).await?;
        let value = Self::decode::<Value>(CURRENT_PLAYER_RPC, response).await?;

        if value.is_null() {
            return Ok(None);
        }

        PlayerSlot::from_wire(&value)
            .map(Some)
            .ok_or_else(|| RestMirrorError::UnexpectedSlot {
                match_id: match_id.to_owned(),
                value: value.to_string(),
            })
    }

    async fn set_current_turn_player(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> RestMirrorResult<()> {
        let path = self.table.to_string();
        let filter = id_filter(match_id);
        let builder = self
            .request(Method::PATCH, &path)
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(&CurrentTurnPatch {
                current_turn_player_id: player_id,
            });
        self.send(&path, builder).await?;
        Ok(())
    }

    async fn ping(&self) -> RestMirrorResult<()> {
        let path = self.table.to_string();
        let builder = self
            .request(Method::GET, &path)
            .query(&[("select", "id"), ("limit", "1")]);
        self.send(&path, builder).await.map(|_| ())
    }
}

impl Mirror for RestMirror {
    fn list_active(&self) -> BoxFuture<'static, StorageResult<Vec<MatchSummary>>> {
        let mirror = self.clone();
        Box::pin(async move { mirror.list_active().await.map_err(Into::into) })
    }

    fn find_summary(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<MatchSummary>>> {
        let mirror = self.clone();
        let match_id = match_id.to_owned();
        Box::pin(async move { mirror.find_summary(&match_id).await.map_err(Into::into) })
    }

    fn current_player_slot(
        &self,
        match_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerSlot>>> {
        let mirror = self.clone();
        let match_id = match_id.to_owned();
        Box::pin(async move {
            mirror
                .current_player_slot(&match_id)
                .await
                .map_err(Into::into)
        })
    }

    fn set_current_turn_player(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let mirror = self.clone();
        let match_id = match_id.to_owned();
        let player_id = player_id.to_owned();
        Box::pin(async move {
            mirror
                .set_current_turn_player(&match_id, &player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let mirror = self.clone();
        Box::pin(async move { mirror.ping().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed_and_key_attached() {
        let mirror = RestMirror::new(
            RestMirrorConfig::new("https://mirror.example/").with_api_key("service-key"),
        )
        .unwrap();

        let request = mirror.request(Method::GET, "matches").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://mirror.example/rest/v1/matches"
        );
        assert_eq!(request.headers()["apikey"], "service-key");
        assert_eq!(request.headers()["authorization"], "Bearer service-key");
    }

    #[test]
    fn malformed_rows_are_skipped_without_hiding_the_rest() {
        let rows = vec![
            serde_json::json!({
                "id": "ok",
                "player0_id": "p0",
                "player1_id": "p1",
                "status": "ACTIVE",
                "current_turn_player_id": null,
                "is_correspondence": true,
            }),
            serde_json::json!({"id": "broken", "status": "PAUSED"}),
            serde_json::json!({"status": "ACTIVE"}),
        ];

        let summaries = parse_summaries(rows);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "ok");
        assert!(summaries[0].is_correspondence);
    }

    #[test]
    fn id_filter_uses_equality_operator() {
        assert_eq!(id_filter("abc"), "eq.abc");
    }
}
