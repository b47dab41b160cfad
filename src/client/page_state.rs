//! Last-visited page, remembered per user.
//!
//! The local copy is authoritative; the backend copy lets another device pick
//! up where the user left off. Remote failures are logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::ClientParts;
use crate::Result;
use crate::transport::ApiRequest;

/// Endpoint for page state.
const PAGE_STATE_PATH: &str = "/page-state";

/// Where the user was, and what the page had on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub user_id: String,
    pub page_name: String,
    #[serde(default = "empty_object")]
    pub page_data: Value,
    pub timestamp: DateTime<Utc>,
    pub last_visited: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Saves and restores [`PageState`] for the signed-in user.
#[derive(Clone)]
pub struct PageStateClient {
    parts: ClientParts,
}

impl PageStateClient {
    pub fn new(parts: ClientParts) -> Self {
        Self { parts }
    }

    /// Remember `page_name` as the user's current page.
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn save_page(
        &self,
        page_name: &str,
        page_data: Option<Value>,
    ) -> Result<Option<PageState>> {
        let Some(user_id) = self.parts.remote.current_user() else {
            debug!("no signed-in user, page state not saved");
            return Ok(None);
        };
        let now = self.parts.clock.now();
        let state = PageState {
            user_id: user_id.clone(),
            page_name: page_name.to_string(),
            page_data: page_data.unwrap_or_else(empty_object),
            timestamp: now,
            last_visited: now,
        };
        let value = serde_json::to_value(&state)?;
        self.parts.store.lock().await.set_page(&user_id, value.clone());

        if self.parts.executor.prober().is_available().await {
            if let Err(e) = self.parts.remote.send(ApiRequest::post(PAGE_STATE_PATH, value)).await {
                warn!(error = %e, "could not save page state to server");
            }
        }
        Ok(Some(state))
    }

    /// The user's last page: local copy first, then the backend.
    ///
    /// A copy fetched from the backend is cached locally.
    pub async fn last_page(&self) -> Result<Option<PageState>> {
        let Some(user_id) = self.parts.remote.current_user() else {
            return Ok(None);
        };
        if let Some(local) = self.parts.store.lock().await.page(&user_id) {
            if let Ok(state) = serde_json::from_value::<PageState>(local.clone()) {
                return Ok(Some(state));
            }
        }
        if !self.parts.executor.prober().is_available().await {
            return Ok(None);
        }

        match self.parts.remote.send(ApiRequest::get(PAGE_STATE_PATH)).await {
            Ok(body) if body.get("pageName").is_some() => {
                let state: PageState = match serde_json::from_value(body.clone()) {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(error = %e, "server page state is malformed");
                        return Ok(None);
                    }
                };
                self.parts.store.lock().await.set_page(&user_id, body);
                Ok(Some(state))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(error = %e, "could not get page state from server");
                Ok(None)
            }
        }
    }

    /// Forget the user's page, locally and on the backend.
    pub async fn clear(&self) -> Result<()> {
        let Some(user_id) = self.parts.remote.current_user() else {
            return Ok(());
        };
        self.parts.store.lock().await.clear_page(&user_id);
        if self.parts.executor.prober().is_available().await {
            if let Err(e) = self.parts.remote.send(ApiRequest::delete(PAGE_STATE_PATH)).await {
                warn!(error = %e, "could not delete page state from server");
            }
        }
        Ok(())
    }
}
