use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
}

/// Body of `GET /items`: the stored items plus the query the server saw.
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub query: BTreeMap<String, String>,
}

pub type Db = Arc<RwLock<BTreeMap<u64, Item>>>;

/// Router seeded with items 1 through 3.
pub fn app() -> Router {
    let seed = (1..=3).map(|id| {
        (
            id,
            Item {
                id,
                name: format!("item-{id}"),
            },
        )
    });
    let db: Db = Arc::new(RwLock::new(seed.collect()));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item))
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn list_items(
    State(db): State<Db>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<ItemPage> {
    debug!(?query, "list items");
    let items = db.read().await.values().cloned().collect();
    Json(ItemPage { items, query })
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<CreateItem>,
) -> (StatusCode, Json<Item>) {
    let mut items = db.write().await;
    let id = items.keys().next_back().copied().unwrap_or(0) + 1;
    let item = Item {
        id,
        name: input.name,
    };
    items.insert(id, item.clone());
    (StatusCode::CREATED, Json(item))
}

async fn get_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Item>, StatusCode> {
    let items = db.read().await;
    items.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Responds with the requested status and an empty body.
async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Reflects method, headers, query and body back as JSON.
async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: String,
) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "query": query,
        "body": body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: 1,
            name: "Test".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"id": 1, "name": "Test"}));
    }

    #[test]
    fn create_item_rejects_missing_name() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{"id":4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn item_page_roundtrips() {
        let page = ItemPage {
            items: vec![Item {
                id: 2,
                name: "two".to_string(),
            }],
            query: BTreeMap::from([("page".to_string(), "1".to_string())]),
        };
        let back: ItemPage = serde_json::from_value(serde_json::to_value(&page).unwrap()).unwrap();
        assert_eq!(back.items, page.items);
        assert_eq!(back.query, page.query);
    }
}
