use axum::{
    extract::{Path, State},
    Json,
};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use page_sensor::Sensor;

use crate::AppState;

use super::AppError;

// ─── Domain type ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    /// Price in cents (e.g. 12999 = $129.99)
    pub price: u64,
    pub stock: u32,
    pub category: String,
    pub description: String,
}

// ─── GET /api/products/:id ───────────────────────────────────────

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    sensor: Sensor,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let key = format!("product:{id}");

    let map: HashMap<String, String> = {
        let _timer = sensor.task("redis_read");
        let mut conn = state.redis.clone();
        conn.hgetall(&key).await?
    };

    if map.is_empty() {
        return Err(AppError::NotFound(format!("product '{id}' not found")));
    }

    let product = {
        let _timer = sensor.task("decode");
        product_from_map(&map)
    };

    Ok(Json(product))
}

// ─── Helpers ─────────────────────────────────────────────────────

fn product_from_map(map: &HashMap<String, String>) -> Product {
    Product {
        id: map.get("id").cloned().unwrap_or_default(),
        title: map.get("title").cloned().unwrap_or_default(),
        price: map
            .get("price")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        stock: map
            .get("stock")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        category: map.get("category").cloned().unwrap_or_default(),
        description: map.get("description").cloned().unwrap_or_default(),
    }
}
