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

// ─── Domain types ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub prefs: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_prefs")]
    pub prefs: String,
}

fn default_role() -> String {
    "viewer".into()
}
fn default_prefs() -> String {
    r#"{"theme":"light","lang":"en","notifications":true}"#.into()
}

const ROLES: &[&str] = &["admin", "editor", "viewer"];

// ─── GET /api/users/:id ──────────────────────────────────────────

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    sensor: Sensor,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let key = format!("user:{id}");

    let map: HashMap<String, String> = {
        let _timer = sensor.task("redis_read");
        let mut conn = state.redis.clone();
        conn.hgetall(&key).await?
    };

    if map.is_empty() {
        return Err(AppError::NotFound(format!("user '{id}' not found")));
    }

    let user = {
        let _timer = sensor.task("decode");
        user_from_map(&map)
    };

    Ok(Json(user))
}

// ─── POST /api/users ─────────────────────────────────────────────

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    sensor: Sensor,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    {
        let _timer = sensor.task_once("validate");
        validate(&req)?;
    }

    let user = User {
        id: format!("usr_{}", &uuid::Uuid::new_v4().to_string()[..8]),
        name: req.name,
        email: req.email,
        role: req.role,
        prefs: req.prefs,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let key = format!("user:{}", user.id);

    {
        let _timer = sensor.task("redis_write");
        let mut conn = state.redis.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(&key)
            .arg("id")
            .arg(&user.id)
            .arg("name")
            .arg(&user.name)
            .arg("email")
            .arg(&user.email)
            .arg("role")
            .arg(&user.role)
            .arg("prefs")
            .arg(&user.prefs)
            .arg("created_at")
            .arg(&user.created_at);
        let _: () = cmd.query_async(&mut conn).await?;
    }

    Ok(Json(user))
}

// ─── Helpers ─────────────────────────────────────────────────────

fn validate(req: &CreateUserRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if !req.email.contains('@') {
        return Err(AppError::BadRequest(format!(
            "invalid email '{}'",
            req.email
        )));
    }
    if !ROLES.contains(&req.role.as_str()) {
        return Err(AppError::BadRequest(format!("unknown role '{}'", req.role)));
    }
    Ok(())
}

fn user_from_map(map: &HashMap<String, String>) -> User {
    User {
        id: map.get("id").cloned().unwrap_or_default(),
        name: map.get("name").cloned().unwrap_or_default(),
        email: map.get("email").cloned().unwrap_or_default(),
        role: map.get("role").cloned().unwrap_or_default(),
        prefs: map.get("prefs").cloned().unwrap_or_default(),
        created_at: map.get("created_at").cloned().unwrap_or_default(),
    }
}
