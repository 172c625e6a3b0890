//! # Handlers
//!
//! Coordinates the flow between HTTP requests and the core services. The
//! ledger is the only thing that ever touches balances; handlers sequence
//! identity → moderation → money and broadcast after state changes land.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use domains::{BroadcastEvent, DomainError, MinRole, Platform};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{require_session, require_user};
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bridge/chat/{platform}", post(bridge_chat))
        .route("/me", get(me))
        .route("/store/items", get(store_items))
        .route("/store/purchase", post(store_purchase))
        .route("/store/equip", post(store_equip))
        .route("/redeem", post(redeem))
        .route("/moderation/bans", get(moderation_bans))
        .route("/moderation/ban", post(moderation_ban))
        .route("/moderation/unban", post(moderation_unban))
        .layer(TraceLayer::new_for_http())
        .layer(cors_policy())
        .with_state(state)
}

// The UI and the bridge live on different origins.
fn cors_policy() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

#[derive(Deserialize)]
struct BridgeChatPayload {
    user_id: String,
    display_name: String,
    text: String,
}

/// Inbound message from a platform chat bridge.
async fn bridge_chat(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<BridgeChatPayload>,
) -> ApiResult<Json<Value>> {
    // 1. Shared-secret gate for the bridge
    if let Some(expected) = &state.bridge_secret {
        let provided = headers.get("x-bridge-secret").and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(DomainError::Forbidden("bad bridge secret".to_string()).into());
        }
    }
    let platform: Platform = platform.parse()?;
    if payload.user_id.is_empty() || payload.text.trim().is_empty() {
        return Err(DomainError::InvalidInput("user_id and text are required".to_string()).into());
    }

    // 2. Canonical identity
    let account_id = state.identity.resolve(platform, &payload.user_id, None).await?;
    state.ledger.ensure_account(account_id, Some(&payload.display_name)).await?;

    // 3. Ban gate: suspended accounts neither chat nor earn
    if state.moderation.is_banned(account_id).await? {
        return Ok(Json(json!({ "ok": false, "banned": true })));
    }

    // 4. Automod scan
    if let Some(action) = state.automod.scan(account_id, &payload.text).await? {
        state
            .notifier
            .broadcast(BroadcastEvent::Timeout {
                user_id: action.user_id,
                duration_minutes: action.duration_minutes,
                reason: action.reason.clone(),
                kind: action.kind,
            })
            .await;
        return Ok(Json(json!({ "ok": false, "blocked": true, "reason": action.reason })));
    }

    // 5. Throttled message award
    state.ledger.award_message_points(account_id, platform).await?;

    // 6. Relay to the chat room
    state
        .notifier
        .broadcast(BroadcastEvent::Chat {
            user_id: account_id,
            display_name: payload.display_name,
            text: payload.text,
            platform,
        })
        .await;

    Ok(Json(json!({ "ok": true, "account_id": account_id })))
}

/// The signed-in viewer's account, balance, and inventory.
async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let (_sid, session, user) = require_user(&state, &headers).await?;
    services::session::ensure_bonuses(&session, &state.accounts, &state.ledger).await?;
    let account = state.accounts.load_account(user.id, Some(&user.display_name)).await?;
    let balance = state.ledger.balance(user.id).await?;
    Ok(Json(json!({ "ok": true, "account": account, "balance": balance })))
}

async fn store_items(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let catalog = state.storefront.catalog().await?;
    let redeems = state.storefront.redeem_options().await?;
    Ok(Json(json!({ "ok": true, "items": catalog.items, "redeems": redeems.options })))
}

#[derive(Deserialize)]
struct ItemPayload {
    item_id: String,
}

async fn store_purchase(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemPayload>,
) -> ApiResult<Json<Value>> {
    let (_sid, _session, user) = require_user(&state, &headers).await?;
    let receipt = state.storefront.purchase(user.id, &payload.item_id).await?;
    Ok(Json(json!({ "ok": true, "balance": receipt.balance, "inventory": receipt.inventory })))
}

async fn store_equip(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ItemPayload>,
) -> ApiResult<Json<Value>> {
    let (_sid, _session, user) = require_user(&state, &headers).await?;
    let outcome = state.storefront.equip(user.id, &payload.item_id).await?;
    Ok(Json(json!({ "ok": true, "slot": outcome.slot, "equipped": outcome.equipped })))
}

#[derive(Deserialize)]
struct RedeemPayload {
    redeem_id: String,
}

async fn redeem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RedeemPayload>,
) -> ApiResult<Json<Value>> {
    let (_sid, _session, user) = require_user(&state, &headers).await?;
    let receipt = state.storefront.redeem(user.id, &payload.redeem_id).await?;
    state
        .notifier
        .broadcast(BroadcastEvent::Redeem {
            user_id: user.id,
            redeem_id: receipt.redeem_id.clone(),
            cost: receipt.cost,
        })
        .await;
    Ok(Json(json!({ "ok": true, "balance": receipt.balance })))
}

async fn moderation_bans(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let (_sid, session) = require_session(&state, &headers).await?;
    state.moderation.require_role(&session, MinRole::Mod).await?;
    let bans = state.moderation.bans().await?;
    Ok(Json(json!({ "ok": true, "bans": bans })))
}

#[derive(Deserialize)]
struct BanPayload {
    user_id: Uuid,
    reason: String,
    duration_minutes: Option<i64>,
}

async fn moderation_ban(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BanPayload>,
) -> ApiResult<Json<Value>> {
    let (_sid, session) = require_session(&state, &headers).await?;
    let grant = state.moderation.require_role(&session, MinRole::Mod).await?;
    let moderator_name = session
        .user
        .as_ref()
        .map(|user| user.display_name.clone())
        .unwrap_or_default();

    let record = state
        .moderation
        .record_manual_ban(
            payload.user_id,
            &payload.reason,
            payload.duration_minutes,
            &grant,
            &moderator_name,
        )
        .await?;
    state
        .notifier
        .broadcast(BroadcastEvent::Timeout {
            user_id: record.user_id,
            duration_minutes: payload.duration_minutes.unwrap_or(0),
            reason: record.reason.clone(),
            kind: record.ban_kind,
        })
        .await;
    Ok(Json(json!({ "ok": true, "ban": record })))
}

#[derive(Deserialize)]
struct UnbanPayload {
    user_id: Uuid,
}

async fn moderation_unban(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UnbanPayload>,
) -> ApiResult<Json<Value>> {
    let (_sid, session) = require_session(&state, &headers).await?;
    state.moderation.require_role(&session, MinRole::Mod).await?;
    state.moderation.lift_ban(payload.user_id).await?;
    Ok(Json(json!({ "ok": true })))
}
