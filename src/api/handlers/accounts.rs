//! Exchange account handlers
//!
//! Vault key derivation runs on the blocking pool.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;
use uuid::Uuid;

use crate::api::middleware::AuthenticatedUser;
use crate::api::server::AppState;
use crate::error::{GateError, Result};
use crate::models::{AccountView, CreateAccountRequest, NewExchangeAccount};

/// List the caller's exchange accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse> {
    let accounts = state.accounts.list_for_user(&user.user_id).await?;
    let vault = state.vault.clone();

    let views: Vec<AccountView> = tokio::task::spawn_blocking(move || {
        accounts.iter().map(|account| account.view(&vault)).collect()
    })
    .await
    .map_err(|e| GateError::Internal(e.to_string()))?;

    Ok(Json(views))
}

/// Register an exchange account
pub async fn create_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse> {
    let exchange = req.exchange.trim().to_lowercase();
    if exchange.is_empty() {
        return Err(GateError::InvalidRequest("Exchange is required".to_string()));
    }
    if req.api_key.is_empty() || req.api_secret.is_empty() {
        return Err(GateError::InvalidRequest(
            "API key and secret are required".to_string(),
        ));
    }

    let label = req
        .label
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| exchange.clone());

    let vault = state.vault.clone();
    let (api_key, api_secret) = tokio::task::spawn_blocking(move || {
        Ok::<_, GateError>((vault.encrypt(&req.api_key)?, vault.encrypt(&req.api_secret)?))
    })
    .await
    .map_err(|e| GateError::Internal(e.to_string()))??;

    let account = state
        .accounts
        .create(&NewExchangeAccount {
            user_id: user.user_id.clone(),
            exchange,
            label,
            api_key,
            api_secret,
            is_testnet: req.is_testnet,
        })
        .await?;

    info!(
        id = %account.id,
        exchange = %account.exchange,
        user_id = %user.user_id,
        "Created exchange account"
    );

    let vault = state.vault.clone();
    let view = tokio::task::spawn_blocking(move || account.view(&vault))
        .await
        .map_err(|e| GateError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Delete one of the caller's exchange accounts
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if !state.accounts.delete(id, &user.user_id).await? {
        return Err(GateError::NotFound(format!("Account {} not found", id)));
    }

    info!(id = %id, user_id = %user.user_id, "Deleted exchange account");
    Ok(StatusCode::NO_CONTENT)
}
