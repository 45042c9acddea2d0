use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult, OptionExt},
    repository::{non_empty, NewUser, UserChanges},
    response::ApiResponse,
    state::AppState,
    validation::Validated,
};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserBody {
    name: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
}

pub async fn list_users(State(state): State<AppState>, Extension(v): Extension<Validated>) -> AppResult<ApiResponse> {
    let q: PageQuery = v.query_as()?;
    let page = q.page.unwrap_or(DEFAULT_PAGE);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT);

    let users = state.users.find_page(page, limit).await?;
    let total = state.users.count().await?;
    Ok(ApiResponse::success_with("Users retrieved successfully", &users)?.with_pagination(page, limit, total))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(v): Extension<Validated>,
) -> AppResult<(StatusCode, ApiResponse)> {
    let body: UserBody = v.body_as()?;
    let new_user = NewUser {
        name: body.name.unwrap_or_default(),
        email: non_empty(body.email),
        avatar: non_empty(body.avatar),
    };
    let user = state.users.create(&new_user).await?;
    Ok((StatusCode::CREATED, ApiResponse::success_with("User created successfully", &user)?))
}

pub async fn get_user(State(state): State<AppState>, Extension(v): Extension<Validated>) -> AppResult<ApiResponse> {
    let IdParams { id } = v.params_as()?;
    let user = state.users.find_by_id(id).await?.ok_or_not_found("User")?;
    Ok(ApiResponse::success_with("User retrieved successfully", &user)?)
}

pub async fn update_user(State(state): State<AppState>, Extension(v): Extension<Validated>) -> AppResult<ApiResponse> {
    let IdParams { id } = v.params_as()?;
    let body: UserBody = v.body_as()?;
    let changes = UserChanges {
        name: non_empty(body.name),
        email: non_empty(body.email),
        avatar: non_empty(body.avatar),
    };
    let user = state.users.update(id, &changes).await?.ok_or_not_found("User")?;
    Ok(ApiResponse::success_with("User updated successfully", &user)?)
}

pub async fn delete_user(State(state): State<AppState>, Extension(v): Extension<Validated>) -> AppResult<ApiResponse> {
    let IdParams { id } = v.params_as()?;
    if !state.users.delete(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    Ok(ApiResponse::success("User deleted successfully", None, None))
}
