//! HTTP surface for the circulation engine. Handlers translate JSON
//! requests into engine/catalog calls and outcomes back into result bodies;
//! domain denials are reported in-band with HTTP 200, storage failures map
//! to 500.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use circulate_core::models::{Book, CreateBookInput, CreateMemberInput, Member, UpdateBookInput, UpdateMemberInput};
use circulate_core::store::StoreError;
use circulate_core::{BookFilter, Catalog, Circulation, ReservationPosition, ReturnOutcome, Verdict};

#[derive(Clone)]
pub struct AppState {
    pub circulation: Circulation,
    pub catalog: Catalog,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/borrow", post(borrow))
        .route("/api/return", post(return_book))
        .route("/api/reserve", post(reserve))
        .route("/api/cancel-reservation", post(cancel_reservation))
        .route("/api/extend", post(extend))
        .route("/api/books", get(list_books).post(create_book))
        .route("/api/books/overdue", get(overdue_books))
        .route("/api/books/{id}", put(update_book).delete(delete_book))
        .route("/api/members", get(list_members).post(create_member))
        .route("/api/members/{id}", put(update_member).delete(delete_member))
        .route("/api/members/{id}/summary", get(member_summary))
        .route("/api/members/{id}/can-borrow", get(can_borrow))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("storage error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct LendingRequest {
    book_id: String,
    member_id: String,
}

#[derive(Debug, Deserialize)]
struct ExtendRequest {
    book_id: String,
    days: i64,
}

#[derive(Debug, Serialize)]
struct ResultBody {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl From<Verdict> for ResultBody {
    fn from(verdict: Verdict) -> Self {
        Self {
            ok: verdict.ok(),
            reason: verdict.reason().map(|r| r.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReturnBody {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_member_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ItemsBody<T> {
    items: Vec<T>,
}

async fn borrow(
    State(state): State<AppState>,
    Json(req): Json<LendingRequest>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.circulation.borrow(&req.book_id, &req.member_id)?;
    Ok(Json(verdict.into()))
}

async fn return_book(
    State(state): State<AppState>,
    Json(req): Json<LendingRequest>,
) -> Result<Json<ReturnBody>, ApiError> {
    let outcome = state.circulation.return_book(&req.book_id, &req.member_id)?;
    let body = match outcome {
        ReturnOutcome::Accepted { handed_to } => ReturnBody {
            ok: true,
            next_member_id: handed_to,
        },
        ReturnOutcome::Refused => ReturnBody {
            ok: false,
            next_member_id: None,
        },
    };
    Ok(Json(body))
}

async fn reserve(
    State(state): State<AppState>,
    Json(req): Json<LendingRequest>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.circulation.reserve(&req.book_id, &req.member_id)?;
    Ok(Json(verdict.into()))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Json(req): Json<LendingRequest>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state
        .circulation
        .cancel_reservation(&req.book_id, &req.member_id)?;
    Ok(Json(verdict.into()))
}

async fn extend(
    State(state): State<AppState>,
    Json(req): Json<ExtendRequest>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.circulation.extend_loan(&req.book_id, req.days)?;
    Ok(Json(verdict.into()))
}

#[derive(Debug, Deserialize)]
struct BookQuery {
    title: Option<String>,
    available: Option<bool>,
    loaned_to: Option<String>,
}

async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Json<ItemsBody<Book>>, ApiError> {
    let filter = BookFilter {
        title_contains: query.title,
        available: query.available,
        loaned_to: query.loaned_to,
    };
    let items = state.circulation.search_books(&filter)?;
    Ok(Json(ItemsBody { items }))
}

#[derive(Debug, Deserialize)]
struct OverdueQuery {
    as_of: Option<NaiveDate>,
}

async fn overdue_books(
    State(state): State<AppState>,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<ItemsBody<Book>>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let items = state.circulation.overdue_books(as_of)?;
    Ok(Json(ItemsBody { items }))
}

async fn create_book(
    State(state): State<AppState>,
    Json(input): Json<CreateBookInput>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.create_book(&input.id, &input.title)?;
    Ok(Json(verdict.into()))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateBookInput>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.update_book(&id, input.title.as_deref())?;
    Ok(Json(verdict.into()))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.delete_book(&id)?;
    Ok(Json(verdict.into()))
}

async fn list_members(State(state): State<AppState>) -> Result<Json<ItemsBody<Member>>, ApiError> {
    let items = state.catalog.members()?;
    Ok(Json(ItemsBody { items }))
}

async fn create_member(
    State(state): State<AppState>,
    Json(input): Json<CreateMemberInput>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.create_member(&input.id, &input.name)?;
    Ok(Json(verdict.into()))
}

async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateMemberInput>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.update_member(&id, input.name.as_deref())?;
    Ok(Json(verdict.into()))
}

async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultBody>, ApiError> {
    let verdict = state.catalog.delete_member(&id)?;
    Ok(Json(verdict.into()))
}

#[derive(Debug, Serialize)]
struct SummaryBody {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    loans: Vec<Book>,
    reservations: Vec<ReservationPosition>,
}

async fn member_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryBody>, ApiError> {
    let body = match state.circulation.member_summary(&id)? {
        Some(summary) => SummaryBody {
            ok: true,
            reason: None,
            loans: summary.loans,
            reservations: summary.reservations,
        },
        None => SummaryBody {
            ok: false,
            reason: Some("MEMBER_NOT_FOUND"),
            loans: Vec::new(),
            reservations: Vec::new(),
        },
    };
    Ok(Json(body))
}

#[derive(Debug, Serialize)]
struct EligibilityBody {
    eligible: bool,
}

async fn can_borrow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EligibilityBody>, ApiError> {
    let eligible = state.circulation.can_borrow(&id)?;
    Ok(Json(EligibilityBody { eligible }))
}
