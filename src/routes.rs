use crate::balance::{compute_balances, direct_debts};
use crate::budget::summarize;
use crate::error::{LedgerError, SettlementError, StoreError, ValidationReason};
use crate::ledger::Ledger;
use crate::schemas::{Budget, Currency, ExpenseDraft, Participant};
use crate::settlement::compute_settlements;
use crate::store::LedgerStore;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("couldn't find trip {0}")]
    TripNotFound(String),
    #[error("trip {0} already exists")]
    TripExists(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("stored trip is corrupted: {0}")]
    Corrupted(LedgerError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::TripNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TripExists(_) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Ledger(LedgerError::DuplicateParticipant(_)) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Corrupted(_) | ApiError::Settlement(_) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let reason = match self {
            ApiError::Ledger(LedgerError::Validation(reason)) => Some(reason_code(*reason)),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "reason": reason,
        }))
    }
}

fn reason_code(reason: ValidationReason) -> &'static str {
    match reason {
        ValidationReason::NegativeAmount => "negative_amount",
        ValidationReason::UnknownParticipant => "unknown_participant",
        ValidationReason::SplitMismatch => "split_mismatch",
        ValidationReason::EmptyBeneficiaries => "empty_beneficiaries",
        ValidationReason::ExcessPrecision => "excess_precision",
        ValidationReason::DuplicateExpenseId => "duplicate_expense_id",
        ValidationReason::AmountTooLarge => "amount_too_large",
        ValidationReason::InvalidCurrency => "invalid_currency",
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripJson {
    pub owner_name: String,
    #[serde(default)]
    pub currency: Currency,
}

async fn load_ledger<S: LedgerStore>(store: &S, trip_id: &str) -> Result<Ledger, ApiError> {
    let state = store
        .load_ledger_state(trip_id)
        .await?
        .ok_or_else(|| ApiError::TripNotFound(trip_id.to_owned()))?;
    Ledger::from_state(state).map_err(|err| {
        tracing::error!(trip = %trip_id, error = %err, "stored ledger fails validation");
        ApiError::Corrupted(err)
    })
}

async fn list_trips<S: LedgerStore>(store: web::Data<S>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(store.trip_ids().await?))
}

async fn create_trip<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
    json: web::Json<CreateTripJson>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if store.load_ledger_state(&id).await?.is_some() {
        return Err(ApiError::TripExists(id));
    }
    let CreateTripJson {
        owner_name,
        currency,
    } = json.into_inner();
    let ledger = Ledger::with_owner(currency, owner_name)?;
    store.save_ledger_state(&id, ledger.state()).await?;
    tracing::info!(trip = %id, currency = %ledger.currency().code, "trip created");
    Ok(HttpResponse::Created().json(ledger.state()))
}

async fn get_trip<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ledger = load_ledger(store.get_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(ledger.state()))
}

async fn end_trip<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if store.delete_ledger_state(&id).await? {
        tracing::info!(trip = %id, "trip ended");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::TripNotFound(id))
    }
}

async fn add_participant<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
    participant: web::Json<Participant>,
) -> Result<HttpResponse, ApiError> {
    let mut ledger = load_ledger(store.get_ref(), &id).await?;
    let participant = participant.into_inner();
    ledger.add_participant(participant.clone())?;
    store.save_ledger_state(&id, ledger.state()).await?;
    Ok(HttpResponse::Created().json(participant))
}

async fn add_expense<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
    expense: web::Json<ExpenseDraft>,
) -> Result<HttpResponse, ApiError> {
    let mut ledger = load_ledger(store.get_ref(), &id).await?;
    let expense = ledger.add_expense(expense.into_inner())?.clone();
    store.save_ledger_state(&id, ledger.state()).await?;
    Ok(HttpResponse::Created().json(expense))
}

async fn remove_expense<S: LedgerStore>(
    store: web::Data<S>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (id, expense_id) = path.into_inner();
    let mut ledger = load_ledger(store.get_ref(), &id).await?;
    let removed = ledger.remove_expense(&expense_id)?;
    store.save_ledger_state(&id, ledger.state()).await?;
    Ok(HttpResponse::Ok().json(removed))
}

async fn get_balances<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ledger = load_ledger(store.get_ref(), &id).await?;
    let balances = compute_balances(&ledger.snapshot())?;
    Ok(HttpResponse::Ok().json(balances.into_amounts()))
}

async fn get_settlements<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ledger = load_ledger(store.get_ref(), &id).await?;
    let balances = compute_balances(&ledger.snapshot())?;
    Ok(HttpResponse::Ok().json(compute_settlements(&balances)?))
}

async fn get_debts<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ledger = load_ledger(store.get_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(direct_debts(&ledger.snapshot())?))
}

async fn get_budget<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ledger = load_ledger(store.get_ref(), &id).await?;
    Ok(HttpResponse::Ok().json(summarize(&ledger.snapshot())))
}

async fn set_budget<S: LedgerStore>(
    store: web::Data<S>,
    id: web::Path<String>,
    budget: web::Json<Budget>,
) -> Result<HttpResponse, ApiError> {
    let mut ledger = load_ledger(store.get_ref(), &id).await?;
    ledger.set_budget(budget.into_inner())?;
    store.save_ledger_state(&id, ledger.state()).await?;
    Ok(HttpResponse::Ok().json(summarize(&ledger.snapshot())))
}

/// Registers every trip endpoint against the store held in app data.
pub fn configure<S: LedgerStore + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/trips").route(web::get().to(list_trips::<S>)))
        .service(
            web::resource("/trips/{id}")
                .route(web::get().to(get_trip::<S>))
                .route(web::put().to(create_trip::<S>))
                .route(web::delete().to(end_trip::<S>)),
        )
        .service(
            web::resource("/trips/{id}/participants")
                .route(web::post().to(add_participant::<S>)),
        )
        .service(web::resource("/trips/{id}/expenses").route(web::post().to(add_expense::<S>)))
        .service(
            web::resource("/trips/{id}/expenses/{expense_id}")
                .route(web::delete().to(remove_expense::<S>)),
        )
        .service(web::resource("/trips/{id}/balances").route(web::get().to(get_balances::<S>)))
        .service(
            web::resource("/trips/{id}/settlements").route(web::get().to(get_settlements::<S>)),
        )
        .service(web::resource("/trips/{id}/debts").route(web::get().to(get_debts::<S>)))
        .service(
            web::resource("/trips/{id}/budget")
                .route(web::get().to(get_budget::<S>))
                .route(web::put().to(set_budget::<S>)),
        );
}
