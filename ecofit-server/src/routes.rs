use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tracing::{error, info};

use ecofit_core::{
    model::{Profile, UserAccount, UserId},
    ports::StoreError,
};

use crate::{
    error::AppError,
    payloads::{
        DisposalResponse, DisposeRequest, DistanceRequest, DistanceResponse, FitRequest,
        LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, RegisterResponse,
        SensorFitResponse,
    },
    state::AppState,
};

/// Every API route under `/api/v1`, plus the root banner.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/health/db", get(database_health_handler))
        .route("/dispose", post(dispose_handler))
        .route("/fit", post(fit_handler))
        .route(
            "/check-distance",
            get(distance_handler).post(sensor_fit_handler),
        )
        .route("/user/register", post(register_handler))
        .route("/user/login", post(login_handler))
        .route("/user/{user_id}", get(user_handler))
        .route("/user/{user_id}/profile", put(profile_handler));

    Router::new()
        .route("/", get(root_handler))
        .nest("/api/v1", api)
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "EcoFit Waste Classification API",
        "version": "1.0.0",
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "waste-classification" }))
}

async fn database_health_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let store = state.accounts.store();
    match store.ping().await {
        Ok(()) => Ok(Json(json!({
            "status": "connected",
            "database": store.database_name(),
            "message": "SQLite connection is healthy",
        }))),
        Err(StoreError::NotConnected) => {
            Err(AppError::Unavailable(StoreError::NotConnected.to_string()))
        }
        Err(err) => {
            error!("Database health check failed: {err}");
            Err(AppError::Unavailable("Database connection failed".to_owned()))
        }
    }
}

async fn dispose_handler(
    State(state): State<AppState>,
    payload: Result<Json<DisposeRequest>, JsonRejection>,
) -> Result<Json<DisposalResponse>, AppError> {
    let (input, volume) = body(payload)?.validate()?;
    let report = state.service.dispose(&input, volume).await;
    info!(
        waste_type = %report.classification.waste_type,
        fit_status = %report.verdict.status,
        "item classified"
    );
    Ok(Json(DisposalResponse::classified(report)))
}

async fn fit_handler(
    State(state): State<AppState>,
    payload: Result<Json<FitRequest>, JsonRejection>,
) -> Result<Json<DisposalResponse>, AppError> {
    let request = body(payload)?;
    let (waste_type, volume) = request.validate()?;
    let report = state
        .service
        .assess_known(waste_type, volume, request.bin_category.as_deref());
    Ok(Json(DisposalResponse::assessed(report)))
}

async fn distance_handler(
    State(state): State<AppState>,
) -> Result<Json<DistanceResponse>, AppError> {
    let reading = state.service.read_sensor().await?;
    Ok(Json(DistanceResponse {
        status: "ok",
        distance_cm: reading.distance_cm,
        read_at: reading.read_at,
    }))
}

async fn sensor_fit_handler(
    State(state): State<AppState>,
    payload: Result<Json<DistanceRequest>, JsonRejection>,
) -> Result<Json<SensorFitResponse>, AppError> {
    let volume = body(payload)?.validate()?;
    let report = state.service.sensor_fit(volume).await?;
    Ok(Json(report.into()))
}

async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let registration = body(payload)?.validate()?;
    let user_id = state.accounts.register(registration).await?;
    let account = state.accounts.account(&user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id,
            email: account.email,
        }),
    ))
}

async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let request = body(payload)?;
    request.validate()?;
    let user_id = state.accounts.login(&request.email, request.password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        user_id,
        token: None,
    }))
}

async fn user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(state.accounts.account(&UserId(user_id)).await?))
}

async fn profile_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let update = body(payload)?;
    state
        .accounts
        .update_profile(&UserId(user_id), update)
        .await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        success: true,
    }))
}
