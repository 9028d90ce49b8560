//! HTTP handler functions for the crime insights API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use crime_insights_analytics_models::Question;
use crime_insights_incident_models::{IncidentPatch, NewIncident};
use crime_insights_server_models::{
    ApiDeleted, ApiDoc, ApiError, ApiHealth, ApiListResponse, ApiRoot, CrimeListParams,
    QuestionQuery,
};

use crate::AppState;

const NOT_FOUND: &str = "Not found";

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::rejected(NOT_FOUND))
}

fn internal_error(message: &str, e: &dyn std::fmt::Display) -> HttpResponse {
    log::error!("{message}: {e}");
    HttpResponse::InternalServerError().json(ApiError::internal(message))
}

/// `GET /`
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(ApiRoot {
        ok: true,
        service: env!("CARGO_PKG_NAME").to_string(),
        time: Utc::now(),
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/crimes`
pub async fn create_crime(
    state: web::Data<AppState>,
    body: web::Json<NewIncident>,
) -> HttpResponse {
    match state.store.create(&body).await {
        Ok(doc) => HttpResponse::Created().json(ApiDoc::new(doc)),
        Err(e) => internal_error("Failed to create incident", &e),
    }
}

/// `GET /api/crimes`
///
/// Lists incidents newest first with exact-match field filters.
pub async fn list_crimes(
    state: web::Data<AppState>,
    params: web::Query<CrimeListParams>,
) -> HttpResponse {
    let filter = params.filter();
    let page = params.page_request();

    let total = match state.store.count(&filter).await {
        Ok(total) => total,
        Err(e) => return internal_error("Failed to count incidents", &e),
    };

    match state.store.find(&filter, &page).await {
        Ok(rows) => HttpResponse::Ok().json(ApiListResponse {
            total,
            page: params.page(),
            limit: page.limit,
            rows,
        }),
        Err(e) => internal_error("Failed to query incidents", &e),
    }
}

/// `GET /api/crimes/{id}`
pub async fn get_crime(state: web::Data<AppState>, id: web::Path<i64>) -> HttpResponse {
    match state.store.get(*id).await {
        Ok(Some(doc)) => HttpResponse::Ok().json(ApiDoc::new(doc)),
        Ok(None) => not_found(),
        Err(e) => internal_error("Failed to load incident", &e),
    }
}

/// `PUT /api/crimes/{id}`
///
/// Omitted keys are left unchanged; explicit `null` clears a field.
pub async fn update_crime(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    body: web::Json<IncidentPatch>,
) -> HttpResponse {
    match state.store.update(*id, &body).await {
        Ok(Some(doc)) => HttpResponse::Ok().json(ApiDoc::new(doc)),
        Ok(None) => not_found(),
        Err(e) => internal_error("Failed to update incident", &e),
    }
}

/// `DELETE /api/crimes/{id}`
pub async fn delete_crime(state: web::Data<AppState>, id: web::Path<i64>) -> HttpResponse {
    match state.store.delete(*id).await {
        Ok(Some(doc)) => HttpResponse::Ok().json(ApiDeleted {
            ok: true,
            deleted: doc.id,
        }),
        Ok(None) => not_found(),
        Err(e) => internal_error("Failed to delete incident", &e),
    }
}

/// `GET /api/questions`
///
/// Answers the whole catalog in order.
pub async fn questions(state: web::Data<AppState>) -> HttpResponse {
    match state.catalog.answer_all().await {
        Ok(responses) => HttpResponse::Ok().json(responses),
        Err(e) => internal_error("Failed to answer questions", &e),
    }
}

/// `GET /api/questions/{slug}`
pub async fn question(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<QuestionQuery>,
) -> HttpResponse {
    let Ok(question) = slug.parse::<Question>() else {
        return HttpResponse::NotFound().json(ApiError::rejected(format!(
            "Unknown question: {}",
            slug.as_str()
        )));
    };

    match state.catalog.answer(question, query.year).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => internal_error("Failed to answer question", &e),
    }
}
