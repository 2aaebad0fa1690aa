use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::AUDIT_NOTICE;
use crate::aggregate::Summary;
use crate::config::DashboardConfig;
use crate::dataset::AccessLog;
use crate::downloader::{self, ExportFormat};
use crate::error::DashboardError;
use crate::facets::FacetOptions;
use crate::filter::FilterSpec;
use crate::graph::{self, ChartKind, ChartOptions, ChartOutcome};
use crate::loader;
use crate::record::FileType;

/// Shared, read-only server state; requests never mutate it
pub struct AppState {
    log: AccessLog,
    facets: FacetOptions,
}

impl AppState {
    pub fn new(log: AccessLog) -> Self {
        let facets = FacetOptions::from_log(&log);
        AppState { log, facets }
    }
}

/// Filter parameters as they arrive in the query string.
/// Blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
struct FilterQuery {
    user: Option<String>,
    action: Option<String>,
    file_type: Option<String>,
    search: Option<String>,
    file: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

impl FilterQuery {
    fn to_spec(&self) -> Result<FilterSpec, DashboardError> {
        Ok(FilterSpec {
            user: non_blank(&self.user),
            action: non_blank(&self.action),
            file_type: non_blank(&self.file_type).map(|t| t.parse::<FileType>()).transpose()?,
            file_name_contains: non_blank(&self.search),
            file_name: non_blank(&self.file),
            start_date: self.from,
            end_date: self.to,
        })
    }
}

#[derive(Deserialize)]
struct FormatQuery {
    format: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct FacetsResponse<'a> {
    notice: &'static str,
    total_events: usize,
    facets: &'a FacetOptions,
}

struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DashboardError::InvalidDateRange { .. }
            | DashboardError::UnknownFileType(_)
            | DashboardError::UnknownChart(_)
            | DashboardError::UnsupportedSource(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (
            status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.0.to_string()),
            }),
        )
            .into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/facets", get(get_facets))
        .route("/api/summary", get(get_summary))
        .route("/api/rows", get(get_rows))
        .route("/api/chart/:kind", get(get_chart))
        .route("/api/export", get(export_rows))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Load once; every request reads the same log
    let log = loader::load_access_log(&config.source)?;
    let app_state = Arc::new(AppState::new(log));

    let app = router(app_state);

    let listener = TcpListener::bind(&config.web.bind).await?;
    info!("Listening on http://{}", config.web.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_facets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(FacetsResponse {
        notice: AUDIT_NOTICE,
        total_events: state.log.len(),
        facets: &state.facets,
    })
    .into_response()
}

async fn get_summary(
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Summary>, ApiError> {
    let view = query.to_spec()?.apply(&state.log)?;
    Ok(Json(Summary::from_view(&view)))
}

async fn get_rows(
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let view = query.to_spec()?.apply(&state.log)?;
    if !view.has_table() {
        return Ok(Json(StatusResponse {
            status: "no_data".to_string(),
            message: Some("No rows match the selected filters".to_string()),
        })
        .into_response());
    }
    Ok(Json(serde_json::json!({
        "status": "ok",
        "rows": view.table_rows(),
    }))
    .into_response())
}

async fn get_chart(
    Path(kind): Path<String>,
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let kind: ChartKind = kind.parse()?;
    let view = query.to_spec()?.apply(&state.log)?;
    let summary = Summary::from_view(&view);

    match graph::render_chart(&summary, kind, &ChartOptions::default())? {
        ChartOutcome::Png(png) => Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response()),
        ChartOutcome::NoData => Ok(Json(StatusResponse {
            status: "no_data".to_string(),
            message: Some(format!("No data for '{}'", kind.title())),
        })
        .into_response()),
    }
}

async fn export_rows(
    Query(format): Query<FormatQuery>,
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let format = match format.format.as_deref().unwrap_or("csv") {
        "csv" => ExportFormat::Csv,
        "xlsx" => ExportFormat::Xlsx,
        other => {
            return Err(DashboardError::UnsupportedSource(format!("unknown export format '{other}'")).into());
        }
    };
    let view = query.to_spec()?.apply(&state.log)?;
    let bytes = downloader::export(&view, format)?;

    let disposition = format!("attachment; filename=\"accesos.{}\"", format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AccessEvent;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn access(user: &str, day: u32, action: &str, file_type: FileType, name: &str) -> AccessEvent {
        AccessEvent {
            user: Some(user.to_string()),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            action: Some(action.to_string()),
            element_type: Some("Archivo".to_string()),
            url: format!("https://intranet/docs/{name}"),
            file_type,
            file_name: Some(name.to_string()),
        }
    }

    fn app(has_file_names: bool) -> Router {
        let log = AccessLog::new(
            vec![
                access("ana", 1, "view", FileType::Pdf, "Report.PDF"),
                access("ana", 2, "download", FileType::Docx, "minutes.docx"),
                access("bob", 1, "view", FileType::Pdf, "budget.pdf"),
            ],
            has_file_names,
        );
        router(Arc::new(AppState::new(log)))
    }

    struct Reply {
        status: StatusCode,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    impl Reply {
        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    async fn get(app: Router, uri: &str) -> Reply {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply {
            status,
            content_type,
            body,
        }
    }

    #[tokio::test]
    async fn summary_applies_query_filters() {
        let reply = get(app(true), "/api/summary?user=ana&file_type=pdf").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["total"], 1);

        // blank parameters mean "no filter"
        let reply = get(app(true), "/api/summary?user=&file_type=&search=").await;
        assert_eq!(reply.json()["total"], 3);
    }

    #[tokio::test]
    async fn inverted_range_is_a_bad_request() {
        let reply = get(app(true), "/api/summary?from=2024-01-05&to=2024-01-01").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["status"], "error");
    }

    #[tokio::test]
    async fn unknown_file_type_and_chart_are_bad_requests() {
        let reply = get(app(true), "/api/rows?file_type=pptx").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["status"], "error");

        let reply = get(app(true), "/api/chart/histogram").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.json()["status"], "error");
    }

    #[tokio::test]
    async fn rows_report_no_data() {
        let reply = get(app(true), "/api/rows?user=ana").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["status"], "ok");
        assert_eq!(reply.json()["rows"].as_array().map(Vec::len), Some(2));

        let reply = get(app(true), "/api/rows?user=nobody").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["status"], "no_data");

        // no file-name column, no table
        let reply = get(app(false), "/api/rows").await;
        assert_eq!(reply.json()["status"], "no_data");
    }

    #[tokio::test]
    async fn charts_answer_png_or_no_data() {
        let reply = get(app(true), "/api/chart/daily").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type.as_deref(), Some("image/png"));
        assert_eq!(&reply.body[..4], b"\x89PNG");

        let reply = get(app(true), "/api/chart/users?user=nobody").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json()["status"], "no_data");
    }

    #[tokio::test]
    async fn export_sets_the_content_type() {
        let reply = get(app(true), "/api/export?format=xlsx&user=ana").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            reply.content_type.as_deref(),
            Some(ExportFormat::Xlsx.content_type())
        );
        assert_eq!(&reply.body[..2], b"PK");

        let reply = get(app(true), "/api/export").await;
        assert_eq!(reply.content_type.as_deref(), Some(ExportFormat::Csv.content_type()));
        assert!(String::from_utf8(reply.body).unwrap().starts_with("Usuario,"));

        let reply = get(app(true), "/api/export?format=pdf").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn facets_carry_the_notice() {
        let reply = get(app(true), "/api/facets").await;
        let body = reply.json();
        assert_eq!(body["notice"], AUDIT_NOTICE);
        assert_eq!(body["total_events"], 3);
        assert_eq!(body["facets"]["users"], serde_json::json!(["ana", "bob"]));
    }
}
