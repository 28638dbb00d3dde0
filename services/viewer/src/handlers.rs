//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use climate_common::{ClimateError, NamedLocation};
use metrics_exporter_prometheus::PrometheusHandle;
use projection::GeoPoint;
use renderer::{MapViewport, OverlayStrategy};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commands::Command;
use crate::session::DispatchOutcome;
use crate::state::AppState;
use crate::ui::UiSnapshot;

/// A [`ClimateError`] rendered as a JSON body with its mapped status.
#[derive(Debug)]
pub struct ApiError(pub ClimateError);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub recoverable: bool,
}

impl From<ClimateError> for ApiError {
    fn from(err: ClimateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "Request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            recoverable: self.0.is_recoverable(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn png_response(png: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png"), (header::CACHE_CONTROL, "no-store")],
        png,
    )
        .into_response()
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// GET /state
pub async fn state_handler(Extension(state): Extension<Arc<AppState>>) -> Json<UiSnapshot> {
    Json(state.session.ui().await)
}

/// POST /command
pub async fn command_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(command): Json<Command>,
) -> ApiResult<Json<DispatchOutcome>> {
    Ok(Json(state.session.dispatch(command).await?))
}

/// POST /key/:key
pub async fn key_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<DispatchOutcome>> {
    let command = Command::from_key(&key)
        .ok_or_else(|| ClimateError::invalid_parameter("key", format!("'{}' is not bound", key)))?;
    Ok(Json(state.session.dispatch(command).await?))
}

/// GET /view.png
pub async fn view_handler(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    Ok(png_response(state.session.render_canvas_png().await?))
}

/// Slippy-map viewport, all-or-nothing.
#[derive(Debug, Default, Deserialize)]
pub struct OverlayParams {
    pub zoom: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl OverlayParams {
    fn viewport(&self) -> Result<Option<MapViewport>, ClimateError> {
        match (self.zoom, self.lat, self.lon, self.width, self.height) {
            (None, None, None, None, None) => Ok(None),
            (Some(zoom), Some(lat), Some(lon), Some(width), Some(height)) => {
                if width == 0 || height == 0 || width > 4096 || height > 4096 {
                    return Err(ClimateError::invalid_parameter(
                        "width,height",
                        "viewport must be between 1 and 4096 pixels on each side",
                    ));
                }
                if !(0.0..=22.0).contains(&zoom) {
                    return Err(ClimateError::invalid_parameter("zoom", "zoom must be within 0..=22"));
                }
                Ok(Some(MapViewport::centered(GeoPoint::new(lat, lon), zoom, width, height)))
            }
            _ => Err(ClimateError::invalid_parameter(
                "viewport",
                "zoom, lat, lon, width and height must be given together",
            )),
        }
    }
}

/// GET /overlay
///
/// The bitmap strategy returns an image pinned to the bounds in the
/// `X-Overlay-Bounds` header (south,west,north,east). The quad strategy
/// returns an image covering exactly the requested viewport.
pub async fn overlay_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<OverlayParams>,
) -> ApiResult<Response> {
    let viewport = params.viewport()?;
    if viewport.is_none() && state.session.overlay_strategy() == OverlayStrategy::Quads {
        return Err(ClimateError::invalid_parameter("viewport", "the quad overlay needs a viewport").into());
    }
    let image = state.session.render_overlay(viewport).await?;

    let b = image.bounds;
    let mut response = png_response(image.png);
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&format!("{},{},{},{}", b.south, b.west, b.north, b.east)) {
        headers.insert("x-overlay-bounds", v);
    }
    headers.insert("x-overlay-strategy", HeaderValue::from_static(image.strategy.as_str()));
    headers.insert("x-drawn-cells", HeaderValue::from(image.drawn_cells));
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct OverlayInfo {
    pub strategy: OverlayStrategy,
    pub bounds: projection::GeoBounds,
}

/// GET /overlay/bounds
pub async fn overlay_bounds_handler(Extension(state): Extension<Arc<AppState>>) -> Json<OverlayInfo> {
    Json(OverlayInfo {
        strategy: state.session.overlay_strategy(),
        bounds: state.session.overlay_bounds(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationSearch {
    #[serde(default)]
    pub q: String,
}

/// GET /locations?q=
pub async fn locations_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(search): Query<LocationSearch>,
) -> Json<Vec<NamedLocation>> {
    Json(state.session.locations(&search.q).await)
}

/// Either native coordinates from the form, or a canvas click.
#[derive(Debug, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub screen_x: Option<f64>,
    pub screen_y: Option<f64>,
}

fn default_category() -> String {
    "Custom".to_string()
}

/// POST /locations
pub async fn add_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(new): Json<NewLocation>,
) -> ApiResult<(StatusCode, Json<NamedLocation>)> {
    let session = &state.session;
    let added = match (new.x, new.y, new.screen_x, new.screen_y) {
        (Some(x), Some(y), None, None) => session.add_location(&new.name, x, y, &new.category).await?,
        (None, None, Some(sx), Some(sy)) => {
            session
                .add_location_at_click(&new.name, sx, sy, &new.category)
                .await?
        }
        _ => {
            return Err(ClimateError::invalid_parameter(
                "x,y",
                "give either x and y, or screen_x and screen_y",
            )
            .into())
        }
    };
    Ok((StatusCode::CREATED, Json(added)))
}

/// DELETE /locations/:id
pub async fn remove_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<NamedLocation>> {
    Ok(Json(state.session.remove_location(&id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct VisibilityChange {
    /// Omitted to toggle
    pub visible: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub id: String,
    pub visible: bool,
}

/// POST /locations/:id/visibility
pub async fn location_visibility_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(change): Json<VisibilityChange>,
) -> ApiResult<Json<VisibilityResponse>> {
    let visible = state.session.set_location_visible(&id, change.visible).await?;
    Ok(Json(VisibilityResponse { id, visible }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let r = ApiError(ClimateError::invalid_parameter("speed_ms", "zero")).into_response();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
        let r = ApiError(ClimateError::data_unavailable("frame/2022/07", "HTTP 404")).into_response();
        assert_eq!(r.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_viewport_params() {
        assert!(OverlayParams::default().viewport().unwrap().is_none());

        let partial = OverlayParams {
            zoom: Some(6.0),
            ..Default::default()
        };
        assert!(partial.viewport().is_err());

        let full = OverlayParams {
            zoom: Some(6.0),
            lat: Some(54.0),
            lon: Some(-2.0),
            width: Some(256),
            height: Some(256),
        };
        let vp = full.viewport().unwrap().unwrap();
        assert_eq!((vp.width, vp.height), (256, 256));
    }
}
