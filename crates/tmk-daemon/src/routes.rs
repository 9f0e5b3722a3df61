//! Axum router and all HTTP handlers for tmk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so tests can use the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tmk_ledger::{
    build_ledger, format_currency, format_percent, format_qty, FifoLedger, HistoryError,
    LedgerError, Micros, Qty,
};
use tmk_md::{PricingError, RegistryError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, LedgerView, PriceResponse, ReplayRequest, ReplayResponse,
        SaleResponse, TradeRequest,
    },
    state::{AppState, BusMsg, LedgerEvent},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/ledgers/:asset", get(ledger_view))
        .route("/v1/ledgers/:asset/purchases", post(record_purchase))
        .route("/v1/ledgers/:asset/sales", post(record_sale))
        .route("/v1/ledgers/:asset/replay", post(replay))
        .route("/v1/ledgers/:asset/reset", post(reset))
        .route("/v1/prices/:asset", get(price))
        .with_state(state)
}

fn error(status: StatusCode, kind: &str, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(kind, msg))).into_response()
}

fn ledger_error(e: LedgerError) -> Response {
    match e {
        LedgerError::InvalidInput { .. } => {
            error(StatusCode::BAD_REQUEST, "invalid_input", e.to_string())
        }
        LedgerError::InsufficientLots { .. } => {
            error(StatusCode::CONFLICT, "insufficient_lots", e.to_string())
        }
    }
}

fn publish(st: &AppState, asset_id: &str, action: &str, ledger: &FifoLedger) {
    let s = ledger.summary();
    let _ = st.bus.send(BusMsg::Ledger(LedgerEvent {
        asset_id: asset_id.to_string(),
        action: action.to_string(),
        open_quantity: format_qty(ledger.open_quantity()),
        realized_gain_loss: format_currency(s.total_gain_loss),
        percent_change: format_percent(s.percent_change),
    }));
}

fn parse_trade(req: &TradeRequest) -> Result<(Qty, Micros), Response> {
    let quantity = Qty::parse(&req.quantity.0).map_err(|e| {
        error(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            format!("quantity: {e}"),
        )
    })?;
    let price = Micros::parse(&req.price.0)
        .map_err(|e| error(StatusCode::BAD_REQUEST, "invalid_input", format!("price: {e}")))?;
    Ok((quantity, price))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/ledgers/:asset
// ---------------------------------------------------------------------------

/// Unknown assets read as an empty ledger without creating one.
pub(crate) async fn ledger_view(
    State(st): State<Arc<AppState>>,
    Path(asset): Path<String>,
) -> Response {
    let view = match st.existing_ledger(&asset).await {
        Some(h) => {
            let ledger = h.lock().await;
            LedgerView::of(&asset, &ledger)
        }
        None => LedgerView::of(&asset, &FifoLedger::with_policy(st.options.oversell)),
    };
    (StatusCode::OK, Json(view)).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/purchases
// ---------------------------------------------------------------------------

pub(crate) async fn record_purchase(
    State(st): State<Arc<AppState>>,
    Path(asset): Path<String>,
    Json(req): Json<TradeRequest>,
) -> Response {
    let (quantity, price) = match parse_trade(&req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ts = req.timestamp.unwrap_or_else(Utc::now);

    let handle = st.ledger(&asset).await;
    let mut ledger = handle.lock().await;
    if let Err(e) = ledger.record_purchase(quantity, price, ts) {
        return ledger_error(e);
    }

    info!(asset = %asset, %quantity, %price, "purchase recorded");
    publish(&st, &asset, "purchase", &ledger);
    (StatusCode::OK, Json(LedgerView::of(&asset, &ledger))).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/sales
// ---------------------------------------------------------------------------

pub(crate) async fn record_sale(
    State(st): State<Arc<AppState>>,
    Path(asset): Path<String>,
    Json(req): Json<TradeRequest>,
) -> Response {
    let (quantity, price) = match parse_trade(&req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let ts = req.timestamp.unwrap_or_else(Utc::now);

    let handle = st.ledger(&asset).await;
    let mut ledger = handle.lock().await;
    let outcome = match ledger.record_sale(quantity, price, ts) {
        Ok(o) => o,
        Err(e) => return ledger_error(e),
    };

    info!(
        asset = %asset,
        %quantity,
        %price,
        clipped = %outcome.clipped,
        "sale recorded"
    );
    publish(&st, &asset, "sale", &ledger);
    let view = LedgerView::of(&asset, &ledger);
    (StatusCode::OK, Json(SaleResponse::of(&outcome, view))).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/replay
// ---------------------------------------------------------------------------

/// Rebuild the asset's ledger from full history.
///
/// The new ledger is built without holding the asset lock and swapped in
/// whole, so readers see either the old state or the new one.
pub(crate) async fn replay(
    State(st): State<Arc<AppState>>,
    Path(asset): Path<String>,
    Json(req): Json<ReplayRequest>,
) -> Response {
    let records = match (req.records, req.owner, &st.feed) {
        (Some(records), _, _) => records,
        (None, Some(owner), Some(feed)) => match feed.fetch_transactions(&owner).await {
            Ok(r) => r,
            Err(e) => {
                warn!(asset = %asset, error = %e, "history fetch failed");
                return error(StatusCode::BAD_GATEWAY, "feed_error", e.to_string());
            }
        },
        (None, Some(_), None) => {
            return error(
                StatusCode::SERVICE_UNAVAILABLE,
                "feed_error",
                "no transaction feed configured; send records inline",
            )
        }
        (None, None, _) => {
            return error(
                StatusCode::BAD_REQUEST,
                "invalid_input",
                "replay needs either records or owner",
            )
        }
    };

    let rebuilt = match build_ledger(&asset, &records, st.options) {
        Ok(r) => r,
        Err(HistoryError::Ledger { source, .. }) => return ledger_error(source),
        Err(e @ HistoryError::MalformedRecord { .. }) => {
            return error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "malformed_record",
                e.to_string(),
            )
        }
    };

    let handle = st.ledger(&asset).await;
    let mut ledger = handle.lock().await;
    *ledger = rebuilt.ledger;

    info!(
        asset = %asset,
        purchases = rebuilt.report.purchases,
        sales = rebuilt.report.sales,
        coerced = rebuilt.report.coerced,
        "ledger replayed"
    );
    publish(&st, &asset, "replay", &ledger);
    let view = LedgerView::of(&asset, &ledger);
    (
        StatusCode::OK,
        Json(ReplayResponse::of(&rebuilt.report, view)),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/reset
// ---------------------------------------------------------------------------

pub(crate) async fn reset(State(st): State<Arc<AppState>>, Path(asset): Path<String>) -> Response {
    let handle = st.ledger(&asset).await;
    let mut ledger = handle.lock().await;
    ledger.reset();

    info!(asset = %asset, "ledger reset");
    publish(&st, &asset, "reset", &ledger);
    (StatusCode::OK, Json(LedgerView::of(&asset, &ledger))).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/prices/:asset
// ---------------------------------------------------------------------------

pub(crate) async fn price(State(st): State<Arc<AppState>>, Path(asset): Path<String>) -> Response {
    let Some(pricing) = st.pricing.as_ref() else {
        return error(
            StatusCode::SERVICE_UNAVAILABLE,
            "pricing_not_configured",
            "pricing is not configured",
        );
    };

    match pricing.price(&asset).await {
        Ok(q) => (
            StatusCode::OK,
            Json(PriceResponse {
                asset_id: q.asset_id,
                price: q.price.to_string(),
                formatted: format_currency(q.price),
                source: q.source.as_str().to_string(),
                previous: q.previous.map(|p| p.to_string()),
            }),
        )
            .into_response(),
        Err(PricingError::Registry(e @ RegistryError::UnknownAsset(_))) => {
            error(StatusCode::NOT_FOUND, "unknown_asset", e.to_string())
        }
        Err(e) => error(StatusCode::BAD_GATEWAY, "pricing_unavailable", e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Ledger(_) => "ledger",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
