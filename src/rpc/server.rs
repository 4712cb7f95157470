//! RPC HTTP Server
//!
//! Axum-based HTTP server that handles JSON-RPC requests from the ledger
//! front end.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::rpc::methods::{handle_request, JsonRpcRequest, JsonRpcResponse, RpcState};

/// Build the router; split out so tests can drive it without a socket.
pub fn rpc_router(state: RpcState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_rpc))
        .layer(cors)
        .with_state(state)
}

/// Start the RPC server on the specified port
pub async fn start_rpc_server(state: RpcState, port: u16) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("RPC server listening on http://{addr}");

    axum::serve(listener, rpc_router(state))
        .await
        .map_err(std::io::Error::other)
}

/// Handle incoming JSON-RPC requests
async fn handle_rpc(
    State(state): State<RpcState>,
    Json(request): Json<JsonRpcRequest>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let response = handle_request(&state, request).await;
    (StatusCode::OK, Json(response))
}
