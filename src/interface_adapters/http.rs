// Shared HTTP response types for lobby routes and WebSocket upgrade failures.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string; every non-2xx JSON body has this shape.
    pub error: String,
}
