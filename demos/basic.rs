//! Minimal strata example — the full middleware pipeline around CRUD-style
//! JSON endpoints and health checks.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -v http://localhost:3000/users/42
//!   curl -v http://localhost:3000/users/7                       # 404 envelope
//!   curl -v -X OPTIONS http://localhost:3000/users/42 \
//!        -H 'origin: http://localhost:5173'                     # preflight, 204
//!   curl -v http://localhost:3000/healthz -H 'x-request-id: my-id'

use strata::middleware::{cors::CorsAdapter, trace::Trace};
use strata::{Config, CorsPolicy, HttpError, Request, Response, Router, Server, StatusCode, health, logging};

#[tokio::main]
async fn main() {
    let config = Config::load().expect("invalid configuration");
    logging::init(config.production, config.log_level.as_deref());

    let app = Router::new()
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::bind(&config.addr())
        .production(config.production)
        .middleware(Trace::new())
        .middleware(CorsAdapter::new(CorsPolicy::with_origins(
            config.allowed_origins.clone(),
        )))
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
//
// Fallible handler: the Err arm rides the chain back to the error responder
// and comes out as a JSON envelope with the hinted status.
async fn get_user(req: Request) -> Result<Response, HttpError> {
    let id = req.param("id").unwrap_or("unknown");
    if id != "42" {
        return Err(HttpError::not_found());
    }
    Ok(Response::json(
        format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes(),
    ))
}

// POST /users
async fn create_user(req: Request) -> Result<Response, HttpError> {
    if req.body().is_empty() {
        return Err(HttpError::status(400, "request body is required"));
    }

    // Real app: let input: CreateUser = serde_json::from_slice(req.body())?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes()))
}
