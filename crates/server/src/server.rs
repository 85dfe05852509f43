use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{fund_shares, progress, targets};
use engine::{Actor, ActorRole, Engine};

static USER_ID_HEADER: HeaderName = HeaderName::from_static(api_types::headers::USER_ID);
static USER_ROLE_HEADER: HeaderName = HeaderName::from_static(api_types::headers::USER_ROLE);

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

fn single_str<'i, I>(values: &mut I) -> Result<&'i str, AxumError>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(AxumError::invalid)?;
    let value = value.to_str().map_err(|_| AxumError::invalid())?.trim();
    if value.is_empty() {
        return Err(AxumError::invalid());
    }
    Ok(value)
}

fn encode_str<E: Extend<HeaderValue>>(value: &str, values: &mut E) {
    match HeaderValue::from_str(value) {
        Ok(value) => values.extend(std::iter::once(value)),
        Err(_) => tracing::error!("failed to encode actor header"),
    }
}

/// `TypedHeader` carrying the caller's user id.
///
/// Identity is asserted by the upstream gateway; every request must carry
/// "x-user-id".
#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        single_str(values).map(|value| UserIdHeader(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_str(&self.0, values);
    }
}

/// `TypedHeader` carrying the caller's role ("admin" or "employee").
#[derive(Debug)]
struct UserRoleHeader(ActorRole);

impl Header for UserRoleHeader {
    fn name() -> &'static HeaderName {
        &USER_ROLE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = single_str(values)?;
        ActorRole::try_from(value.to_ascii_lowercase().as_str())
            .map(UserRoleHeader)
            .map_err(|_| AxumError::invalid())
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_str(self.0.as_str(), values);
    }
}

/// Resolves the [`Actor`] from the identity headers. A missing role means
/// employee.
async fn actor(
    TypedHeader(UserIdHeader(user_id)): TypedHeader<UserIdHeader>,
    role: Option<TypedHeader<UserRoleHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let role = role.map_or(ActorRole::Employee, |TypedHeader(UserRoleHeader(role))| role);
    tracing::debug!(user_id = %user_id, role = role.as_str(), "request actor");
    request.extensions_mut().insert(Actor { user_id, role });
    Ok(next.run(request).await)
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/targets", post(targets::create))
        .route(
            "/targets/{id}",
            get(targets::get).patch(targets::update).delete(targets::delete),
        )
        .route("/targets/{id}/extend", post(targets::extend))
        .route(
            "/targets/{id}/progress",
            post(progress::submit).get(progress::list),
        )
        .route("/progress/{id}/review", post(progress::review))
        .route("/users/{user_id}/target", get(targets::current))
        .route("/users/{user_id}/targets", get(targets::list))
        .route("/users/{user_id}/balance", get(fund_shares::balance))
        .route("/users/{user_id}/report-progress", post(progress::report))
        .route("/users/{user_id}/fund-shares", get(fund_shares::list))
        .route("/fund-shares", post(fund_shares::share))
        .route("/fund-shares/{id}/reverse", post(fund_shares::reverse))
        .route_layer(middleware::from_fn(actor))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
