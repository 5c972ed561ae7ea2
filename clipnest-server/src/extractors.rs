use std::ops::{Deref, DerefMut};

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use clipnest_api::{AuthToken, UserId, Uuid};

use crate::{db, Error};

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: PgPool,
}

#[derive(Clone)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    pub fn new(pool: sqlx::PgPool) -> PgPool {
        PgPool(pool)
    }

    pub async fn acquire(&self) -> Result<PgConn, Error> {
        Ok(PgConn(
            self.0.acquire().await.context("acquiring db connection")?,
        ))
    }
}

pub struct PgConn(sqlx::pool::PoolConnection<sqlx::Postgres>);

#[async_trait]
impl FromRequestParts<AppState> for PgConn {
    type Rejection = Error;

    async fn from_request_parts(
        _req: &mut request::Parts,
        state: &AppState,
    ) -> Result<PgConn, Error> {
        state.db.acquire().await
    }
}

impl Deref for PgConn {
    type Target = sqlx::PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A syntactically valid bearer token, not yet resolved to a user.
pub struct PreAuth(pub AuthToken);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for PreAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<PreAuth, Error> {
        match req.headers.get(http::header::AUTHORIZATION) {
            None => Err(Error::unauthorized()),
            Some(auth) => {
                let auth = auth.to_str().map_err(|_| Error::unauthorized())?;
                let mut auth = auth.split(' ');
                if !auth
                    .next()
                    .ok_or(Error::unauthorized())?
                    .eq_ignore_ascii_case("bearer")
                {
                    return Err(Error::unauthorized());
                }
                let token = auth.next().ok_or(Error::unauthorized())?;
                if !auth.next().is_none() {
                    return Err(Error::unauthorized());
                }
                let token = Uuid::try_from(token).map_err(|_| Error::unauthorized())?;
                Ok(PreAuth(AuthToken(token)))
            }
        }
    }
}

/// The verified caller identity, required on every mutating endpoint.
pub struct Auth(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &AppState) -> Result<Auth, Error> {
        let token = PreAuth::from_request_parts(req, state).await?.0;
        let mut conn = PgConn::from_request_parts(req, state).await?;
        Ok(Auth(db::recover_session(&mut *conn, token).await?))
    }
}

/// Optional caller identity for read endpoints: absent credential is
/// an anonymous viewer, a present-but-invalid one is still rejected.
pub struct MaybeAuth(pub Option<UserId>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<MaybeAuth, Error> {
        if req.headers.get(http::header::AUTHORIZATION).is_none() {
            return Ok(MaybeAuth(None));
        }
        let Auth(user) = Auth::from_request_parts(req, state).await?;
        Ok(MaybeAuth(Some(user)))
    }
}
