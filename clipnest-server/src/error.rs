use clipnest_api::{Error as ApiError, Uuid};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn forbidden() -> Error {
        Error::Api(ApiError::Forbidden)
    }

    pub fn unauthorized() -> Error {
        Error::Api(ApiError::Unauthorized)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Error {
        Error::Api(ApiError::invalid_input(msg))
    }

    pub fn invalid_reference(kind: &str, id: Uuid) -> Error {
        Error::Api(ApiError::invalid_reference(kind, id))
    }

    pub fn not_found(kind: &str) -> Error {
        Error::Api(ApiError::not_found(kind))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        };
        (err.status_code(), err.contents()).into_response()
    }
}
