use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// `axum::Json` whose rejections render as a 400 [`AppError`] envelope.
///
/// Plain `Json` answers type mismatches with 422 and a text body; APIs built on
/// these helpers treat every unreadable body as a bad request.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(data))
    }
}

/// [`JsonBody`] followed by `validator` checks.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct RenameProduct {
///     #[validate(length(min = 1, max = 200))]
///     name: String,
/// }
///
/// async fn rename(ValidatedJson(body): ValidatedJson<RenameProduct>) -> String {
///     body.name
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(data) = JsonBody::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}
