use crate::orm::users;
use crate::permission::{self, Policy};
use crate::token::TokenKeys;
use crate::web::error::ApiError;
use actix_web::dev::Payload;
use actix_web::http::{header, Method};
use actix_web::{web::Data, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Client data stored for a single request cycle.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// User data. Optional. None is an anonymous client.
    pub client: Option<users::Model>,
    /// Method of the request, consulted by the access policies.
    pub method: Method,
}

/// Client context passed to routes.
///
/// Resolved from an `Authorization: Bearer <token>` header. A missing header
/// yields an anonymous client; a header that does not resolve to a live user
/// rejects the request with 401.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl ClientCtx {
    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    pub fn get_user(&self) -> Option<&users::Model> {
        self.0.client.as_ref()
    }

    pub fn get_method(&self) -> &Method {
        &self.0.method
    }

    /// Evaluates a collection-level policy for this request.
    pub fn require(&self, policy: Policy) -> Result<(), ApiError> {
        policy
            .check(self.get_method(), self.get_user())
            .map_err(ApiError::from)
    }

    /// Evaluates the author/moderator/admin rule against a loaded object.
    pub fn require_author_or_staff(&self, author_id: i32) -> Result<(), ApiError> {
        permission::check_author_or_staff(self.get_method(), self.get_user(), author_id)
            .map_err(ApiError::from)
    }

    /// Require user to be logged in. Returns the user or Unauthorized.
    pub fn require_login(&self) -> Result<&users::Model, ApiError> {
        self.get_user().ok_or(ApiError::Unauthorized)
    }
}

/// Pulls the token out of an `Authorization` header value.
fn bearer_token(req: &HttpRequest) -> Option<Result<String, ApiError>> {
    let value = req.headers().get(header::AUTHORIZATION)?;
    let parsed = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized);
    Some(parsed)
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Resolved once per request, then shared by every extractor call.
        if let Some(inner) = req.extensions().get::<Data<ClientCtxInner>>() {
            let ctx = Self(inner.clone());
            return Box::pin(async move { Ok(ctx) });
        }

        let req = req.clone();
        Box::pin(async move {
            let method = req.method().clone();

            let client = match bearer_token(&req) {
                None => None,
                Some(token) => {
                    let token = token?;
                    let keys = req.app_data::<Data<TokenKeys>>().ok_or_else(|| {
                        log::error!("TokenKeys missing from app data");
                        ApiError::Internal
                    })?;
                    let db = req.app_data::<Data<DatabaseConnection>>().ok_or_else(|| {
                        log::error!("DatabaseConnection missing from app data");
                        ApiError::Internal
                    })?;

                    let user_id = keys.verify(&token).map_err(|e| {
                        log::debug!("Rejected bearer token: {}", e);
                        ApiError::Unauthorized
                    })?;

                    let user = users::Entity::find_by_id(user_id)
                        .one(db.get_ref())
                        .await?
                        .ok_or_else(|| {
                            log::warn!("Token presented for missing user_id: {}", user_id);
                            ApiError::Unauthorized
                        })?;
                    Some(user)
                }
            };

            let inner = Data::new(ClientCtxInner { client, method });
            req.extensions_mut().insert(inner.clone());
            Ok(Self(inner))
        })
    }
}
