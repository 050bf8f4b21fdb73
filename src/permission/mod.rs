//! Role based access policies.
//!
//! Every handler evaluates one collection-level [`Policy`] before touching the
//! database, and [`check_author_or_staff`] once the target object is loaded.


use crate::orm::users;
use actix_web::http::Method;

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    /// No valid credentials were presented.
    Unauthenticated,
    /// Credentials are fine but the role or ownership is insufficient.
    Forbidden,
}

pub type Access = Result<(), Denial>;

/// Collection-level policies, composed per endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Anyone may read; writing requires an account.
    ReadPublicWriteAuthenticated,
    /// Anyone may read; writing requires the admin role.
    ReadPublicWriteAdmin,
    /// Every method requires the admin role or the superuser flag.
    AdminOnly,
    /// Authenticated users acting on their own profile.
    SelfServiceOnly,
}

/// GET, HEAD and OPTIONS never mutate state.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Full administrative rights: admin role or the superuser escape hatch.
pub fn has_admin_rights(user: &users::Model) -> bool {
    user.is_admin() || user.is_superuser
}

fn authenticated(requester: Option<&users::Model>) -> Result<&users::Model, Denial> {
    requester.ok_or(Denial::Unauthenticated)
}

impl Policy {
    pub fn check(&self, method: &Method, requester: Option<&users::Model>) -> Access {
        match self {
            Policy::ReadPublicWriteAuthenticated => {
                if is_safe_method(method) {
                    return Ok(());
                }
                authenticated(requester).map(|_| ())
            }
            Policy::ReadPublicWriteAdmin => {
                if is_safe_method(method) {
                    return Ok(());
                }
                if authenticated(requester)?.is_admin() {
                    Ok(())
                } else {
                    Err(Denial::Forbidden)
                }
            }
            Policy::AdminOnly => {
                if has_admin_rights(authenticated(requester)?) {
                    Ok(())
                } else {
                    Err(Denial::Forbidden)
                }
            }
            Policy::SelfServiceOnly => {
                authenticated(requester)?;
                if is_safe_method(method) || *method == Method::PATCH || *method == Method::DELETE
                {
                    Ok(())
                } else {
                    Err(Denial::Forbidden)
                }
            }
        }
    }
}

/// Object-level check for reviews and comments. Safe methods always pass;
/// otherwise the requester must be the author, a moderator or an admin.
pub fn check_author_or_staff(
    method: &Method,
    requester: Option<&users::Model>,
    author_id: i32,
) -> Access {
    if is_safe_method(method) {
        return Ok(());
    }

    let user = authenticated(requester)?;
    if user.id == author_id || user.is_moderator() || user.is_admin() {
        Ok(())
    } else {
        Err(Denial::Forbidden)
    }
}
