//! Object-level permissions.
//!
//! Read-only methods are open to everyone. Writes are allowed only to the
//! profile that owns the object.

use crate::auth::AuthUser;
use crate::feed::FeedItem;
use crate::profile::UserProfile;
use crate::routes::{error_response, ApiError};
use axum::http::{Method, StatusCode};

/// Decides whether a user may apply `method` to an object.
pub trait ObjectPermission<T> {
    fn has_object_permission(method: &Method, user: Option<&AuthUser>, obj: &T) -> bool;
}

/// A profile may only be changed by itself.
pub struct UpdateOwnProfile;

impl ObjectPermission<UserProfile> for UpdateOwnProfile {
    fn has_object_permission(method: &Method, user: Option<&AuthUser>, obj: &UserProfile) -> bool {
        is_safe_method(method) || user.is_some_and(|u| u.profile_id == obj.id)
    }
}

/// A status may only be changed by its author.
pub struct UpdateOwnStatus;

impl ObjectPermission<FeedItem> for UpdateOwnStatus {
    fn has_object_permission(method: &Method, user: Option<&AuthUser>, obj: &FeedItem) -> bool {
        is_safe_method(method) || user.is_some_and(|u| u.profile_id == obj.user_profile)
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Enforce `P` for an object.
///
/// Anonymous callers get 401 so they know to authenticate; authenticated
/// callers without permission get 403.
pub fn check_object_permission<P, T>(
    method: &Method,
    user: Option<&AuthUser>,
    obj: &T,
) -> Result<(), ApiError>
where
    P: ObjectPermission<T>,
{
    if P::has_object_permission(method, user, obj) {
        return Ok(());
    }

    Err(match user {
        None => error_response(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided",
            "AUTH_REQUIRED",
        ),
        Some(u) => {
            tracing::warn!(profile_id = u.profile_id, method = %method, "Object permission denied");
            error_response(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action",
                "FORBIDDEN",
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(id: i64) -> UserProfile {
        UserProfile {
            id,
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
        }
    }

    fn status(author: i64) -> FeedItem {
        FeedItem {
            id: 7,
            user_profile: author,
            status_text: "hello".into(),
            created_on: Utc::now(),
        }
    }

    #[test]
    fn test_safe_methods_always_allowed() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(UpdateOwnProfile::has_object_permission(&method, None, &profile(1)));
            assert!(UpdateOwnStatus::has_object_permission(&method, None, &status(1)));
        }
    }

    #[test]
    fn test_owner_may_write() {
        let owner = AuthUser { profile_id: 1 };
        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(UpdateOwnProfile::has_object_permission(&method, Some(&owner), &profile(1)));
            assert!(UpdateOwnStatus::has_object_permission(&method, Some(&owner), &status(1)));
        }
    }

    #[test]
    fn test_others_may_not_write() {
        let other = AuthUser { profile_id: 2 };
        assert!(!UpdateOwnProfile::has_object_permission(&Method::PUT, Some(&other), &profile(1)));
        assert!(!UpdateOwnStatus::has_object_permission(&Method::DELETE, Some(&other), &status(1)));
        assert!(!UpdateOwnProfile::has_object_permission(&Method::PATCH, None, &profile(1)));
    }

    #[test]
    fn test_check_object_permission_status_codes() {
        let err = check_object_permission::<UpdateOwnProfile, _>(&Method::PUT, None, &profile(1))
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);

        let other = AuthUser { profile_id: 2 };
        let err = check_object_permission::<UpdateOwnStatus, _>(
            &Method::DELETE,
            Some(&other),
            &status(1),
        )
        .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
        assert_eq!(err.1.code, "FORBIDDEN");

        assert!(check_object_permission::<UpdateOwnStatus, _>(
            &Method::GET,
            Some(&other),
            &status(1)
        )
        .is_ok());
    }
}
