use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::middleware::CurrentUser;
use crate::models::{Role, User};
use crate::utils::error::AppError;

/// Allow-list of roles for a group of routes.
///
/// Must be layered inside [`require_auth`](crate::auth::require_auth) so the
/// identity is already resolved.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
}

impl RoleGate {
    pub const fn allow(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    pub fn check(&self, user: &User) -> Result<(), AppError> {
        if self.permits(user.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is not allowed to perform this action",
                user.role
            )))
        }
    }
}

pub async fn role_gate(
    State(gate): State<RoleGate>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) => gate.check(user)?,
        None => {
            return Err(AppError::InternalFailure(
                "role gate composed without authentication".to_string(),
            ))
        }
    }
    Ok(next.run(req).await)
}
