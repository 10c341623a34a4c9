//! Route-level access guard.

use crate::domain::aggregates::Role;

pub const LOGIN_ROUTE: &str = "/login";
pub const PRODUCTS_ROUTE: &str = "/products";
pub const ADMIN_PRODUCTS_ROUTE: &str = "/admin-products";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(&'static str),
}

/// Where a role lands after signing in or being turned away.
pub fn landing(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_PRODUCTS_ROUTE,
        Role::User => PRODUCTS_ROUTE,
    }
}

/// `required = None` admits any signed-in role.
pub fn guard(role: Option<Role>, required: Option<Role>) -> Access {
    match (role, required) {
        (None, _) => Access::Redirect(LOGIN_ROUTE),
        (Some(role), Some(required)) if role != required => Access::Redirect(landing(role)),
        _ => Access::Granted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard() {
        assert_eq!(guard(None, Some(Role::Admin)), Access::Redirect(LOGIN_ROUTE));
        assert_eq!(guard(None, None), Access::Redirect(LOGIN_ROUTE));
        assert_eq!(guard(Some(Role::User), Some(Role::Admin)), Access::Redirect("/products"));
        assert_eq!(guard(Some(Role::Admin), Some(Role::User)), Access::Redirect("/admin-products"));
        assert_eq!(guard(Some(Role::Admin), Some(Role::Admin)), Access::Granted);
        assert_eq!(guard(Some(Role::User), None), Access::Granted);
    }
}
