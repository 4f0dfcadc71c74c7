//! Client-side routes and the fixed navigation targets.

/// Screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Profile,
}

/// Where unauthenticated visitors are sent.
pub const UNAUTHENTICATED_ENTRY: Route = Route::Login;

/// Where a successful login or registration lands.
pub const AUTHENTICATED_LANDING: Route = Route::Dashboard;

/// Links shown in the sidebar of protected screens.
pub const SIDEBAR_LINKS: [Route; 2] = [Route::Dashboard, Route::Profile];

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::Profile => "Profile",
        }
    }

    /// Protected routes are only mounted behind a [`crate::guard::RouteGuard`].
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard | Route::Profile)
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/dashboard" | "" => Some(Route::Dashboard),
            "/profile" => Some(Route::Profile),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_routes() {
        assert!(Route::Dashboard.is_protected());
        assert!(Route::Profile.is_protected());
        assert!(!Route::Login.is_protected());
        assert!(!Route::Register.is_protected());
        assert!(!UNAUTHENTICATED_ENTRY.is_protected());
        assert!(AUTHENTICATED_LANDING.is_protected());
    }

    #[test]
    fn test_path_round_trip() {
        for route in [Route::Login, Route::Register, Route::Dashboard, Route::Profile] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/"), Some(Route::Dashboard));
        assert_eq!(Route::from_path("/profile/"), Some(Route::Profile));
        assert_eq!(Route::from_path("/posts"), None);
    }
}
