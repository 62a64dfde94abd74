//! crates/access_core/src/route_gate.rs
//!
//! The routing gate. It only looks at the onboarding flag; entitlement is enforced
//! inside the application shell by the subscription prompt, not by eviction.

use crate::domain::{Route, RouteDecision};

/// Path of the onboarding entry point.
pub const ONBOARDING_PATH: &str = "/onboarding";

impl Route {
    /// Classifies a navigation path. Query strings and trailing slashes are ignored.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        if trimmed == ONBOARDING_PATH || trimmed.starts_with("/onboarding/") {
            Route::Onboarding
        } else if trimmed.is_empty() {
            Route::App("/".to_string())
        } else {
            Route::App(trimmed.to_string())
        }
    }
}

/// Decides whether `route` may render for a user whose onboarding state is `onboarded`.
pub fn evaluate(route: &Route, onboarded: bool) -> RouteDecision {
    match route {
        Route::Onboarding => RouteDecision::Render,
        Route::App(_) if onboarded => RouteDecision::Render,
        Route::App(_) => RouteDecision::Redirect {
            to: ONBOARDING_PATH.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_routes_redirect_until_onboarded() {
        for path in ["/", "/records", "/chat/42", "/providers?q=cardio"] {
            let route = Route::from_path(path);
            assert_eq!(
                evaluate(&route, false),
                RouteDecision::Redirect {
                    to: ONBOARDING_PATH.into()
                },
                "{path} should redirect"
            );
            assert_eq!(evaluate(&route, true), RouteDecision::Render);
        }
    }

    #[test]
    fn onboarding_is_always_reachable() {
        assert_eq!(evaluate(&Route::Onboarding, false), RouteDecision::Render);
        assert_eq!(evaluate(&Route::Onboarding, true), RouteDecision::Render);
    }

    #[test]
    fn paths_are_classified() {
        assert_eq!(Route::from_path("/onboarding"), Route::Onboarding);
        assert_eq!(Route::from_path("/onboarding/"), Route::Onboarding);
        assert_eq!(Route::from_path("/onboarding/step-2"), Route::Onboarding);
        assert_eq!(Route::from_path("/onboarding?ref=mail"), Route::Onboarding);
        assert_eq!(
            Route::from_path("/onboardingx"),
            Route::App("/onboardingx".into())
        );
        assert_eq!(Route::from_path(""), Route::App("/".into()));
        assert_eq!(Route::from_path("/records/"), Route::App("/records".into()));
    }
}
