//! Which screen a launch or auth change lands on.

use serde::Serialize;
use tracing::debug;

use secondserve_shared::models::{Profile, Role, Session};

use crate::error::{Action, ClientError, ClientResult};
use crate::state::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    CompleteProfile,
    Hotel,
    Ngo,
}

pub fn route_for(session: Option<&Session>, profile: Option<&Profile>) -> Route {
    match (session, profile) {
        (None, _) => Route::Login,
        (Some(_), None) => Route::CompleteProfile,
        (Some(_), Some(p)) => match p.role {
            Role::Hotel => Route::Hotel,
            Role::Ngo => Route::Ngo,
        },
    }
}

/// Look up the current session and profile and pick the route.
pub async fn resolve_route(app: &App) -> ClientResult<Route> {
    let session = app
        .auth
        .current_session()
        .await
        .map_err(ClientError::remote(Action::LoadProfile))?;

    let profile = match &session {
        Some(s) => app
            .store
            .profile(s.user_id())
            .await
            .map_err(ClientError::remote(Action::LoadProfile))?,
        None => None,
    };

    let route = route_for(session.as_ref(), profile.as_ref());
    debug!(?route, "Route resolved");
    Ok(route)
}
