use tracing::{info, warn};

use secondserve_shared::models::{Session, SignUpOutcome};

use crate::error::{Action, ClientError, ClientResult, ValidationError};
use crate::state::App;

fn credentials<'a>(email: &'a str, password: &'a str) -> ClientResult<(&'a str, &'a str)> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ClientError::from(ValidationError::MissingCredentials));
    }
    Ok((email, password))
}

pub async fn sign_in(app: &App, email: &str, password: &str) -> ClientResult<Session> {
    let (email, password) = credentials(email, password)?;
    let session = app
        .auth
        .sign_in(email, password)
        .await
        .map_err(ClientError::remote(Action::SignIn))?;

    info!(user = %session.user_id(), "Signed in");
    Ok(session)
}

/// Create an account. When the project requires email confirmation the
/// outcome carries no session and the user has to verify first.
pub async fn sign_up(app: &App, email: &str, password: &str) -> ClientResult<SignUpOutcome> {
    let (email, password) = credentials(email, password)?;
    let outcome = app
        .auth
        .sign_up(email, password)
        .await
        .map_err(ClientError::remote(Action::SignUp))?;

    if outcome.session.is_none() {
        info!(user = %outcome.user.id, "Account created, awaiting email verification");
    } else {
        info!(user = %outcome.user.id, "Account created");
    }
    Ok(outcome)
}

pub async fn sign_out(app: &App) -> ClientResult<()> {
    app.auth.sign_out().await.map_err(|e| {
        warn!(error = %e, "Sign out failed");
        ClientError::remote(Action::SignOut)(e)
    })?;
    info!("Signed out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use secondserve_shared::backend::AuthProvider;

    #[tokio::test]
    async fn blank_credentials_never_reach_auth() {
        let t = TestApp::new();
        let err = sign_in(&t.app, "  ", "secret").await.unwrap_err();
        assert_eq!(err, ClientError::from(ValidationError::MissingCredentials));
        assert_eq!(err.alert().title, "Missing Fields");

        let err = sign_up(&t.app, "ngo@example.org", "").await.unwrap_err();
        assert_eq!(err, ClientError::from(ValidationError::MissingCredentials));
        assert!(t.auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_login_shows_collaborator_message() {
        let t = TestApp::new();
        let err = sign_in(&t.app, "ngo@example.org", "wrong").await.unwrap_err();
        assert_eq!(err.alert().body, "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_in_then_out() {
        let t = TestApp::new();
        let session = sign_in(&t.app, "ngo@example.org", "secret").await.unwrap();
        assert_eq!(
            t.app.user_id(Action::LoadProfile).await.unwrap(),
            session.user_id()
        );

        sign_out(&t.app).await.unwrap();
        assert!(t.auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_up_without_session_needs_verification() {
        let t = TestApp::new();
        let outcome = sign_up(&t.app, "hotel@example.org", "secret").await.unwrap();
        assert!(outcome.session.is_none());
        assert_eq!(outcome.user.email.as_deref(), Some("hotel@example.org"));
    }
}
