use serde::Serialize;
use tracing::{info, warn};

use secondserve_shared::constants::{
    MAX_NOTIFICATION_RADIUS_KM, MIN_NOTIFICATION_RADIUS_KM, NOTIFICATION_RADIUS_STEP_KM,
};
use secondserve_shared::models::{Profile, ProfilePatch};

use crate::error::{Action, ClientError, ClientResult, ValidationError};
use crate::state::App;

/// What the settings screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSettings {
    /// Enabled while a push token is stored.
    pub enabled: bool,
    pub radius_km: u32,
    pub has_location: bool,
    pub address: Option<String>,
}

impl NotificationSettings {
    fn from_profile(profile: &Profile, default_radius_km: u32) -> Self {
        Self {
            enabled: profile.notifications_enabled(),
            radius_km: profile.notification_radius_km.unwrap_or(default_radius_km),
            has_location: profile.coordinates().is_some(),
            address: profile.address.clone(),
        }
    }
}

pub fn validate_radius(radius_km: u32) -> Result<u32, ValidationError> {
    let in_range = (MIN_NOTIFICATION_RADIUS_KM..=MAX_NOTIFICATION_RADIUS_KM).contains(&radius_km);
    if !in_range || radius_km % NOTIFICATION_RADIUS_STEP_KM != 0 {
        return Err(ValidationError::InvalidRadius);
    }
    Ok(radius_km)
}

pub async fn load_settings(app: &App) -> ClientResult<NotificationSettings> {
    let profile = app.profile(Action::LoadProfile).await?;
    Ok(NotificationSettings::from_profile(
        &profile,
        app.config.default_radius_km,
    ))
}

/// Persist the radius and, when enabled, a freshly issued push token.
/// Disabling clears the stored token.
pub async fn save_notification_settings(
    app: &App,
    enabled: bool,
    radius_km: u32,
) -> ClientResult<NotificationSettings> {
    let radius_km = validate_radius(radius_km)?;
    let mut profile = app.profile(Action::SaveSettings).await?;

    if enabled && profile.coordinates().is_none() {
        return Err(ClientError::LocationRequired);
    }

    let token = if enabled {
        match app.push_tokens.fresh_token().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                warn!(user = %profile.id, "Could not generate push token");
                None
            }
            Err(e) => {
                warn!(user = %profile.id, error = %e, "Push token request failed");
                None
            }
        }
    } else {
        None
    };

    app.store
        .update_profile(
            profile.id,
            &ProfilePatch {
                notification_radius_km: Some(radius_km),
                push_token: Some(token.clone()),
                ..ProfilePatch::default()
            },
        )
        .await
        .map_err(ClientError::remote(Action::SaveSettings))?;

    info!(user = %profile.id, enabled, radius_km, has_token = token.is_some(), "Notification settings saved");

    profile.notification_radius_km = Some(radius_km);
    profile.push_token = token;
    Ok(NotificationSettings::from_profile(
        &profile,
        app.config.default_radius_km,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;
    use secondserve_shared::backend::DataStore;
    use secondserve_shared::models::Role;
    use secondserve_shared::types::Coordinates;
    use std::sync::atomic::Ordering;

    #[test]
    fn radius_bounds_and_step() {
        assert_eq!(validate_radius(5), Ok(5));
        assert_eq!(validate_radius(50), Ok(50));
        assert_eq!(validate_radius(0), Err(ValidationError::InvalidRadius));
        assert_eq!(validate_radius(55), Err(ValidationError::InvalidRadius));
        assert_eq!(validate_radius(12), Err(ValidationError::InvalidRadius));
    }

    #[tokio::test]
    async fn enabling_without_location_requests_no_token() {
        let t = TestApp::new();
        let ngo = t.sign_in_as(Role::Ngo, "Roti Bank").await;
        *t.tokens.token.lock().unwrap() = Some("ExponentPushToken[x]".into());

        let err = save_notification_settings(&t.app, true, 15).await.unwrap_err();
        assert_eq!(err, ClientError::LocationRequired);
        assert_eq!(err.alert().title, "Location Required");
        assert_eq!(t.tokens.calls.load(Ordering::SeqCst), 0);

        let stored = t.store.profile(ngo.id).await.unwrap().unwrap();
        assert_eq!(stored.push_token, None);
        assert_eq!(stored.notification_radius_km, None);
    }

    #[tokio::test]
    async fn enabling_stores_fresh_token_and_radius() {
        let t = TestApp::new();
        let ngo = t.sign_in_as(Role::Ngo, "Roti Bank").await;
        t.make_reachable(ngo.id, Coordinates::new(30.33, 76.40), "old-token", 15).await;
        *t.tokens.token.lock().unwrap() = Some("ExponentPushToken[new]".into());

        let saved = save_notification_settings(&t.app, true, 25).await.unwrap();
        assert!(saved.enabled);
        assert_eq!(saved.radius_km, 25);

        let stored = t.store.profile(ngo.id).await.unwrap().unwrap();
        assert_eq!(stored.push_token.as_deref(), Some("ExponentPushToken[new]"));
        assert_eq!(stored.notification_radius_km, Some(25));
    }

    #[tokio::test]
    async fn simulator_without_token_saves_disabled() {
        let t = TestApp::new();
        let ngo = t.sign_in_as(Role::Ngo, "Roti Bank").await;
        t.make_reachable(ngo.id, Coordinates::new(30.33, 76.40), "old-token", 15).await;

        let saved = save_notification_settings(&t.app, true, 10).await.unwrap();
        assert!(!saved.enabled);
        assert_eq!(t.tokens.calls.load(Ordering::SeqCst), 1);
        let stored = t.store.profile(ngo.id).await.unwrap().unwrap();
        assert_eq!(stored.push_token, None);
    }

    #[tokio::test]
    async fn disabling_clears_token() {
        let t = TestApp::new();
        let ngo = t.sign_in_as(Role::Ngo, "Roti Bank").await;
        t.make_reachable(ngo.id, Coordinates::new(30.33, 76.40), "old-token", 15).await;

        let saved = save_notification_settings(&t.app, false, 30).await.unwrap();
        assert!(!saved.enabled);
        assert_eq!(t.tokens.calls.load(Ordering::SeqCst), 0);
        assert_eq!(load_settings(&t.app).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn defaults_for_fresh_profile() {
        let t = TestApp::new();
        t.sign_in_as(Role::Ngo, "Roti Bank").await;

        let settings = load_settings(&t.app).await.unwrap();
        assert_eq!(
            settings,
            NotificationSettings {
                enabled: false,
                radius_km: 15,
                has_location: false,
                address: None,
            }
        );
    }
}
