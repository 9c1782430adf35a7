//! PostgREST-backed [`DataStore`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use secondserve_shared::backend::{BackendResult, DataStore};
use secondserve_shared::models::{
    ClaimStatus, ClaimedListing, FoodListing, ListingClaim, ListingQuery, ListingWithOwner,
    Message, MessageWithContext, NearbyNgo, NewListing, NewMessage, NewProfile, Profile,
    ProfilePatch,
};
use secondserve_shared::types::{Coordinates, ListingId, UserId};
use secondserve_shared::BackendError;

use super::{json, Project};

const LISTING_WITH_OWNER: &str = "*,hotel:profiles(name,phone)";
const CLAIM_WITH_LISTING: &str = "*,listing:food_listings(*,hotel:profiles(name,phone))";
const MESSAGE_WITH_CONTEXT: &str = "*,sender:profiles!sender_id(name),receiver:profiles!receiver_id(name),listing:food_listings(title)";

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn first<T>(rows: Vec<T>, table: &str) -> BackendResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::Decode(format!("{table}: empty representation")))
}

pub struct RestStore {
    project: Project,
}

impl RestStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    fn table(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.project.request(method, &format!("/rest/v1/{table}"))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Vec<T>> {
        let resp = self
            .table(Method::GET, table)
            .query(query)
            .send()
            .await
            .map_err(super::transport)?;
        json(resp).await
    }

    async fn insert<B, T>(&self, table: &str, body: &B) -> BackendResult<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let resp = self
            .table(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(super::transport)?;
        first(json(resp).await?, table)
    }

    /// PATCH or DELETE returning the affected rows.
    async fn mutate(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> BackendResult<Vec<serde_json::Value>> {
        let mut req = self
            .table(method, table)
            .header("Prefer", "return=representation")
            .query(query);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(super::transport)?;
        json(resp).await
    }
}

#[async_trait]
impl DataStore for RestStore {
    async fn profile(&self, id: UserId) -> BackendResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .select("profiles", &[("select", "*".into()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile> {
        self.insert("profiles", profile).await
    }

    async fn update_profile(&self, id: UserId, patch: &ProfilePatch) -> BackendResult<()> {
        let body = serde_json::to_value(patch).map_err(super::decode)?;
        let rows = self
            .mutate(Method::PATCH, "profiles", &[("id", eq(id))], Some(body))
            .await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn insert_listing(&self, listing: &NewListing) -> BackendResult<FoodListing> {
        self.insert("food_listings", listing).await
    }

    async fn listing(&self, id: ListingId) -> BackendResult<Option<ListingWithOwner>> {
        let rows: Vec<ListingWithOwner> = self
            .select(
                "food_listings",
                &[("select", LISTING_WITH_OWNER.into()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_listing(&self, id: ListingId) -> BackendResult<bool> {
        let rows = self
            .mutate(Method::DELETE, "food_listings", &[("id", eq(id))], None)
            .await?;
        Ok(!rows.is_empty())
    }

    async fn listings_for_hotel(&self, hotel: UserId) -> BackendResult<Vec<FoodListing>> {
        self.select(
            "food_listings",
            &[
                ("select", "*".into()),
                ("hotel_id", eq(hotel)),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn available_listings(
        &self,
        query: &ListingQuery,
    ) -> BackendResult<Vec<ListingWithOwner>> {
        let mut params: Vec<(&str, String)> = vec![
            ("select", LISTING_WITH_OWNER.into()),
            ("status", "eq.available".into()),
        ];
        if let Some(now) = query.active_at {
            params.push(("expiry_time", format!("gt.{}", ts(&now))));
        }
        if query.require_coordinates {
            params.push(("latitude", "not.is.null".into()));
            params.push(("longitude", "not.is.null".into()));
        }
        params.push(("order", "created_at.desc".into()));
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        self.select("food_listings", &params).await
    }

    async fn find_claim(
        &self,
        ngo: UserId,
        listing: ListingId,
    ) -> BackendResult<Option<ListingClaim>> {
        let rows: Vec<ListingClaim> = self
            .select(
                "food_claims",
                &[
                    ("select", "*".into()),
                    ("ngo_id", eq(ngo)),
                    ("food_listing_id", eq(listing)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<ListingClaim> {
        let body = json!({
            "ngo_id": ngo,
            "food_listing_id": listing,
            "status": ClaimStatus::Pending,
        });
        self.insert("food_claims", &body).await
    }

    async fn delete_claim(&self, ngo: UserId, listing: ListingId) -> BackendResult<bool> {
        let rows = self
            .mutate(
                Method::DELETE,
                "food_claims",
                &[("ngo_id", eq(ngo)), ("food_listing_id", eq(listing))],
                None,
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn claims_for_ngo(&self, ngo: UserId) -> BackendResult<Vec<ClaimedListing>> {
        self.select(
            "food_claims",
            &[
                ("select", CLAIM_WITH_LISTING.into()),
                ("ngo_id", eq(ngo)),
                ("order", "claimed_at.desc".into()),
            ],
        )
        .await
    }

    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message> {
        self.insert("messages", message).await
    }

    async fn messages_for_user(&self, user: UserId) -> BackendResult<Vec<MessageWithContext>> {
        self.select(
            "messages",
            &[
                ("select", MESSAGE_WITH_CONTEXT.into()),
                ("or", format!("(sender_id.eq.{user},receiver_id.eq.{user})")),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    async fn thread(
        &self,
        user: UserId,
        other: UserId,
        listing: ListingId,
    ) -> BackendResult<Vec<Message>> {
        self.select(
            "messages",
            &[
                ("select", "*".into()),
                ("listing_id", eq(listing)),
                (
                    "or",
                    format!(
                        "(and(sender_id.eq.{user},receiver_id.eq.{other}),and(sender_id.eq.{other},receiver_id.eq.{user}))"
                    ),
                ),
                ("order", "created_at.asc".into()),
            ],
        )
        .await
    }

    async fn mark_read(
        &self,
        receiver: UserId,
        sender: UserId,
        listing: ListingId,
    ) -> BackendResult<usize> {
        let rows = self
            .mutate(
                Method::PATCH,
                "messages",
                &[
                    ("receiver_id", eq(receiver)),
                    ("sender_id", eq(sender)),
                    ("listing_id", eq(listing)),
                    ("is_read", "eq.false".into()),
                ],
                Some(json!({ "is_read": true })),
            )
            .await?;
        Ok(rows.len())
    }

    async fn nearby_ngos(&self, at: Coordinates) -> BackendResult<Vec<NearbyNgo>> {
        let resp = self
            .project
            .request(Method::POST, "/rest/v1/rpc/get_nearby_ngos")
            .json(&json!({
                "listing_lat": at.latitude,
                "listing_lon": at.longitude,
            }))
            .send()
            .await
            .map_err(super::transport)?;
        let rows: Vec<NearbyNgo> = json(resp).await?;
        debug!(count = rows.len(), "get_nearby_ngos returned");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_support::project;
    use secondserve_shared::models::{AuthUser, Role, Session};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(user: UserId) -> Session {
        Session {
            user: AuthUser { id: user, email: None },
            access_token: "user-jwt".into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn profile_lookup_sends_keys_and_filter() {
        let server = MockServer::start().await;
        let id = UserId::new();

        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{id}")))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": id,
                "name": "Hotel Blue",
                "role": "hotel",
                "phone": "+91 98765 43210"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), Some(session(id)));
        let store = RestStore::new(project);

        let profile = store.profile(id).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::Hotel);
        assert_eq!(profile.radius_km(), 15);
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        assert!(store.profile(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn browse_query_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/food_listings"))
            .and(query_param("status", "eq.available"))
            .and(query_param("latitude", "not.is.null"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("select", LISTING_WITH_OWNER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        let rows = store
            .available_listings(&ListingQuery::map(Utc::now()))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn rpc_posts_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_nearby_ngos"))
            .and(body_json(json!({ "listing_lat": 30.5, "listing_lon": 76.25 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": UserId::new(), "push_token": "ExponentPushToken[a]", "distance": 2.5 },
                { "push_token": null, "distance": 4.0 }
            ])))
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        let rows = store.nearby_ngos(Coordinates::new(30.5, 76.25)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].push_token.is_none());
    }

    #[tokio::test]
    async fn api_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/food_claims"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            })))
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        let err = store
            .insert_claim(UserId::new(), ListingId::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::api(409, "duplicate key value violates unique constraint")
        );
    }

    #[tokio::test]
    async fn update_without_rows_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(body_json(json!({ "notification_radius_km": 20 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        let err = store
            .update_profile(
                UserId::new(),
                &ProfilePatch {
                    notification_radius_km: Some(20),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound);
    }

    #[tokio::test]
    async fn conversations_fold_fetched_history() {
        let server = MockServer::start().await;
        let me = UserId::new();
        let hotel = UserId::new();
        let listing = ListingId::new();

        Mock::given(method("GET"))
            .and(path("/rest/v1/messages"))
            .and(query_param("or", format!("(sender_id.eq.{me},receiver_id.eq.{me})")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": uuid::Uuid::new_v4(),
                    "sender_id": hotel,
                    "receiver_id": me,
                    "listing_id": listing,
                    "content": "Come by at 6",
                    "created_at": "2025-01-01T10:00:00Z",
                    "is_read": false,
                    "sender": { "name": "Hotel Blue" },
                    "receiver": { "name": "Roti Bank" },
                    "listing": null
                },
                {
                    "id": uuid::Uuid::new_v4(),
                    "sender_id": me,
                    "receiver_id": hotel,
                    "listing_id": listing,
                    "content": "Is it available?",
                    "created_at": "2025-01-01T09:00:00Z",
                    "is_read": true,
                    "sender": { "name": "Roti Bank" },
                    "receiver": { "name": "Hotel Blue" },
                    "listing": null
                }
            ])))
            .mount(&server)
            .await;

        let (project, _tx) = project(&server.uri(), None);
        let store = RestStore::new(project);
        let convs = store.conversations(me).await.unwrap();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].other_user_name, "Hotel Blue");
        assert_eq!(convs[0].listing_title, "Unknown Food Listing");
        assert_eq!(convs[0].unread_count, 1);
    }
}
