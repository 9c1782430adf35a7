use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use secondserve_shared::models::{ClaimStatus, ClaimedListing, ListingClaim};
use secondserve_shared::types::{ListingId, UserId};

use crate::database::{conversion_err, parse_ts, parse_uuid, ts, Database};
use crate::error::Result;
use crate::listings::{listing_columns, row_to_listing_with_owner};

const CLAIM_COLUMNS: &str = "ngo_id, food_listing_id, claimed_at, status";

const CLAIMED_LISTING_SELECT: &str = concat!(
    "SELECT c.ngo_id, c.food_listing_id, c.claimed_at, c.status, ",
    listing_columns!(),
    " FROM food_claims c
      LEFT JOIN food_listings l ON l.id = c.food_listing_id
      LEFT JOIN profiles p ON p.id = l.hotel_id"
);

impl Database {
    pub fn find_claim(&self, ngo: UserId, listing: ListingId) -> Result<Option<ListingClaim>> {
        let claim = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CLAIM_COLUMNS} FROM food_claims
                     WHERE ngo_id = ?1 AND food_listing_id = ?2"
                ),
                params![ngo.to_string(), listing.to_string()],
                row_to_claim,
            )
            .optional()?;
        Ok(claim)
    }

    /// Insert a pending claim. A second claim for the same pair violates the
    /// primary key.
    pub fn insert_claim(&self, ngo: UserId, listing: ListingId) -> Result<ListingClaim> {
        let claim = ListingClaim {
            ngo_id: ngo,
            food_listing_id: listing,
            claimed_at: Utc::now(),
            status: ClaimStatus::Pending,
        };

        self.conn().execute(
            "INSERT INTO food_claims (ngo_id, food_listing_id, claimed_at, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                claim.ngo_id.to_string(),
                claim.food_listing_id.to_string(),
                ts(&claim.claimed_at),
                claim.status.as_str(),
            ],
        )?;

        Ok(claim)
    }

    pub fn delete_claim(&self, ngo: UserId, listing: ListingId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM food_claims WHERE ngo_id = ?1 AND food_listing_id = ?2",
            params![ngo.to_string(), listing.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Claims by `ngo` with the listing joined in, most recent first.
    pub fn claims_for_ngo(&self, ngo: UserId) -> Result<Vec<ClaimedListing>> {
        let mut stmt = self.conn().prepare(&format!(
            "{CLAIMED_LISTING_SELECT} WHERE c.ngo_id = ?1 ORDER BY c.claimed_at DESC, c.rowid DESC"
        ))?;

        let rows = stmt.query_map(params![ngo.to_string()], |row| {
            let claim = row_to_claim(row)?;
            let listing_id: Option<String> = row.get(4)?;
            let listing = match listing_id {
                Some(_) => Some(row_to_listing_with_owner(row, 4)?),
                None => None,
            };
            Ok(ClaimedListing { claim, listing })
        })?;

        let mut claims = Vec::new();
        for row in rows {
            claims.push(row?);
        }
        Ok(claims)
    }
}

fn row_to_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingClaim> {
    let ngo_str: String = row.get(0)?;
    let listing_str: String = row.get(1)?;
    let claimed_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;

    Ok(ListingClaim {
        ngo_id: UserId(parse_uuid(0, &ngo_str)?),
        food_listing_id: ListingId(parse_uuid(1, &listing_str)?),
        claimed_at: parse_ts(2, &claimed_str)?,
        status: status_str.parse().map_err(|e| conversion_err(3, e))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::tests::{hotel, new_listing};
    use chrono::Duration;
    use secondserve_shared::models::{NewProfile, Role};

    fn ngo(db: &Database) -> UserId {
        let id = UserId::new();
        db.insert_profile(&NewProfile {
            id,
            name: "Roti Bank".into(),
            role: Role::Ngo,
            phone: None,
        })
        .unwrap();
        id
    }

    #[test]
    fn claim_is_unique_per_pair() {
        let db = Database::open_in_memory().unwrap();
        let h = hotel(&db);
        let n = ngo(&db);
        let l = db
            .insert_listing(&new_listing(h, "Dal", Utc::now() + Duration::hours(3)))
            .unwrap();

        assert!(db.find_claim(n, l.id).unwrap().is_none());
        db.insert_claim(n, l.id).unwrap();
        assert_eq!(
            db.find_claim(n, l.id).unwrap().map(|c| c.status),
            Some(ClaimStatus::Pending)
        );
        assert!(db.insert_claim(n, l.id).is_err());

        assert!(db.delete_claim(n, l.id).unwrap());
        assert!(!db.delete_claim(n, l.id).unwrap());
    }

    #[test]
    fn claims_join_listing_and_follow_deletes() {
        let db = Database::open_in_memory().unwrap();
        let h = hotel(&db);
        let n = ngo(&db);
        let dal = db
            .insert_listing(&new_listing(h, "Dal", Utc::now() + Duration::hours(3)))
            .unwrap();
        let rice = db
            .insert_listing(&new_listing(h, "Rice", Utc::now() + Duration::hours(3)))
            .unwrap();
        db.insert_claim(n, dal.id).unwrap();
        db.insert_claim(n, rice.id).unwrap();

        let claims = db.claims_for_ngo(n).unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].claim.food_listing_id, rice.id);
        let joined = claims[0].listing.as_ref().unwrap();
        assert_eq!(joined.listing.title, "Rice");
        assert_eq!(joined.owner_name(), Some("Hotel Blue"));

        db.delete_listing(dal.id).unwrap();
        let claims = db.claims_for_ngo(n).unwrap();
        assert_eq!(claims.len(), 1);
    }
}
