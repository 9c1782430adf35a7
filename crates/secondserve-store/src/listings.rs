use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use secondserve_shared::models::{
    FoodListing, FoodType, ListingQuery, ListingStatus, ListingWithOwner, NewListing, OwnerContact,
};
use secondserve_shared::types::{ListingId, UserId};

use crate::database::{conversion_err, not_found, parse_ts, parse_uuid, ts, Database};
use crate::error::Result;

macro_rules! listing_columns {
    () => {
        "l.id, l.hotel_id, l.title, l.description, l.quantity_kg, l.food_type, l.expiry_time,
         l.address, l.latitude, l.longitude, l.status, l.images, l.created_at, p.name, p.phone"
    };
}
pub(crate) use listing_columns;

const LISTING_SELECT: &str = concat!(
    "SELECT ",
    listing_columns!(),
    " FROM food_listings l LEFT JOIN profiles p ON p.id = l.hotel_id"
);

impl Database {
    pub fn insert_listing(&self, listing: &NewListing) -> Result<FoodListing> {
        let id = ListingId::new();
        let created_at = Utc::now();
        let images = serde_json::to_string(&listing.images)?;

        self.conn().execute(
            "INSERT INTO food_listings (id, hotel_id, title, description, quantity_kg, food_type,
                                        expiry_time, address, latitude, longitude, status, images, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id.to_string(),
                listing.hotel_id.to_string(),
                listing.title,
                listing.description,
                listing.quantity_kg,
                listing.food_type.as_str(),
                ts(&listing.expiry_time),
                listing.address,
                listing.latitude,
                listing.longitude,
                listing.status.as_str(),
                images,
                ts(&created_at),
            ],
        )?;

        Ok(self.get_listing(id)?.listing)
    }

    pub fn get_listing(&self, id: ListingId) -> Result<ListingWithOwner> {
        self.conn()
            .query_row(
                &format!("{LISTING_SELECT} WHERE l.id = ?1"),
                params![id.to_string()],
                |row| row_to_listing_with_owner(row, 0),
            )
            .map_err(not_found)
    }

    pub fn find_listing(&self, id: ListingId) -> Result<Option<ListingWithOwner>> {
        let listing = self
            .conn()
            .query_row(
                &format!("{LISTING_SELECT} WHERE l.id = ?1"),
                params![id.to_string()],
                |row| row_to_listing_with_owner(row, 0),
            )
            .optional()?;
        Ok(listing)
    }

    // ON DELETE CASCADE: claims go with it, messages stay
    pub fn delete_listing(&self, id: ListingId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM food_listings WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn listings_for_hotel(&self, hotel: UserId) -> Result<Vec<FoodListing>> {
        let mut stmt = self.conn().prepare(&format!(
            "{LISTING_SELECT} WHERE l.hotel_id = ?1 ORDER BY l.created_at DESC, l.rowid DESC"
        ))?;
        let rows = stmt.query_map(params![hotel.to_string()], |row| {
            row_to_listing_with_owner(row, 0).map(|l| l.listing)
        })?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }

    pub fn available_listings(&self, query: &ListingQuery) -> Result<Vec<ListingWithOwner>> {
        let mut sql = format!("{LISTING_SELECT} WHERE l.status = 'available'");
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(now) = query.active_at {
            sql.push_str(" AND l.expiry_time > ?");
            values.push(Box::new(ts(&now)));
        }
        if query.require_coordinates {
            sql.push_str(" AND l.latitude IS NOT NULL AND l.longitude IS NOT NULL");
        }
        sql.push_str(" ORDER BY l.created_at DESC, l.rowid DESC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
            row_to_listing_with_owner(row, 0)
        })?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }
}

/// Decode a [`LISTING_SELECT`] row whose first column is at `offset`.
pub(crate) fn row_to_listing_with_owner(
    row: &rusqlite::Row<'_>,
    offset: usize,
) -> rusqlite::Result<ListingWithOwner> {
    let at = |i: usize| offset + i;

    let id_str: String = row.get(at(0))?;
    let hotel_str: String = row.get(at(1))?;
    let food_type_str: String = row.get(at(5))?;
    let expiry_str: String = row.get(at(6))?;
    let status_str: String = row.get(at(10))?;
    let images_json: String = row.get(at(11))?;
    let created_str: String = row.get(at(12))?;
    let owner_name: Option<String> = row.get(at(13))?;
    let owner_phone: Option<String> = row.get(at(14))?;

    let food_type: FoodType = food_type_str.parse().map_err(|e| conversion_err(at(5), e))?;
    let status: ListingStatus = status_str.parse().map_err(|e| conversion_err(at(10), e))?;
    let images: Vec<String> =
        serde_json::from_str(&images_json).map_err(|e| conversion_err(at(11), e))?;

    let owner = if owner_name.is_some() || owner_phone.is_some() {
        Some(OwnerContact {
            name: owner_name,
            phone: owner_phone,
        })
    } else {
        None
    };

    Ok(ListingWithOwner {
        listing: FoodListing {
            id: ListingId(parse_uuid(at(0), &id_str)?),
            hotel_id: UserId(parse_uuid(at(1), &hotel_str)?),
            title: row.get(at(2))?,
            description: row.get(at(3))?,
            quantity_kg: row.get(at(4))?,
            food_type,
            expiry_time: parse_ts(at(6), &expiry_str)?,
            address: row.get(at(7))?,
            latitude: row.get(at(8))?,
            longitude: row.get(at(9))?,
            status,
            images,
            created_at: parse_ts(at(12), &created_str)?,
        },
        owner,
    })
}
