use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use secondserve_shared::models::{NewProfile, Profile, ProfilePatch, Role};
use secondserve_shared::types::{Coordinates, UserId};

use crate::database::{conversion_err, not_found, parse_uuid, ts, Database};
use crate::error::Result;

const PROFILE_COLUMNS: &str = "id, name, role, phone, address, latitude, longitude, push_token, notification_radius_km";

/// An NGO that can receive new-listing alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTarget {
    pub id: UserId,
    pub push_token: String,
    pub location: Coordinates,
    pub radius_km: Option<u32>,
}

impl Database {
    pub fn insert_profile(&self, profile: &NewProfile) -> Result<Profile> {
        self.conn().execute(
            "INSERT INTO profiles (id, name, role, phone, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.id.to_string(),
                profile.name,
                profile.role.as_str(),
                profile.phone,
                ts(&Utc::now()),
            ],
        )?;
        self.get_profile(profile.id)
    }

    pub fn get_profile(&self, id: UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(not_found)
    }

    pub fn find_profile(&self, id: UserId) -> Result<Option<Profile>> {
        let profile = self
            .conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id.to_string()],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Apply the set fields of `patch`. Returns whether the profile exists.
    pub fn update_profile(&self, id: UserId, patch: &ProfilePatch) -> Result<bool> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(address) = &patch.address {
            sets.push("address = ?");
            values.push(Box::new(address.clone()));
        }
        if let Some(lat) = patch.latitude {
            sets.push("latitude = ?");
            values.push(Box::new(lat));
        }
        if let Some(lon) = patch.longitude {
            sets.push("longitude = ?");
            values.push(Box::new(lon));
        }
        if let Some(radius) = patch.notification_radius_km {
            sets.push("notification_radius_km = ?");
            values.push(Box::new(radius));
        }
        if let Some(token) = &patch.push_token {
            sets.push("push_token = ?");
            values.push(Box::new(token.clone()));
        }

        if sets.is_empty() {
            return Ok(self.find_profile(id)?.is_some());
        }

        values.push(Box::new(id.to_string()));
        let sql = format!("UPDATE profiles SET {} WHERE id = ?", sets.join(", "));
        let affected = self
            .conn()
            .execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(affected > 0)
    }

    /// NGO profiles with a push token and a stored location.
    pub fn alert_targets(&self) -> Result<Vec<AlertTarget>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, push_token, latitude, longitude, notification_radius_km
             FROM profiles
             WHERE role = 'ngo'
               AND push_token IS NOT NULL AND push_token != ''
               AND latitude IS NOT NULL AND longitude IS NOT NULL",
        )?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            Ok(AlertTarget {
                id: UserId(parse_uuid(0, &id)?),
                push_token: row.get(1)?,
                location: Coordinates::new(row.get(2)?, row.get(3)?),
                radius_km: row.get(4)?,
            })
        })?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }
        Ok(targets)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(2)?;

    let role: Role = role_str.parse().map_err(|e| conversion_err(2, e))?;

    Ok(Profile {
        id: UserId(parse_uuid(0, &id_str)?),
        name: row.get(1)?,
        role,
        phone: row.get(3)?,
        address: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        push_token: row.get(7)?,
        notification_radius_km: row.get(8)?,
    })
}
