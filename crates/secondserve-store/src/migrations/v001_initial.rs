//! v001 -- Initial schema creation.
//!
//! Creates `profiles`, `food_listings`, `food_claims`, `messages` and the
//! single-row `auth_session` cache.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Profiles (id shared with the auth user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id                     TEXT PRIMARY KEY NOT NULL,   -- UUID
    name                   TEXT NOT NULL,
    role                   TEXT NOT NULL CHECK (role IN ('hotel', 'ngo')),
    phone                  TEXT,
    address                TEXT,
    latitude               REAL,
    longitude              REAL,
    push_token             TEXT,
    notification_radius_km INTEGER,
    created_at             TEXT NOT NULL                -- RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_profiles_role ON profiles(role);

-- ----------------------------------------------------------------
-- Food listings
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS food_listings (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID
    hotel_id    TEXT NOT NULL,               -- FK -> profiles(id)
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    quantity_kg REAL NOT NULL CHECK (quantity_kg > 0),
    food_type   TEXT NOT NULL CHECK (food_type IN ('veg', 'non_veg', 'both')),
    expiry_time TEXT NOT NULL,
    address     TEXT NOT NULL,
    latitude    REAL,
    longitude   REAL,
    status      TEXT NOT NULL DEFAULT 'available',
    images      TEXT NOT NULL DEFAULT '[]',  -- JSON array of URLs
    created_at  TEXT NOT NULL,

    FOREIGN KEY (hotel_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_listings_status_created
    ON food_listings(status, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_listings_hotel ON food_listings(hotel_id);

-- ----------------------------------------------------------------
-- Claims (NGO bookmarks)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS food_claims (
    ngo_id          TEXT NOT NULL,           -- FK -> profiles(id)
    food_listing_id TEXT NOT NULL,           -- FK -> food_listings(id)
    claimed_at      TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending',

    PRIMARY KEY (ngo_id, food_listing_id),
    FOREIGN KEY (ngo_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (food_listing_id) REFERENCES food_listings(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Messages (listing_id is deliberately not a foreign key: chat history
-- outlives the listing)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID
    sender_id   TEXT NOT NULL,
    receiver_id TEXT NOT NULL,
    listing_id  TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    is_read     INTEGER NOT NULL DEFAULT 0   -- boolean 0/1
);

CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id, created_at DESC);

-- ----------------------------------------------------------------
-- Cached auth session
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS auth_session (
    id   INTEGER PRIMARY KEY CHECK (id = 1),
    json TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
