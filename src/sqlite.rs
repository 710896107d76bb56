//! SQLite storage for groups, members and gifts.

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::participant::{Group, GroupId, HistoricalPair, Pairing, Participant, ParticipantId, Roster, Year};
use crate::store::{AssignmentSink, RosterProvider, StoreError};

const INITIAL_TABLES: &str = "
CREATE TABLE Users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE GiftExchangeGroup (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    current_year INTEGER
);

CREATE TABLE GroupMembership (
    user INTEGER NOT NULL REFERENCES Users (id),
    gift_exchange_group INTEGER NOT NULL REFERENCES GiftExchangeGroup (id),
    PRIMARY KEY (user, gift_exchange_group)
);

CREATE TABLE Gift (
    receiver INTEGER NOT NULL REFERENCES Users (id),
    giver INTEGER NOT NULL REFERENCES Users (id),
    gift_exchange_group INTEGER NOT NULL REFERENCES GiftExchangeGroup (id),
    year INTEGER NOT NULL,
    UNIQUE (giver, gift_exchange_group, year),
    UNIQUE (receiver, gift_exchange_group, year)
);
";

/// Schema changes in order; `PRAGMA user_version` counts how many have been applied.
const MIGRATIONS: &[&str] = &[INITIAL_TABLES];

/// A [`RosterProvider`] and [`AssignmentSink`] over one SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database file, bringing its schema up to date. A missing file is an error.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::MissingDatabase(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        info!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    /// A fresh database in memory.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let version: usize = self.conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        let pending = MIGRATIONS.get(version..).unwrap_or_default();
        if pending.is_empty() {
            debug!(version, "no migrations necessary");
            return Ok(());
        }

        for (offset, migration) in pending.iter().enumerate() {
            info!(migration = version + offset, "applying migration");
            self.conn.execute_batch(migration)?;
        }
        self.conn.pragma_update(None, "user_version", MIGRATIONS.len())?;

        Ok(())
    }

    /// Add a user, returning their id.
    pub fn add_user(&self, name: &str) -> Result<ParticipantId, StoreError> {
        self.conn.execute("INSERT INTO Users (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Add a group which has not yet been drawn, returning its id.
    pub fn add_group(&self, name: &str) -> Result<GroupId, StoreError> {
        self.conn.execute("INSERT INTO GiftExchangeGroup (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Put `user` in `group`.
    pub fn add_member(&self, group: GroupId, user: ParticipantId) -> Result<(), StoreError> {
        self.conn.execute("INSERT INTO GroupMembership (user, gift_exchange_group) VALUES (?1, ?2)", params![user, group])
            .map_err(classify)?;
        Ok(())
    }

    /// Record a gift from an earlier draw without touching the group's current year.
    pub fn record_gift(&self, group: GroupId, gift: HistoricalPair) -> Result<(), StoreError> {
        insert_assignment(&self.conn, gift.receiver, gift.giver, group, gift.year).map_err(classify)
    }

    /// Allow `group` to be drawn again, e.g. at the start of a new season.
    pub fn reopen_group(&self, group: GroupId) -> Result<(), StoreError> {
        self.conn.execute("UPDATE GiftExchangeGroup SET current_year = NULL WHERE id = ?1", params![group])?;
        Ok(())
    }

    /// The year `group` was last drawn for, or `None` if it is waiting for a draw.
    pub fn current_year(&self, group: GroupId) -> Result<Option<Year>, StoreError> {
        Ok(self.conn.query_row("SELECT current_year FROM GiftExchangeGroup WHERE id = ?1", params![group], |row| row.get(0))?)
    }

    /// Every pair recorded for `group` in `year`, ordered by giver.
    pub fn assignments(&self, group: GroupId, year: Year) -> Result<Vec<Pairing>, StoreError> {
        let mut statement = self.conn.prepare(
            "SELECT g.id, g.name, r.id, r.name FROM Gift
             INNER JOIN Users AS g ON g.id = Gift.giver
             INNER JOIN Users AS r ON r.id = Gift.receiver
             WHERE Gift.gift_exchange_group = ?1 AND Gift.year = ?2
             ORDER BY g.id"
        )?;

        let pairs = statement.query_map(params![group, year], |row| Ok(Pairing {
            giver: Participant::new(row.get(0)?, row.get::<_, String>(1)?),
            receiver: Participant::new(row.get(2)?, row.get::<_, String>(3)?),
        }))?.collect::<Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    /// Who `giver` buys for in `group` in `year`.
    pub fn recipient_of(&self, giver: ParticipantId, group: GroupId, year: Year) -> Result<Option<Participant>, StoreError> {
        Ok(self.conn.query_row(
            "SELECT u.id, u.name FROM Users AS u
             INNER JOIN Gift ON Gift.receiver = u.id
             WHERE Gift.giver = ?1 AND Gift.gift_exchange_group = ?2 AND Gift.year = ?3",
            params![giver, group, year],
            |row| Ok(Participant::new(row.get(0)?, row.get::<_, String>(1)?)),
        ).optional()?)
    }
}

impl RosterProvider for SqliteStore {
    fn pending_groups(&self) -> Result<Vec<Group>, StoreError> {
        let mut statement = self.conn.prepare("SELECT id, name FROM GiftExchangeGroup WHERE current_year IS NULL ORDER BY id")?;
        let groups = statement.query_map([], |row| Ok(Group { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn roster(&self, group: GroupId) -> Result<Roster, StoreError> {
        let mut statement = self.conn.prepare(
            "SELECT id, name FROM Users
             INNER JOIN GroupMembership AS gm ON Users.id = gm.user
             WHERE gm.gift_exchange_group = ?1
             ORDER BY id"
        )?;
        let members = statement.query_map(params![group], |row| Ok(Participant::new(row.get(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        if members.is_empty() {
            return Err(StoreError::EmptyGroup(group));
        }
        Ok(Roster::new(members))
    }

    fn history(&self, group: GroupId) -> Result<Vec<HistoricalPair>, StoreError> {
        let mut statement = self.conn.prepare("SELECT giver, receiver, year FROM Gift WHERE gift_exchange_group = ?1 ORDER BY year, giver")?;
        let history = statement.query_map(params![group], |row| Ok(HistoricalPair {
            giver: row.get(0)?,
            receiver: row.get(1)?,
            year: row.get(2)?,
        }))?.collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }

    fn latest_year(&self, group: GroupId) -> Result<Option<Year>, StoreError> {
        Ok(self.conn.query_row("SELECT max(year) FROM Gift WHERE gift_exchange_group = ?1", params![group], |row| row.get(0))?)
    }
}

impl AssignmentSink for SqliteStore {
    fn commit(&mut self, group: GroupId, year: Year, pairs: &[Pairing]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for pair in pairs {
            insert_assignment(&tx, pair.receiver.id, pair.giver.id, group, year).map_err(classify)?;
        }
        set_current_year(&tx, group, year).map_err(classify)?;
        // dropping an uncommitted transaction rolls it back
        tx.commit()?;

        info!(group, year, pairs = pairs.len(), "draw recorded");
        Ok(())
    }
}

fn insert_assignment(conn: &Connection, receiver: ParticipantId, giver: ParticipantId, group: GroupId, year: Year) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO Gift (receiver, giver, gift_exchange_group, year) VALUES (?1, ?2, ?3, ?4)",
        params![receiver, giver, group, year],
    )?;
    Ok(())
}

fn set_current_year(tx: &Transaction<'_>, group: GroupId, year: Year) -> rusqlite::Result<()> {
    let updated = tx.execute("UPDATE GiftExchangeGroup SET current_year = ?1 WHERE id = ?2", params![year, group])?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    Ok(())
}

/// Constraint violations become [`StoreError::Conflict`].
fn classify(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, ref message) if failure.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(message.clone().unwrap_or_else(|| failure.to_string()))
        }
        rusqlite::Error::QueryReturnedNoRows => StoreError::Conflict("group does not exist".to_string()),
        other => StoreError::Database(other),
    }
}
