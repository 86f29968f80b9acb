//! Persistence using SQLite
//!
//! One database holds pages, events, and the legacy groups/posts tables.
//! Foreign keys are enforced so deleting a page cascades to its events
//! (and a group to its posts).

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::warn;

use crate::Result;
use crate::models::{Event, Group, GroupCreate, NewEvent, Page, PageCreate};

/// SQLite-backed store for pages, events, and legacy groups
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at the given path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fb_page_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                page_url TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fb_event_id TEXT NOT NULL UNIQUE,
                fb_page_id INTEGER NOT NULL
                    REFERENCES pages(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                event_url TEXT,
                location TEXT,
                start_time TEXT,
                end_time TEXT,
                timezone TEXT,
                is_online INTEGER NOT NULL DEFAULT 0,
                attending_count INTEGER NOT NULL DEFAULT 0,
                interested_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_fb_page_id ON events(fb_page_id);

            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fb_group_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fb_post_id TEXT NOT NULL UNIQUE,
                fb_group_id INTEGER NOT NULL
                    REFERENCES groups(id) ON DELETE CASCADE,
                content TEXT,
                author TEXT,
                post_url TEXT,
                posted_at TEXT,
                likes_count INTEGER NOT NULL DEFAULT 0,
                comments_count INTEGER NOT NULL DEFAULT 0,
                shares_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Insert a new page; missing name falls back to an empty string
    pub fn insert_page(&self, page: &PageCreate) -> Result<Page> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO pages (fb_page_id, name, description, page_url, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![
                page.fb_page_id,
                page.name.clone().unwrap_or_default(),
                page.description,
                page.page_url,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        let page = conn.query_row(
            &format!("{PAGE_SELECT} WHERE id = ?1"),
            params![id],
            page_from_row,
        )?;
        Ok(page)
    }

    /// Look up a page by internal id
    pub fn get_page(&self, id: i64) -> Result<Option<Page>> {
        let conn = self.conn.lock().unwrap();
        let page = conn
            .query_row(
                &format!("{PAGE_SELECT} WHERE id = ?1"),
                params![id],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    /// Look up a page by its Facebook page id
    pub fn get_page_by_fb_id(&self, fb_page_id: &str) -> Result<Option<Page>> {
        let conn = self.conn.lock().unwrap();
        let page = conn
            .query_row(
                &format!("{PAGE_SELECT} WHERE fb_page_id = ?1"),
                params![fb_page_id],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    /// List pages with offset/limit pagination
    pub fn list_pages(&self, skip: i64, limit: i64) -> Result<Vec<Page>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{PAGE_SELECT} ORDER BY id LIMIT ?1 OFFSET ?2"))?;
        let pages = stmt
            .query_map(params![limit, skip], page_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    /// Toggle whether a page is eligible for scheduled fetching
    pub fn set_page_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE pages SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![is_active, Utc::now().to_rfc3339(), id],
        )?;
        Ok(affected > 0)
    }

    /// Delete a page and (by cascade) its events; false when not found
    pub fn delete_page(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM pages WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Insert an event or update the existing row with the same
    /// `fb_event_id`; `created_at` is preserved on update.
    pub fn upsert_event(&self, event: &NewEvent) -> Result<Event> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM events WHERE fb_event_id = ?1",
                params![event.fb_event_id],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE events SET
                        name = ?1, description = ?2, event_url = ?3, location = ?4,
                        start_time = ?5, end_time = ?6, is_online = ?7,
                        attending_count = ?8, interested_count = ?9, updated_at = ?10
                     WHERE id = ?11",
                    params![
                        event.name,
                        event.description,
                        event.event_url,
                        event.location,
                        event.start_time.map(|t| t.to_rfc3339()),
                        event.end_time.map(|t| t.to_rfc3339()),
                        event.is_online,
                        event.attending_count,
                        event.interested_count,
                        now,
                        id,
                    ],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO events (fb_event_id, fb_page_id, name, description,
                        event_url, location, start_time, end_time, is_online,
                        attending_count, interested_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                    params![
                        event.fb_event_id,
                        event.fb_page_id,
                        event.name,
                        event.description,
                        event.event_url,
                        event.location,
                        event.start_time.map(|t| t.to_rfc3339()),
                        event.end_time.map(|t| t.to_rfc3339()),
                        event.is_online,
                        event.attending_count,
                        event.interested_count,
                        now,
                    ],
                )?;
                conn.last_insert_rowid()
            }
        };

        let event = conn.query_row(
            &format!("{EVENT_SELECT} WHERE id = ?1"),
            params![id],
            event_from_row,
        )?;
        Ok(event)
    }

    /// Look up an event by internal id
    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let conn = self.conn.lock().unwrap();
        let event = conn
            .query_row(
                &format!("{EVENT_SELECT} WHERE id = ?1"),
                params![id],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    /// List events, optionally filtered by owning page
    pub fn list_events(&self, page_id: Option<i64>, skip: i64, limit: i64) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();

        let events = match page_id {
            Some(page_id) => {
                let mut stmt = conn.prepare(&format!(
                    "{EVENT_SELECT} WHERE fb_page_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
                ))?;
                stmt.query_map(params![page_id, limit, skip], event_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{EVENT_SELECT} ORDER BY id LIMIT ?1 OFFSET ?2"))?;
                stmt.query_map(params![limit, skip], event_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Groups (deprecated surface)
    // ------------------------------------------------------------------

    /// Insert a new group
    pub fn insert_group(&self, group: &GroupCreate) -> Result<Group> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO groups (fb_group_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                group.fb_group_id,
                group.name.clone().unwrap_or_default(),
                group.description,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        let group = conn.query_row(
            &format!("{GROUP_SELECT} WHERE id = ?1"),
            params![id],
            group_from_row,
        )?;
        Ok(group)
    }

    /// Look up a group by internal id
    pub fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let conn = self.conn.lock().unwrap();
        let group = conn
            .query_row(
                &format!("{GROUP_SELECT} WHERE id = ?1"),
                params![id],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    /// Look up a group by its Facebook group id
    pub fn get_group_by_fb_id(&self, fb_group_id: &str) -> Result<Option<Group>> {
        let conn = self.conn.lock().unwrap();
        let group = conn
            .query_row(
                &format!("{GROUP_SELECT} WHERE fb_group_id = ?1"),
                params![fb_group_id],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    /// List groups with offset/limit pagination
    pub fn list_groups(&self, skip: i64, limit: i64) -> Result<Vec<Group>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{GROUP_SELECT} ORDER BY id LIMIT ?1 OFFSET ?2"))?;
        let groups = stmt
            .query_map(params![limit, skip], group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    /// Delete a group and (by cascade) its posts; false when not found
    pub fn delete_group(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM groups WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Count events for a page (used by tests and diagnostics)
    pub fn count_events(&self, page_id: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE fb_page_id = ?1",
            params![page_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

const PAGE_SELECT: &str = "SELECT id, fb_page_id, name, description, page_url, is_active,
    created_at, updated_at FROM pages";

const EVENT_SELECT: &str = "SELECT id, fb_event_id, fb_page_id, name, description, event_url,
    location, start_time, end_time, timezone, is_online, attending_count, interested_count,
    created_at, updated_at FROM events";

const GROUP_SELECT: &str = "SELECT id, fb_group_id, name, description, created_at, updated_at
    FROM groups";

fn parse_ts(value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            warn!("Invalid timestamp in database: {:?} ({})", value, e);
            rusqlite::Error::InvalidQuery
        })
}

fn parse_opt_ts(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(parse_ts).transpose()
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        fb_page_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        page_url: row.get(4)?,
        is_active: row.get(5)?,
        created_at: parse_ts(row.get(6)?)?,
        updated_at: parse_ts(row.get(7)?)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        fb_event_id: row.get(1)?,
        fb_page_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        event_url: row.get(5)?,
        location: row.get(6)?,
        start_time: parse_opt_ts(row.get(7)?)?,
        end_time: parse_opt_ts(row.get(8)?)?,
        timezone: row.get(9)?,
        is_online: row.get(10)?,
        attending_count: row.get(11)?,
        interested_count: row.get(12)?,
        created_at: parse_ts(row.get(13)?)?,
        updated_at: parse_ts(row.get(14)?)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        fb_group_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_ts(row.get(4)?)?,
        updated_at: parse_ts(row.get(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_page(fb_page_id: &str) -> PageCreate {
        PageCreate {
            fb_page_id: fb_page_id.to_string(),
            name: Some("Test Page".to_string()),
            description: Some("A page".to_string()),
            page_url: Some(format!("https://facebook.com/{fb_page_id}")),
        }
    }

    fn sample_event(fb_event_id: &str, page_id: i64) -> NewEvent {
        NewEvent {
            fb_event_id: fb_event_id.to_string(),
            fb_page_id: page_id,
            name: "Concert".to_string(),
            description: None,
            event_url: Some(format!("https://facebook.com/events/{fb_event_id}")),
            location: Some("Town Hall".to_string()),
            start_time: Some(Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap()),
            end_time: None,
            is_online: false,
            attending_count: 12,
            interested_count: 30,
        }
    }

    #[test]
    fn test_insert_and_get_page() {
        let store = Store::in_memory().unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();
        assert_eq!(page.fb_page_id, "111");
        assert_eq!(page.name, "Test Page");
        assert!(page.is_active);

        let loaded = store.get_page(page.id).unwrap().unwrap();
        assert_eq!(loaded, page);

        let by_fb = store.get_page_by_fb_id("111").unwrap().unwrap();
        assert_eq!(by_fb.id, page.id);

        assert!(store.get_page(page.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_insert_page_without_name() {
        let store = Store::in_memory().unwrap();
        let page = store
            .insert_page(&PageCreate {
                fb_page_id: "222".to_string(),
                name: None,
                description: None,
                page_url: None,
            })
            .unwrap();
        assert_eq!(page.name, "");
        assert!(page.description.is_none());
    }

    #[test]
    fn test_duplicate_fb_page_id_rejected() {
        let store = Store::in_memory().unwrap();
        store.insert_page(&sample_page("111")).unwrap();
        assert!(store.insert_page(&sample_page("111")).is_err());
    }

    #[test]
    fn test_list_pages_pagination() {
        let store = Store::in_memory().unwrap();
        for i in 0..5 {
            store.insert_page(&sample_page(&format!("page-{i}"))).unwrap();
        }

        let all = store.list_pages(0, 100).unwrap();
        assert_eq!(all.len(), 5);

        let second_two = store.list_pages(1, 2).unwrap();
        assert_eq!(second_two.len(), 2);
        assert_eq!(second_two[0].fb_page_id, "page-1");
        assert_eq!(second_two[1].fb_page_id, "page-2");
    }

    #[test]
    fn test_set_page_active() {
        let store = Store::in_memory().unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();
        assert!(page.is_active);

        assert!(store.set_page_active(page.id, false).unwrap());
        let reloaded = store.get_page(page.id).unwrap().unwrap();
        assert!(!reloaded.is_active);
        assert!(reloaded.updated_at >= page.updated_at);

        assert!(store.set_page_active(page.id, true).unwrap());
        assert!(store.get_page(page.id).unwrap().unwrap().is_active);

        // unknown page
        assert!(!store.set_page_active(999, false).unwrap());
    }

    #[test]
    fn test_parse_ts_rejects_garbage() {
        assert!(parse_ts("2025-06-01T19:00:00+00:00".to_string()).is_ok());
        assert!(parse_ts("not-a-timestamp".to_string()).is_err());
        assert!(parse_opt_ts(None).unwrap().is_none());
        assert!(parse_opt_ts(Some("garbage".to_string())).is_err());
    }

    #[test]
    fn test_delete_page_cascades_events() {
        let store = Store::in_memory().unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();
        store.upsert_event(&sample_event("ev-1", page.id)).unwrap();
        store.upsert_event(&sample_event("ev-2", page.id)).unwrap();
        assert_eq!(store.count_events(page.id).unwrap(), 2);

        assert!(store.delete_page(page.id).unwrap());
        assert_eq!(store.list_events(None, 0, 100).unwrap().len(), 0);

        // second delete is a no-op
        assert!(!store.delete_page(page.id).unwrap());
    }

    #[test]
    fn test_upsert_event_updates_in_place() {
        let store = Store::in_memory().unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();

        let first = store.upsert_event(&sample_event("ev-1", page.id)).unwrap();
        assert_eq!(first.attending_count, 12);

        let mut changed = sample_event("ev-1", page.id);
        changed.attending_count = 99;
        changed.name = "Concert (rescheduled)".to_string();
        let second = store.upsert_event(&changed).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.attending_count, 99);
        assert_eq!(second.name, "Concert (rescheduled)");
        assert_eq!(store.list_events(None, 0, 100).unwrap().len(), 1);
    }

    #[test]
    fn test_list_events_filtered_by_page() {
        let store = Store::in_memory().unwrap();
        let page_a = store.insert_page(&sample_page("a")).unwrap();
        let page_b = store.insert_page(&sample_page("b")).unwrap();
        store.upsert_event(&sample_event("ev-a", page_a.id)).unwrap();
        store.upsert_event(&sample_event("ev-b1", page_b.id)).unwrap();
        store.upsert_event(&sample_event("ev-b2", page_b.id)).unwrap();

        assert_eq!(store.list_events(None, 0, 100).unwrap().len(), 3);
        assert_eq!(store.list_events(Some(page_b.id), 0, 100).unwrap().len(), 2);
        assert_eq!(store.list_events(Some(page_a.id), 0, 100).unwrap().len(), 1);
    }

    #[test]
    fn test_event_optional_times_roundtrip() {
        let store = Store::in_memory().unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();

        let mut event = sample_event("ev-1", page.id);
        event.start_time = None;
        let stored = store.upsert_event(&event).unwrap();
        assert!(stored.start_time.is_none());
        assert!(stored.end_time.is_none());
        assert!(stored.timezone.is_none());
    }

    #[test]
    fn test_group_crud() {
        let store = Store::in_memory().unwrap();
        let group = store
            .insert_group(&GroupCreate {
                fb_group_id: "g-1".to_string(),
                name: Some("Legacy Group".to_string()),
                description: None,
            })
            .unwrap();

        assert_eq!(store.get_group(group.id).unwrap().unwrap().name, "Legacy Group");
        assert_eq!(
            store.get_group_by_fb_id("g-1").unwrap().unwrap().id,
            group.id
        );
        assert_eq!(store.list_groups(0, 100).unwrap().len(), 1);
        assert!(store.delete_group(group.id).unwrap());
        assert!(!store.delete_group(group.id).unwrap());
    }

    #[test]
    fn test_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("fetcher.db");

        let store = Store::new(&db_path).unwrap();
        let page = store.insert_page(&sample_page("111")).unwrap();
        drop(store);

        let reopened = Store::new(&db_path).unwrap();
        assert_eq!(reopened.get_page(page.id).unwrap().unwrap().fb_page_id, "111");
    }
}
