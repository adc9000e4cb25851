// 🗄️ Storage - SQLite schema, ingestion and CSV import
//
// Two collections (members, field-service reports) plus the privilege and group catalogs.
// Ingestion validates everything it stores: month keys are parsed Month values and
// privilege tags are classified here, so readers can trust what they get back.

use crate::entities::{FieldServiceReport, Gender, Group, Member, Privilege, PrivilegeRef, Role};
use crate::privileges::PrivilegeTag;
use crate::month::Month;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {:?}", path))?;
    setup_database(&conn)?;
    debug!(path = ?path, "database opened");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery, foreign keys so reports always point at a member
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Catalogs
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS privileges (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL
        )",
        [],
    )?;

    // classification tags of each privilege name, in classification order
    conn.execute(
        "CREATE TABLE IF NOT EXISTS privilege_tags (
            privilege_id TEXT NOT NULL REFERENCES privileges(id),
            tag TEXT NOT NULL,
            PRIMARY KEY (privilege_id, tag)
        )",
        [],
    )?;

    // ==========================================================================
    // Members (+ ordered privilege set)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            date_of_birth TEXT,
            baptism_date TEXT,
            gender TEXT NOT NULL,
            role TEXT NOT NULL,
            group_id TEXT REFERENCES groups(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS member_privileges (
            member_id TEXT NOT NULL REFERENCES members(id),
            privilege_id TEXT NOT NULL REFERENCES privileges(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (member_id, privilege_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Field service reports: at most one per (publisher, month)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS field_service_reports (
            id TEXT PRIMARY KEY,
            publisher_id TEXT NOT NULL REFERENCES members(id),
            month TEXT NOT NULL,
            hours REAL,
            bible_students INTEGER NOT NULL DEFAULT 0,
            auxiliary_pioneer INTEGER NOT NULL DEFAULT 0,
            comments TEXT,
            submitted_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (publisher_id, month)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_name ON members(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_role ON members(role)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_group ON members(group_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reports_month ON field_service_reports(month)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_member_privileges_privilege ON member_privileges(privilege_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_privilege_tags_tag ON privilege_tags(tag)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// INGESTION
// ============================================================================

pub fn insert_group(conn: &Connection, group: &Group) -> Result<()> {
    conn.execute(
        "INSERT INTO groups (id, name) VALUES (?1, ?2)",
        params![group.id, group.name],
    )
    .with_context(|| format!("Failed to insert group '{}'", group.name))?;
    Ok(())
}

/// Insert a privilege with its classification tags (one transaction)
pub fn insert_privilege(conn: &Connection, privilege: &Privilege) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_privilege(&tx, privilege)?;
    tx.commit()?;
    Ok(())
}

fn write_privilege(conn: &Connection, privilege: &Privilege) -> Result<()> {
    conn.execute(
        "INSERT INTO privileges (id, name) VALUES (?1, ?2)",
        params![privilege.id, privilege.name],
    )
    .with_context(|| format!("Failed to insert privilege '{}'", privilege.name))?;

    for tag in &privilege.tags {
        conn.execute(
            "INSERT INTO privilege_tags (privilege_id, tag) VALUES (?1, ?2)",
            params![privilege.id, tag.as_str()],
        )?;
    }

    Ok(())
}

/// Insert a member with its privilege set (one transaction)
pub fn insert_member(conn: &Connection, member: &Member) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_member(&tx, member)?;
    tx.commit()?;
    Ok(())
}

fn write_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (id, name, date_of_birth, baptism_date, gender, role, group_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            member.id,
            member.name,
            member.date_of_birth,
            member.baptism_date,
            member.gender.as_str(),
            member.role.as_str(),
            member.group_id,
        ],
    )
    .with_context(|| format!("Failed to insert member '{}'", member.name))?;

    for (position, privilege_id) in member.privilege_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO member_privileges (member_id, privilege_id, position) VALUES (?1, ?2, ?3)",
            params![member.id, privilege_id, position as i64],
        )
        .with_context(|| {
            format!(
                "Failed to grant privilege {} to member '{}'",
                privilege_id, member.name
            )
        })?;
    }

    Ok(())
}

/// Insert one report. Returns false when (publisher, month) was already reported.
pub fn insert_report(conn: &Connection, report: &FieldServiceReport) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO field_service_reports (
            id, publisher_id, month, hours, bible_students, auxiliary_pioneer, comments
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            report.id,
            report.publisher_id,
            report.month,
            report.hours,
            report.bible_students,
            report.auxiliary_pioneer,
            report.comments,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_duplicate(&err) => Ok(false),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to insert report {} for publisher {}",
                report.month, report.publisher_id
            )
        }),
    }
}

/// Insert reports, skipping duplicates. Returns the number inserted.
pub fn insert_reports(conn: &Connection, reports: &[FieldServiceReport]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for report in reports {
        if insert_report(conn, report)? {
            inserted += 1;
        } else {
            warn!(
                publisher_id = %report.publisher_id,
                month = %report.month,
                "report already submitted for this month, skipping"
            );
            duplicates += 1;
        }
    }

    info!(inserted, duplicates, "field service reports stored");
    Ok(inserted)
}

fn is_duplicate(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Find a group by name, creating it on first sight
pub fn get_or_create_group(conn: &Connection, name: &str) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM groups WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;

    match existing {
        Some(id) => Ok(id),
        None => {
            let group = Group::new(name);
            insert_group(conn, &group)?;
            debug!(group = %group.name, "created group");
            Ok(group.id)
        }
    }
}

/// Find a privilege by name, creating (and classifying) it on first sight
pub fn get_or_create_privilege(conn: &Connection, name: &str) -> Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM privileges WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;

    match existing {
        Some(id) => Ok(id),
        None => {
            let privilege = Privilege::new(name);
            write_privilege(conn, &privilege)?;
            debug!(privilege = %privilege.name, tags = ?privilege.tags, "created privilege");
            Ok(privilege.id)
        }
    }
}

pub fn count_members(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_reports(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM field_service_reports", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One member row: `privileges` is a ';'-separated list of names
#[derive(Debug, Deserialize)]
pub struct MemberCsvRow {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub baptism_date: String,
    pub gender: String,
    pub role: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub privileges: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportCsvRow {
    pub publisher_id: String,
    pub month: String,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub bible_students: Option<u32>,
    #[serde(default)]
    pub auxiliary_pioneer: String,
    #[serde(default)]
    pub comments: String,
}

pub fn load_members_csv(csv_path: &Path) -> Result<Vec<MemberCsvRow>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open members CSV {:?}", csv_path))?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: MemberCsvRow = result.context("Failed to deserialize member row")?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn load_reports_csv(csv_path: &Path) -> Result<Vec<FieldServiceReport>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open reports CSV {:?}", csv_path))?;

    let mut reports = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: ReportCsvRow = result.context("Failed to deserialize report row")?;
        let month: Month = row
            .month
            .parse()
            .with_context(|| format!("Invalid month on report row {}", line + 1))?;

        let mut report = FieldServiceReport::new(row.publisher_id.trim(), month)
            .with_bible_students(row.bible_students.unwrap_or(0));
        if let Some(hours) = row.hours {
            report = report.with_hours(hours);
        }
        if parse_flag(&row.auxiliary_pioneer) {
            report = report.as_auxiliary_pioneer();
        }
        if let Some(comments) = non_blank(&row.comments) {
            report = report.with_comments(comments);
        }
        reports.push(report);
    }

    Ok(reports)
}

/// Store member rows, creating referenced groups and privileges by name.
/// Returns the number of members inserted (existing ids are skipped).
///
/// One transaction: an invalid row rolls back the whole import.
pub fn import_members(conn: &Connection, rows: &[MemberCsvRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    let mut duplicates = 0;

    for (line, row) in rows.iter().enumerate() {
        if let Some(id) = non_blank(&row.id) {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?1)",
                [id],
                |r| r.get(0),
            )?;
            if exists {
                warn!(member_id = %id, "member already exists, skipping");
                duplicates += 1;
                continue;
            }
        }

        let member = member_from_row(&tx, row)
            .with_context(|| format!("Invalid member on row {}", line + 1))?;
        write_member(&tx, &member)
            .with_context(|| format!("Failed to store member on row {}", line + 1))?;
        inserted += 1;
    }

    tx.commit()?;
    info!(inserted, duplicates, "members stored");
    Ok(inserted)
}

fn member_from_row(conn: &Connection, row: &MemberCsvRow) -> Result<Member> {
    let gender: Gender = row.gender.parse()?;
    let role: Role = row.role.parse()?;

    let mut member = Member::new(row.name.trim(), gender, role);
    if let Some(id) = non_blank(&row.id) {
        member.id = id.to_string();
    }
    member.date_of_birth = parse_optional_date(&row.date_of_birth)?;
    member.baptism_date = parse_optional_date(&row.baptism_date)?;

    if let Some(group) = non_blank(&row.group) {
        member.group_id = Some(get_or_create_group(conn, group)?);
    }

    for name in row.privileges.split(';').filter_map(non_blank) {
        let privilege_id = get_or_create_privilege(conn, name)?;
        member.add_privilege(privilege_id);
    }

    Ok(member)
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

fn parse_optional_date(s: &str) -> Result<Option<NaiveDate>> {
    match non_blank(s) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| crate::error::InputError::InvalidDate(raw.to_string()).into()),
    }
}

// ============================================================================
// SHARED READ HELPERS
// ============================================================================

/// Parse a stored text column into a typed value
pub(crate) fn parse_column<T, E>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    raw.parse()
        .map_err(|e: E| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Every member's privileges in granted order, keyed by member id
pub(crate) fn load_member_privileges(conn: &Connection) -> Result<HashMap<String, Vec<PrivilegeRef>>> {
    let tags = load_privilege_tags(conn)?;

    let mut stmt = conn.prepare(
        "SELECT mp.member_id, p.id, p.name
         FROM member_privileges mp
         JOIN privileges p ON p.id = mp.privilege_id
         ORDER BY mp.member_id, mp.position",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let member_id: String = row.get(0)?;
            let id: String = row.get(1)?;
            Ok((
                member_id,
                PrivilegeRef {
                    tags: tags.get(&id).cloned().unwrap_or_default(),
                    id,
                    name: row.get(2)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_member: HashMap<String, Vec<PrivilegeRef>> = HashMap::new();
    for (member_id, privilege) in rows {
        by_member.entry(member_id).or_default().push(privilege);
    }

    Ok(by_member)
}

fn load_privilege_tags(conn: &Connection) -> Result<HashMap<String, Vec<PrivilegeTag>>> {
    let mut stmt =
        conn.prepare("SELECT privilege_id, tag FROM privilege_tags ORDER BY privilege_id, rowid")?;

    let rows = stmt
        .query_map([], |row| {
            let privilege_id: String = row.get(0)?;
            let raw: String = row.get(1)?;
            Ok((privilege_id, parse_column::<PrivilegeTag, _>(1, &raw)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_privilege: HashMap<String, Vec<PrivilegeTag>> = HashMap::new();
    for (privilege_id, tag) in rows {
        by_privilege.entry(privilege_id).or_default().push(tag);
    }

    Ok(by_privilege)
}

// ============================================================================
// TESTS
// ============================================================================
