// 🔎 Member Directory - Member filter → member records
//
// Resolves a member filter into member rows with group and privilege names
// resolved, sorted by full name (byte-wise, locale-naive; ties keep insertion order).
// Also provides the option lists a UI needs to build a filter.

use crate::db::{load_member_privileges, parse_column};
use crate::entities::MemberRecord;
use crate::error::InputError;
use crate::privileges::PrivilegeTag;
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// MEMBER FILTER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberFilter {
    /// Every member
    All,
    /// Members whose role storage name equals the value exactly
    Role(String),
    /// Members in the group with this id
    Group(String),
    /// Members holding the privilege with this id
    Privilege(String),
    /// The single member with this id
    Member(String),
}

impl MemberFilter {
    pub const TYPES: [&'static str; 5] = ["all", "role", "group", "privilege", "member"];

    /// Parse the `(filterType, filterValue)` pair.
    ///
    /// Unknown types are rejected rather than widened to `all`; every type but `all`
    /// needs a non-blank value.
    pub fn parse(filter_type: &str, filter_value: Option<&str>) -> Result<Self, InputError> {
        let kind = filter_type.trim().to_lowercase();
        let value = filter_value.map(str::trim).filter(|v| !v.is_empty());

        if kind == "all" {
            return Ok(MemberFilter::All);
        }
        if !Self::TYPES.contains(&kind.as_str()) {
            return Err(InputError::UnknownFilterType(filter_type.to_string()));
        }

        let value = value
            .ok_or_else(|| InputError::MissingFilterValue(kind.clone()))?
            .to_string();

        Ok(match kind.as_str() {
            "role" => MemberFilter::Role(value),
            "group" => MemberFilter::Group(value),
            "privilege" => MemberFilter::Privilege(value),
            _ => MemberFilter::Member(value),
        })
    }

    pub fn filter_type(&self) -> &'static str {
        match self {
            MemberFilter::All => "all",
            MemberFilter::Role(_) => "role",
            MemberFilter::Group(_) => "group",
            MemberFilter::Privilege(_) => "privilege",
            MemberFilter::Member(_) => "member",
        }
    }

    pub fn filter_value(&self) -> Option<&str> {
        match self {
            MemberFilter::All => None,
            MemberFilter::Role(v)
            | MemberFilter::Group(v)
            | MemberFilter::Privilege(v)
            | MemberFilter::Member(v) => Some(v),
        }
    }

    fn where_clause(&self) -> &'static str {
        match self {
            MemberFilter::All => "",
            MemberFilter::Role(_) => "WHERE m.role = ?1",
            MemberFilter::Group(_) => "WHERE m.group_id = ?1",
            MemberFilter::Privilege(_) => {
                "WHERE EXISTS (SELECT 1 FROM member_privileges mp
                               WHERE mp.member_id = m.id AND mp.privilege_id = ?1)"
            }
            MemberFilter::Member(_) => "WHERE m.id = ?1",
        }
    }
}

// ============================================================================
// LOOKUPS
// ============================================================================

/// Members matching the filter, sorted by name. No match is an empty result, not an error.
pub fn find_members(conn: &Connection, filter: &MemberFilter) -> Result<Vec<MemberRecord>> {
    let members = query_members(conn, filter.where_clause(), filter.filter_value())
        .with_context(|| format!("Failed to look up members ({} filter)", filter.filter_type()))?;

    debug!(
        filter_type = filter.filter_type(),
        filter_value = filter.filter_value().unwrap_or(""),
        count = members.len(),
        "resolved member set"
    );
    Ok(members)
}

/// Members holding any privilege classified with `tag`, sorted by name.
/// Empty when no such privilege exists.
pub fn find_members_with_tag(conn: &Connection, tag: PrivilegeTag) -> Result<Vec<MemberRecord>> {
    let members = query_members(
        conn,
        "WHERE EXISTS (SELECT 1 FROM member_privileges mp
                       JOIN privilege_tags pt ON pt.privilege_id = mp.privilege_id
                       WHERE mp.member_id = m.id AND pt.tag = ?1)",
        Some(tag.as_str()),
    )
    .with_context(|| format!("Failed to look up members tagged {}", tag))?;

    debug!(tag = %tag, count = members.len(), "resolved tagged member set");
    Ok(members)
}

fn query_members(
    conn: &Connection,
    where_clause: &str,
    value: Option<&str>,
) -> Result<Vec<MemberRecord>> {
    let sql = format!(
        "SELECT m.id, m.name, m.date_of_birth, m.baptism_date, m.gender, m.role,
                m.group_id, g.name
         FROM members m
         LEFT JOIN groups g ON g.id = m.group_id
         {}
         ORDER BY m.name, m.rowid",
        where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut members = stmt
        .query_map(params_from_iter(value), |row| {
            let gender: String = row.get(4)?;
            let role: String = row.get(5)?;

            Ok(MemberRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                date_of_birth: row.get(2)?,
                baptism_date: row.get(3)?,
                gender: parse_column(4, &gender)?,
                role: parse_column(5, &role)?,
                group_id: row.get(6)?,
                group_name: row.get(7)?,
                privileges: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if !members.is_empty() {
        let mut privileges = load_member_privileges(conn)?;
        for member in &mut members {
            member.privileges = privileges.remove(&member.id).unwrap_or_default();
        }
    }

    Ok(members)
}

// ============================================================================
// FILTER OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub name: String,
}

/// Everything a caller can pick from when building a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub filter_types: Vec<String>,
    pub roles: Vec<String>,
    pub groups: Vec<FilterOption>,
    pub privileges: Vec<FilterOption>,
    pub members: Vec<FilterOption>,
}

pub fn filter_options(conn: &Connection) -> Result<FilterOptions> {
    let mut stmt = conn.prepare("SELECT DISTINCT role FROM members ORDER BY role")?;
    let roles = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(FilterOptions {
        filter_types: MemberFilter::TYPES.iter().map(|t| t.to_string()).collect(),
        roles,
        groups: named_options(conn, "SELECT id, name FROM groups ORDER BY name")?,
        privileges: named_options(conn, "SELECT id, name FROM privileges ORDER BY name")?,
        members: named_options(conn, "SELECT id, name FROM members ORDER BY name, rowid")?,
    })
}

fn named_options(conn: &Connection, sql: &str) -> Result<Vec<FilterOption>> {
    let mut stmt = conn.prepare(sql)?;
    let options = stmt
        .query_map([], |row| {
            Ok(FilterOption {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(options)
}

// ============================================================================
// TESTS
// ============================================================================
