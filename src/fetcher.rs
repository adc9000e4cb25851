// 📥 Report Range Fetcher - Reports inside [start, end] for a member set
//
// Months are stored as validated YYYY-MM keys, so the SQL range predicate over the
// stored text matches chronological order exactly.

use crate::db::load_member_privileges;
use crate::entities::{FieldServiceReport, PublisherRef, ReportWithPublisher};
use crate::month::MonthRange;
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Which publishers to fetch reports for
#[derive(Debug, Clone, Copy)]
pub enum Publishers<'a> {
    /// Every member
    Everyone,
    /// Only these member ids (empty slice → no reports)
    Only(&'a [String]),
}

/// Reports in `range` for `publishers`, with the publisher relation populated.
///
/// Ordered by month, then publisher name, then submission order.
pub fn find_reports_in_range(
    conn: &Connection,
    range: &MonthRange,
    publishers: Publishers<'_>,
) -> Result<Vec<ReportWithPublisher>> {
    let mut params = vec![range.start().to_string(), range.end().to_string()];

    let publisher_clause = match publishers {
        Publishers::Everyone => String::new(),
        Publishers::Only([]) => return Ok(Vec::new()),
        Publishers::Only(ids) => {
            let placeholders: Vec<String> =
                (0..ids.len()).map(|i| format!("?{}", i + 3)).collect();
            params.extend(ids.iter().cloned());
            format!("AND r.publisher_id IN ({})", placeholders.join(", "))
        }
    };

    let sql = format!(
        "SELECT r.id, r.publisher_id, r.month, r.hours, r.bible_students,
                r.auxiliary_pioneer, r.comments, m.name
         FROM field_service_reports r
         JOIN members m ON m.id = r.publisher_id
         WHERE r.month BETWEEN ?1 AND ?2
         {}
         ORDER BY r.month, m.name, r.rowid",
        publisher_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut reports = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let publisher_id: String = row.get(1)?;
            Ok(ReportWithPublisher {
                report: FieldServiceReport {
                    id: row.get(0)?,
                    publisher_id: publisher_id.clone(),
                    month: row.get(2)?,
                    hours: row.get(3)?,
                    bible_students: row.get(4)?,
                    auxiliary_pioneer: row.get(5)?,
                    comments: row.get(6)?,
                },
                publisher: PublisherRef {
                    id: publisher_id,
                    name: row.get(7)?,
                    privileges: Vec::new(),
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to fetch reports {}..{}", range.start(), range.end()))?;

    if !reports.is_empty() {
        let privileges = load_member_privileges(conn)?;
        for entry in &mut reports {
            if let Some(held) = privileges.get(&entry.publisher.id) {
                entry.publisher.privileges = held.clone();
            }
        }
    }

    debug!(
        start = %range.start(),
        end = %range.end(),
        count = reports.len(),
        "fetched reports in range"
    );
    Ok(reports)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_member, insert_privilege, insert_reports, setup_database};
    use crate::entities::{Gender, Member, Privilege, Role};
    use crate::month::Month;
    use crate::privileges::PrivilegeTag;

    fn month(key: &str) -> Month {
        key.parse().unwrap()
    }

    fn setup() -> (Connection, Member, Member) {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let pioneer = Privilege::new("Regular Pioneer");
        insert_privilege(&conn, &pioneer).unwrap();

        let ana = Member::new("Ana Souza", Gender::Female, Role::Pioneer).with_privilege(&pioneer.id);
        let bruno = Member::new("Bruno Costa", Gender::Male, Role::Publisher);
        insert_member(&conn, &ana).unwrap();
        insert_member(&conn, &bruno).unwrap();

        insert_reports(
            &conn,
            &[
                FieldServiceReport::new(&bruno.id, month("2024-12")).with_hours(3.0),
                FieldServiceReport::new(&ana.id, month("2024-12")).with_hours(50.0),
                FieldServiceReport::new(&ana.id, month("2024-11")).with_hours(48.0),
                FieldServiceReport::new(&ana.id, month("2025-01")).with_hours(51.0),
                FieldServiceReport::new(&bruno.id, month("2025-03")).with_hours(2.0),
            ],
        )
        .unwrap();

        (conn, ana, bruno)
    }

    #[test]
    fn test_range_is_inclusive_across_years() {
        let (conn, _, _) = setup();
        let range = MonthRange::parse("2024-11", "2025-01").unwrap();
        let reports = find_reports_in_range(&conn, &range, Publishers::Everyone).unwrap();

        let keys: Vec<String> = reports.iter().map(|r| r.report.month.to_string()).collect();
        assert_eq!(keys, vec!["2024-11", "2024-12", "2024-12", "2025-01"]);
        // same month: ordered by publisher name
        assert_eq!(reports[1].publisher.name, "Ana Souza");
        assert_eq!(reports[2].publisher.name, "Bruno Costa");
    }

    #[test]
    fn test_restricted_to_member_set() {
        let (conn, _, bruno) = setup();
        let range = MonthRange::parse("2024-01", "2025-12").unwrap();
        let ids = vec![bruno.id.clone()];
        let reports = find_reports_in_range(&conn, &range, Publishers::Only(&ids)).unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.publisher.id == bruno.id));
    }

    #[test]
    fn test_empty_member_set_fetches_nothing() {
        let (conn, _, _) = setup();
        let range = MonthRange::parse("2024-01", "2025-12").unwrap();
        let reports = find_reports_in_range(&conn, &range, Publishers::Only(&[])).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_publisher_privileges_populated() {
        let (conn, ana, _) = setup();
        let range = MonthRange::parse("2024-11", "2024-11").unwrap();
        let reports = find_reports_in_range(&conn, &range, Publishers::Everyone).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].publisher.id, ana.id);
        assert!(reports[0].publisher.has_tag(PrivilegeTag::RegularPioneer));
        assert_eq!(reports[0].report.hours, Some(48.0));
    }
}
