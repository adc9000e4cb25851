// 📊 Aggregation Engine - Field service summaries and S-21 style member sheets
//
// Two reports:
//   generate_field_service_report  - member-scoped: filter → members → reports → summary + sheets
//   generate_pioneer_summary_report - pioneer-scoped, bucketed by calendar month
//
// Every call recomputes from raw rows. Nothing is written. The member lookup and the
// report fetch are separate reads, so a report stored between the two may or may not be
// counted; reports are not point-in-time consistent and do not need to be.

use crate::directory::{find_members, find_members_with_tag, MemberFilter};
use crate::entities::{FieldServiceReport, Gender, MemberRecord, ReportWithPublisher, Role};
use crate::error::InputError;
use crate::fetcher::{find_reports_in_range, Publishers};
use crate::month::{Month, MonthRange};
use crate::privileges::{PrivilegeFlags, PrivilegeTag};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ============================================================================
// REPORT FILTERS
// ============================================================================

/// Validated input of the field service report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ReportRequest", try_from = "ReportRequest")]
pub struct ReportFilters {
    pub range: MonthRange,
    pub member_filter: MemberFilter,
}

/// Wire shape of the filters: `{startMonth, endMonth, filterType, filterValue?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub start_month: String,
    pub end_month: String,
    pub filter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_value: Option<String>,
}

impl ReportFilters {
    pub fn new(range: MonthRange, member_filter: MemberFilter) -> Self {
        ReportFilters {
            range,
            member_filter,
        }
    }

    pub fn parse(
        start_month: &str,
        end_month: &str,
        filter_type: &str,
        filter_value: Option<&str>,
    ) -> Result<Self, InputError> {
        Ok(ReportFilters::new(
            MonthRange::parse(start_month, end_month)?,
            MemberFilter::parse(filter_type, filter_value)?,
        ))
    }
}

impl TryFrom<ReportRequest> for ReportFilters {
    type Error = InputError;

    fn try_from(request: ReportRequest) -> Result<Self, Self::Error> {
        ReportFilters::parse(
            &request.start_month,
            &request.end_month,
            &request.filter_type,
            request.filter_value.as_deref(),
        )
    }
}

impl From<ReportFilters> for ReportRequest {
    fn from(filters: ReportFilters) -> Self {
        ReportRequest {
            start_month: filters.range.start().to_string(),
            end_month: filters.range.end().to_string(),
            filter_type: filters.member_filter.filter_type().to_string(),
            filter_value: filters.member_filter.filter_value().map(str::to_string),
        }
    }
}

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Count of reporting members (or reports) with their summed hours and studies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTotals {
    pub count: usize,
    pub total_hours: f64,
    pub total_bible_studies: u64,
}

impl ClassTotals {
    fn add_report(&mut self, report: &FieldServiceReport) {
        self.count += 1;
        self.total_hours += report.hours_or_zero();
        self.total_bible_studies += u64::from(report.bible_students);
    }

    fn add_member(&mut self, totals: &SheetTotals) {
        self.count += 1;
        self.total_hours += totals.hours;
        self.total_bible_studies += totals.bible_studies;
    }

    fn merge(&mut self, other: &ClassTotals) {
        self.count += other.count;
        self.total_hours += other.total_hours;
        self.total_bible_studies += other.total_bible_studies;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PioneerTotals {
    pub regular_pioneers: ClassTotals,
    pub auxiliary_pioneers: ClassTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_members: usize,
    pub total_reports: usize,
    pub total_hours: f64,
    pub total_bible_studies: u64,
    /// totalHours / totalMembers (0 for no members)
    pub average_hours: f64,
    /// totalReports / totalMembers × 100 (0 for no members)
    pub reporting_percentage: f64,
    pub pioneer_totals: PioneerTotals,
}

/// One month line on a member sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub month: Month,
    pub hours: Option<f64>,
    pub bible_studies: u32,
    pub auxiliary_pioneer: bool,
    pub comments: Option<String>,
}

impl From<&FieldServiceReport> for ReportRow {
    fn from(report: &FieldServiceReport) -> Self {
        ReportRow {
            month: report.month,
            hours: report.hours,
            bible_studies: report.bible_students,
            auxiliary_pioneer: report.auxiliary_pioneer,
            comments: report.comments.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetTotals {
    pub hours: f64,
    pub bible_studies: u64,
}

/// Per-member sheet: identity, standing flags, in-range months and their totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberReportSheet {
    pub member_id: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub baptism_date: Option<NaiveDate>,
    pub gender: Gender,
    pub role: Role,
    pub group_name: Option<String>,
    pub privilege_names: Vec<String>,
    pub privileges: PrivilegeFlags,
    pub reports: Vec<ReportRow>,
    pub totals: SheetTotals,
}

impl MemberReportSheet {
    /// Build a sheet from the member and their in-range reports (already in month order)
    fn build(member: &MemberRecord, reports: &[&FieldServiceReport]) -> Self {
        let reported_auxiliary = reports.iter().any(|r| r.auxiliary_pioneer);
        let totals = SheetTotals {
            hours: reports.iter().map(|r| r.hours_or_zero()).sum(),
            bible_studies: reports.iter().map(|r| u64::from(r.bible_students)).sum(),
        };

        MemberReportSheet {
            member_id: member.id.clone(),
            name: member.name.clone(),
            date_of_birth: member.date_of_birth,
            baptism_date: member.baptism_date,
            gender: member.gender,
            role: member.role,
            group_name: member.group_name.clone(),
            privilege_names: member.privileges.iter().map(|p| p.name.clone()).collect(),
            privileges: member
                .standing_flags()
                .with_reported_auxiliary(reported_auxiliary),
            reports: reports.iter().map(|r| ReportRow::from(*r)).collect(),
            totals,
        }
    }
}

/// Output of the field service report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldServiceSummary {
    pub summary: ReportSummary,
    pub member_reports: Vec<MemberReportSheet>,
    pub filters: ReportFilters,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub month: Month,
    pub regular_pioneers: ClassTotals,
    pub auxiliary_pioneers: ClassTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PioneerRangeTotals {
    pub regular_pioneers: ClassTotals,
    pub auxiliary_pioneers: ClassTotals,
    pub month_count: usize,
    /// Σ monthly regular-pioneer counts / number of months
    pub average_regular_pioneers: f64,
    /// Σ monthly auxiliary-pioneer counts / number of months
    pub average_auxiliary_pioneers: f64,
}

/// Output of the pioneer summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PioneerSummaryReport {
    pub months: Vec<MonthBucket>,
    pub totals: PioneerRangeTotals,
    pub regular_pioneer_reports: Vec<MemberReportSheet>,
    pub auxiliary_pioneer_reports: Vec<MemberReportSheet>,
    pub filters: MonthRange,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
}

// ============================================================================
// REPORT ENGINE
// ============================================================================

/// Read-only report generation over one database connection
pub struct ReportEngine<'c> {
    conn: &'c Connection,
}

impl<'c> ReportEngine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        ReportEngine { conn }
    }

    /// Summary statistics plus one sheet per member for the filtered member set.
    ///
    /// All-or-nothing: any lookup failure is returned, no partial report.
    pub fn generate_field_service_report(
        &self,
        filters: &ReportFilters,
        generated_by: &str,
    ) -> Result<FieldServiceSummary> {
        let members = find_members(self.conn, &filters.member_filter)?;
        let ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();
        let reports = find_reports_in_range(self.conn, &filters.range, Publishers::Only(&ids))?;

        let (summary, member_reports) = summarize(&members, &reports);

        info!(
            generated_by,
            filter_type = filters.member_filter.filter_type(),
            start = %filters.range.start(),
            end = %filters.range.end(),
            members = summary.total_members,
            reports = summary.total_reports,
            "generated field service report"
        );

        Ok(FieldServiceSummary {
            summary,
            member_reports,
            filters: filters.clone(),
            generated_at: Utc::now(),
            generated_by: generated_by.to_string(),
        })
    }

    /// Regular and auxiliary pioneer activity per calendar month across `range`
    pub fn generate_pioneer_summary_report(
        &self,
        range: &MonthRange,
        generated_by: &str,
    ) -> Result<PioneerSummaryReport> {
        let regular_pioneers = find_members_with_tag(self.conn, PrivilegeTag::RegularPioneer)?;
        let reports = find_reports_in_range(self.conn, range, Publishers::Everyone)?;

        let months = bucket_by_month(range, &reports);
        let totals = range_totals(&months);

        let by_publisher = group_by_publisher(&reports);
        let regular_pioneer_reports: Vec<MemberReportSheet> = regular_pioneers
            .iter()
            .map(|member| sheet_for(member, &by_publisher))
            .collect();

        let auxiliary_ids = auxiliary_publishers(&reports);
        let auxiliary_pioneer_reports = if auxiliary_ids.is_empty() {
            Vec::new()
        } else {
            let directory: HashMap<String, MemberRecord> = find_members(self.conn, &MemberFilter::All)?
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect();

            auxiliary_ids
                .iter()
                .filter_map(|id| match directory.get(*id) {
                    Some(member) => Some(sheet_for(member, &by_publisher)),
                    None => {
                        warn!(publisher_id = %id, "auxiliary pioneer no longer in directory, skipping sheet");
                        None
                    }
                })
                .collect()
        };

        info!(
            generated_by,
            start = %range.start(),
            end = %range.end(),
            months = totals.month_count,
            regular_pioneers = regular_pioneer_reports.len(),
            auxiliary_pioneers = auxiliary_pioneer_reports.len(),
            "generated pioneer summary"
        );

        Ok(PioneerSummaryReport {
            months,
            totals,
            regular_pioneer_reports,
            auxiliary_pioneer_reports,
            filters: *range,
            generated_at: Utc::now(),
            generated_by: generated_by.to_string(),
        })
    }
}

// ============================================================================
// PURE TRANSFORMS
// ============================================================================

/// Reports grouped per publisher id, preserving fetch (month) order
fn group_by_publisher(reports: &[ReportWithPublisher]) -> HashMap<&str, Vec<&FieldServiceReport>> {
    let mut by_publisher: HashMap<&str, Vec<&FieldServiceReport>> = HashMap::new();
    for entry in reports {
        by_publisher
            .entry(entry.publisher.id.as_str())
            .or_default()
            .push(&entry.report);
    }
    by_publisher
}

fn sheet_for(
    member: &MemberRecord,
    by_publisher: &HashMap<&str, Vec<&FieldServiceReport>>,
) -> MemberReportSheet {
    let own = by_publisher
        .get(member.id.as_str())
        .map(Vec::as_slice)
        .unwrap_or_default();
    MemberReportSheet::build(member, own)
}

/// Summary and sheets for an already-resolved member set and its in-range reports
fn summarize(
    members: &[MemberRecord],
    reports: &[ReportWithPublisher],
) -> (ReportSummary, Vec<MemberReportSheet>) {
    let total_members = members.len();
    let total_reports = reports.len();
    let total_hours: f64 = reports.iter().map(|r| r.report.hours_or_zero()).sum();
    let total_bible_studies: u64 = reports
        .iter()
        .map(|r| u64::from(r.report.bible_students))
        .sum();

    let (average_hours, reporting_percentage) = if total_members == 0 {
        (0.0, 0.0)
    } else {
        (
            total_hours / total_members as f64,
            total_reports as f64 / total_members as f64 * 100.0,
        )
    };

    let by_publisher = group_by_publisher(reports);
    let mut pioneer_totals = PioneerTotals::default();
    let mut sheets = Vec::with_capacity(total_members);

    for member in members {
        let sheet = sheet_for(member, &by_publisher);

        // standing privilege for regular pioneers, monthly report flag for auxiliary
        if member.has_tag(PrivilegeTag::RegularPioneer) {
            pioneer_totals.regular_pioneers.add_member(&sheet.totals);
        }
        if sheet.privileges.reported_auxiliary_pioneer {
            pioneer_totals.auxiliary_pioneers.add_member(&sheet.totals);
        }

        sheets.push(sheet);
    }

    debug!(
        total_members,
        total_reports,
        regular_pioneers = pioneer_totals.regular_pioneers.count,
        auxiliary_pioneers = pioneer_totals.auxiliary_pioneers.count,
        "summarized reports"
    );

    let summary = ReportSummary {
        total_members,
        total_reports,
        total_hours,
        total_bible_studies,
        average_hours,
        reporting_percentage,
        pioneer_totals,
    };

    (summary, sheets)
}

/// One bucket per calendar month in range, in order, each partitioned into regular
/// pioneer reports (publisher holds a regular-pioneer privilege) and auxiliary pioneer
/// reports (flag set on the report)
fn bucket_by_month(range: &MonthRange, reports: &[ReportWithPublisher]) -> Vec<MonthBucket> {
    let mut by_month: HashMap<Month, Vec<&ReportWithPublisher>> = HashMap::new();
    for entry in reports {
        by_month.entry(entry.report.month).or_default().push(entry);
    }

    range
        .months()
        .map(|month| {
            let mut bucket = MonthBucket {
                month,
                regular_pioneers: ClassTotals::default(),
                auxiliary_pioneers: ClassTotals::default(),
            };

            for entry in by_month.get(&month).map(Vec::as_slice).unwrap_or_default() {
                if entry.publisher.has_tag(PrivilegeTag::RegularPioneer) {
                    bucket.regular_pioneers.add_report(&entry.report);
                }
                if entry.report.auxiliary_pioneer {
                    bucket.auxiliary_pioneers.add_report(&entry.report);
                }
            }

            bucket
        })
        .collect()
}

fn range_totals(months: &[MonthBucket]) -> PioneerRangeTotals {
    let mut regular_pioneers = ClassTotals::default();
    let mut auxiliary_pioneers = ClassTotals::default();
    for bucket in months {
        regular_pioneers.merge(&bucket.regular_pioneers);
        auxiliary_pioneers.merge(&bucket.auxiliary_pioneers);
    }

    let month_count = months.len();
    let average = |count: usize| {
        if month_count == 0 {
            0.0
        } else {
            count as f64 / month_count as f64
        }
    };

    PioneerRangeTotals {
        average_regular_pioneers: average(regular_pioneers.count),
        average_auxiliary_pioneers: average(auxiliary_pioneers.count),
        regular_pioneers,
        auxiliary_pioneers,
        month_count,
    }
}

/// Distinct publishers with an auxiliary-pioneer report, in first-encounter order
fn auxiliary_publishers(reports: &[ReportWithPublisher]) -> Vec<&str> {
    let mut seen = HashSet::new();
    reports
        .iter()
        .filter(|entry| entry.report.auxiliary_pioneer)
        .map(|entry| entry.publisher.id.as_str())
        .filter(|id| seen.insert(*id))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
