// End-to-end report scenarios against a file-backed database

use congregation_reports::{
    find_members, insert_group, insert_member, insert_privilege, insert_reports, open_database,
    FieldServiceReport, Gender, Group, Member, MemberFilter, Month, MonthRange, Privilege,
    ReportEngine, ReportFilters, Role,
};
use rusqlite::Connection;
use tempfile::TempDir;

fn month(key: &str) -> Month {
    key.parse().unwrap()
}

fn open_temp() -> (TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_database(&dir.path().join("congregation.db")).unwrap();
    (dir, conn)
}

struct Congregation {
    elders: Vec<Member>,
    pioneer: Member,
    publisher: Member,
    north: Group,
    elder_privilege: Privilege,
}

/// Three elders (two report in June), a regular pioneer and a publisher who
/// auxiliary pioneers in July.
fn congregation(conn: &Connection) -> Congregation {
    let north = Group::new("North");
    insert_group(conn, &north).unwrap();

    let elder_privilege = Privilege::new("Elder");
    let pioneer_privilege = Privilege::new("Regular Pioneer");
    insert_privilege(conn, &elder_privilege).unwrap();
    insert_privilege(conn, &pioneer_privilege).unwrap();

    let elders: Vec<Member> = ["Carlos Lima", "Daniel Rocha", "Eduardo Alves"]
        .iter()
        .map(|name| {
            Member::new(*name, Gender::Male, Role::Elder)
                .with_privilege(&elder_privilege.id)
                .with_group(&north.id)
        })
        .collect();
    for elder in &elders {
        insert_member(conn, elder).unwrap();
    }

    let pioneer = Member::new("Ana Souza", Gender::Female, Role::Pioneer)
        .with_privilege(&pioneer_privilege.id)
        .with_group(&north.id);
    let publisher = Member::new("Bruno Costa", Gender::Male, Role::Publisher);
    insert_member(conn, &pioneer).unwrap();
    insert_member(conn, &publisher).unwrap();

    insert_reports(
        conn,
        &[
            FieldServiceReport::new(&elders[0].id, month("2024-06")).with_hours(10.0),
            FieldServiceReport::new(&elders[1].id, month("2024-06"))
                .with_hours(15.0)
                .with_bible_students(1),
            FieldServiceReport::new(&pioneer.id, month("2024-01")).with_hours(10.0),
            FieldServiceReport::new(&pioneer.id, month("2024-02")).with_hours(5.0),
            FieldServiceReport::new(&pioneer.id, month("2024-06"))
                .with_hours(50.0)
                .with_bible_students(3),
            FieldServiceReport::new(&publisher.id, month("2024-06")).with_hours(4.0),
            FieldServiceReport::new(&publisher.id, month("2024-07"))
                .with_hours(30.0)
                .as_auxiliary_pioneer(),
        ],
    )
    .unwrap();

    Congregation {
        elders,
        pioneer,
        publisher,
        north,
        elder_privilege,
    }
}

#[test]
fn elder_report_for_one_month() {
    let (_dir, conn) = open_temp();
    congregation(&conn);

    let filters = ReportFilters::parse("2024-06", "2024-06", "role", Some("elder")).unwrap();
    let report = ReportEngine::new(&conn)
        .generate_field_service_report(&filters, "secretary")
        .unwrap();

    let summary = &report.summary;
    assert_eq!(summary.total_members, 3);
    assert_eq!(summary.total_reports, 2);
    assert_eq!(summary.total_hours, 25.0);
    assert!((summary.average_hours - 8.33).abs() < 0.01);
    assert!((summary.reporting_percentage - 66.67).abs() < 0.01);

    // the elder without a report still gets an empty sheet
    assert_eq!(report.member_reports.len(), 3);
    let silent = report
        .member_reports
        .iter()
        .find(|s| s.name == "Eduardo Alves")
        .unwrap();
    assert!(silent.reports.is_empty());
    assert_eq!(silent.totals.hours, 0.0);
}

#[test]
fn total_members_matches_filter_cardinality() {
    let (_dir, conn) = open_temp();
    let c = congregation(&conn);
    let engine = ReportEngine::new(&conn);

    let cases = vec![
        ("all", None),
        ("role", Some("elder".to_string())),
        ("role", Some("pioneer".to_string())),
        ("group", Some(c.north.id.clone())),
        ("privilege", Some(c.elder_privilege.id.clone())),
        ("member", Some(c.publisher.id.clone())),
        ("member", Some("missing".to_string())),
    ];

    for (filter_type, value) in cases {
        let filters =
            ReportFilters::parse("2024-01", "2024-12", filter_type, value.as_deref()).unwrap();
        let expected = find_members(&conn, &filters.member_filter).unwrap().len();
        let report = engine.generate_field_service_report(&filters, "secretary").unwrap();

        assert_eq!(
            report.summary.total_members, expected,
            "filter {} {:?}",
            filter_type, value
        );
        assert_eq!(report.member_reports.len(), expected);
        if expected > 0 {
            assert_eq!(
                report.summary.average_hours,
                report.summary.total_hours / expected as f64
            );
        }
    }

    assert_eq!(
        find_members(&conn, &MemberFilter::Group(c.north.id.clone())).unwrap().len(),
        4
    );
}

#[test]
fn empty_member_set_yields_zeroes() {
    let (_dir, conn) = open_temp();
    congregation(&conn);

    let filters = ReportFilters::parse("2024-01", "2024-12", "role", Some("ministerial_servant")).unwrap();
    let report = ReportEngine::new(&conn)
        .generate_field_service_report(&filters, "secretary")
        .unwrap();

    let summary = &report.summary;
    assert_eq!(summary.total_members, 0);
    assert_eq!(summary.total_reports, 0);
    assert_eq!(summary.total_hours, 0.0);
    assert_eq!(summary.total_bible_studies, 0);
    assert_eq!(summary.average_hours, 0.0);
    assert_eq!(summary.reporting_percentage, 0.0);
    assert_eq!(summary.pioneer_totals.regular_pioneers.count, 0);
    assert!(report.member_reports.is_empty());
}

#[test]
fn empty_congregation() {
    let (_dir, conn) = open_temp();

    let filters = ReportFilters::parse("2024-01", "2024-12", "all", None).unwrap();
    let report = ReportEngine::new(&conn)
        .generate_field_service_report(&filters, "secretary")
        .unwrap();
    assert_eq!(report.summary.total_members, 0);
    assert!(report.member_reports.is_empty());

    let range = MonthRange::parse("2024-01", "2024-03").unwrap();
    let pioneers = ReportEngine::new(&conn)
        .generate_pioneer_summary_report(&range, "secretary")
        .unwrap();
    assert_eq!(pioneers.months.len(), 3);
    assert_eq!(pioneers.totals.average_regular_pioneers, 0.0);
    assert!(pioneers.regular_pioneer_reports.is_empty());
    assert!(pioneers.auxiliary_pioneer_reports.is_empty());
}

#[test]
fn repeated_generation_is_identical() {
    let (_dir, conn) = open_temp();
    congregation(&conn);
    let engine = ReportEngine::new(&conn);

    let filters = ReportFilters::parse("2024-01", "2024-07", "all", None).unwrap();
    let first = engine.generate_field_service_report(&filters, "secretary").unwrap();
    let second = engine.generate_field_service_report(&filters, "secretary").unwrap();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.member_reports, second.member_reports);
    assert_eq!(first.filters, second.filters);
}

#[test]
fn member_sheet_sums_months_in_order() {
    let (_dir, conn) = open_temp();
    let c = congregation(&conn);

    let filters =
        ReportFilters::parse("2024-01", "2024-02", "member", Some(c.pioneer.id.as_str())).unwrap();
    let report = ReportEngine::new(&conn)
        .generate_field_service_report(&filters, "secretary")
        .unwrap();

    assert_eq!(report.member_reports.len(), 1);
    let sheet = &report.member_reports[0];
    assert_eq!(sheet.totals.hours, 15.0);
    let months: Vec<Month> = sheet.reports.iter().map(|r| r.month).collect();
    assert_eq!(months, vec![month("2024-01"), month("2024-02")]);
    assert_eq!(sheet.reports[0].hours, Some(10.0));
    assert_eq!(sheet.reports[1].hours, Some(5.0));
    assert_eq!(sheet.group_name.as_deref(), Some("North"));
}

#[test]
fn pioneer_summary_walks_across_year_boundary() {
    let (_dir, conn) = open_temp();
    congregation(&conn);

    let range = MonthRange::parse("2024-11", "2025-02").unwrap();
    let report = ReportEngine::new(&conn)
        .generate_pioneer_summary_report(&range, "secretary")
        .unwrap();

    let months: Vec<String> = report.months.iter().map(|b| b.month.to_string()).collect();
    assert_eq!(months, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    assert_eq!(report.totals.month_count, 4);
}

#[test]
fn auxiliary_pioneer_follows_report_flag_only() {
    let (_dir, conn) = open_temp();
    let c = congregation(&conn);

    let range = MonthRange::parse("2024-06", "2024-07").unwrap();
    let report = ReportEngine::new(&conn)
        .generate_pioneer_summary_report(&range, "secretary")
        .unwrap();

    // Bruno holds no pioneer privilege but flagged July
    assert_eq!(report.auxiliary_pioneer_reports.len(), 1);
    let sheet = &report.auxiliary_pioneer_reports[0];
    assert_eq!(sheet.member_id, c.publisher.id);
    assert!(sheet.privileges.reported_auxiliary_pioneer);
    assert!(!sheet.privileges.standing_auxiliary_pioneer);

    // both in-range reports are attached, not only the flagged one
    assert_eq!(sheet.reports.len(), 2);
    assert_eq!(sheet.totals.hours, 34.0);

    let june = &report.months[0];
    let july = &report.months[1];
    assert_eq!(june.regular_pioneers.count, 1);
    assert_eq!(june.regular_pioneers.total_hours, 50.0);
    assert_eq!(june.auxiliary_pioneers.count, 0);
    assert_eq!(july.auxiliary_pioneers.count, 1);
    assert_eq!(july.auxiliary_pioneers.total_hours, 30.0);

    assert_eq!(report.totals.average_regular_pioneers, 0.5);
    assert_eq!(report.totals.average_auxiliary_pioneers, 0.5);

    assert_eq!(report.regular_pioneer_reports.len(), 1);
    assert_eq!(report.regular_pioneer_reports[0].member_id, c.pioneer.id);
    assert_eq!(report.regular_pioneer_reports[0].totals.bible_studies, 3);
    assert!(c.elders.iter().all(|e| e.id != c.pioneer.id));
}

#[test]
fn compound_privilege_counts_for_each_tag() {
    let (_dir, conn) = open_temp();
    let c = congregation(&conn);

    let compound = Privilege::new("Elder / Regular Pioneer");
    insert_privilege(&conn, &compound).unwrap();
    let felipe = Member::new("Felipe Nunes", Gender::Male, Role::Elder).with_privilege(&compound.id);
    insert_member(&conn, &felipe).unwrap();
    insert_reports(
        &conn,
        &[FieldServiceReport::new(&felipe.id, month("2024-06")).with_hours(52.0)],
    )
    .unwrap();

    let range = MonthRange::parse("2024-06", "2024-06").unwrap();
    let pioneers = ReportEngine::new(&conn)
        .generate_pioneer_summary_report(&range, "secretary")
        .unwrap();
    let regular: Vec<&str> = pioneers
        .regular_pioneer_reports
        .iter()
        .map(|s| s.member_id.as_str())
        .collect();
    assert_eq!(regular, vec![c.pioneer.id.as_str(), felipe.id.as_str()]);
    assert_eq!(pioneers.months[0].regular_pioneers.count, 2);
    assert_eq!(pioneers.months[0].regular_pioneers.total_hours, 102.0);

    let filters = ReportFilters::parse("2024-06", "2024-06", "member", Some(felipe.id.as_str())).unwrap();
    let report = ReportEngine::new(&conn)
        .generate_field_service_report(&filters, "secretary")
        .unwrap();
    let sheet = &report.member_reports[0];
    assert!(sheet.privileges.elder);
    assert!(sheet.privileges.regular_pioneer);
    assert_eq!(report.summary.pioneer_totals.regular_pioneers.count, 1);
}

#[test]
fn invalid_filters_are_rejected() {
    assert!(ReportFilters::parse("2024-13", "2024-12", "all", None).is_err());
    assert!(ReportFilters::parse("2024-06", "2024-01", "all", None).is_err());
    assert!(ReportFilters::parse("2024-01", "2024-06", "zone", Some("x")).is_err());
    assert!(ReportFilters::parse("2024-01", "2024-06", "role", None).is_err());
}
