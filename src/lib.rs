// Congregation Reports - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod month;
pub mod privileges;
pub mod entities;
pub mod db;
pub mod directory;   // Member Directory Lookup + filter options
pub mod fetcher;     // Report Range Fetcher
pub mod aggregation; // Field service + pioneer summary reports
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::InputError;
pub use month::{Month, MonthRange};
pub use privileges::{classify_privilege, PrivilegeFlags, PrivilegeTag};
pub use entities::{
    FieldServiceReport, Gender, Group, Member, MemberRecord, Privilege, PrivilegeRef,
    PublisherRef, ReportWithPublisher, Role,
};
pub use db::{
    count_members, count_reports, import_members, insert_group, insert_member,
    insert_privilege, insert_report, insert_reports, load_members_csv, load_reports_csv,
    open_database, setup_database,
};
pub use directory::{
    filter_options, find_members, find_members_with_tag, FilterOption, FilterOptions,
    MemberFilter,
};
pub use fetcher::{find_reports_in_range, Publishers};
pub use aggregation::{
    FieldServiceSummary, MemberReportSheet, MonthBucket, PioneerRangeTotals,
    PioneerSummaryReport, PioneerTotals, ReportEngine, ReportFilters, ReportRequest,
    ReportRow, ReportSummary, SheetTotals,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
