// Entity Models
// Members, the privilege and group catalogs, and monthly field-service reports.
//
// Each entity has:
// - Stable identity (UUID string) assigned at creation
// - Plain values, read-only for the reporting core
// - A "record" shape with relations resolved, as the lookups return it

pub mod group;
pub mod member;
pub mod privilege;
pub mod service_report;

pub use group::Group;
pub use member::{Gender, Member, MemberRecord, Role};
pub use privilege::{Privilege, PrivilegeRef};
pub use service_report::{FieldServiceReport, PublisherRef, ReportWithPublisher};
