// 📝 Field Service Report Entity - One submission per member per month
//
// `auxiliary_pioneer` is set at submission time: auxiliary pioneering is a month-by-month
// status recorded on the report, not a standing privilege of the member.

use crate::entities::privilege::PrivilegeRef;
use crate::month::Month;
use crate::privileges::PrivilegeTag;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldServiceReport {
    pub id: String,
    pub publisher_id: String,

    /// Unique per publisher
    pub month: Month,

    /// Meaningful mainly for pioneers
    pub hours: Option<f64>,

    pub bible_students: u32,
    pub auxiliary_pioneer: bool,
    pub comments: Option<String>,
}

impl FieldServiceReport {
    pub fn new(publisher_id: impl Into<String>, month: Month) -> Self {
        FieldServiceReport {
            id: uuid::Uuid::new_v4().to_string(),
            publisher_id: publisher_id.into(),
            month,
            hours: None,
            bible_students: 0,
            auxiliary_pioneer: false,
            comments: None,
        }
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = Some(hours);
        self
    }

    pub fn with_bible_students(mut self, bible_students: u32) -> Self {
        self.bible_students = bible_students;
        self
    }

    pub fn as_auxiliary_pioneer(mut self) -> Self {
        self.auxiliary_pioneer = true;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Hours for summing (absent counts as zero)
    pub fn hours_or_zero(&self) -> f64 {
        self.hours.unwrap_or(0.0)
    }
}

// ============================================================================
// REPORT WITH PUBLISHER (range-fetch output)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherRef {
    pub id: String,
    pub name: String,
    pub privileges: Vec<PrivilegeRef>,
}

impl PublisherRef {
    pub fn has_tag(&self, tag: PrivilegeTag) -> bool {
        self.privileges.iter().any(|p| p.has_tag(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWithPublisher {
    pub report: FieldServiceReport,
    pub publisher: PublisherRef,
}
