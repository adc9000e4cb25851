// 🏷️ Privilege Classifier - Free-text privilege names → standing flags
//
// Privileges are stored as free text ("Regular Pioneer", "Regular Pioneer (Sister)", ...).
// Each name is matched case-insensitively by substring against every tag phrase, once,
// when the privilege is created. A name may carry several tags. Aggregation only ever
// reads the resulting tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PRIVILEGE TAG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeTag {
    Elder,
    MinisterialServant,
    RegularPioneer,
    AuxiliaryPioneer,
    SpecialPioneer,
    OtherSheep,
    Anointed,
    FieldMissionary,
}

impl PrivilegeTag {
    pub const ALL: [PrivilegeTag; 8] = [
        PrivilegeTag::SpecialPioneer,
        PrivilegeTag::RegularPioneer,
        PrivilegeTag::AuxiliaryPioneer,
        PrivilegeTag::FieldMissionary,
        PrivilegeTag::MinisterialServant,
        PrivilegeTag::Elder,
        PrivilegeTag::Anointed,
        PrivilegeTag::OtherSheep,
    ];

    /// Storage name (also the serde name)
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegeTag::Elder => "elder",
            PrivilegeTag::MinisterialServant => "ministerial_servant",
            PrivilegeTag::RegularPioneer => "regular_pioneer",
            PrivilegeTag::AuxiliaryPioneer => "auxiliary_pioneer",
            PrivilegeTag::SpecialPioneer => "special_pioneer",
            PrivilegeTag::OtherSheep => "other_sheep",
            PrivilegeTag::Anointed => "anointed",
            PrivilegeTag::FieldMissionary => "field_missionary",
        }
    }

    /// The lowercase phrase this tag is recognised by inside a privilege name
    pub fn pattern(&self) -> &'static str {
        match self {
            PrivilegeTag::Elder => "elder",
            PrivilegeTag::MinisterialServant => "ministerial servant",
            PrivilegeTag::RegularPioneer => "regular pioneer",
            PrivilegeTag::AuxiliaryPioneer => "auxiliary pioneer",
            PrivilegeTag::SpecialPioneer => "special pioneer",
            PrivilegeTag::OtherSheep => "other sheep",
            PrivilegeTag::Anointed => "anointed",
            PrivilegeTag::FieldMissionary => "field missionary",
        }
    }
}

impl fmt::Display for PrivilegeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivilegeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrivilegeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown privilege tag '{}'", s))
    }
}

/// Every tag whose phrase occurs in `name` (case-insensitive substring), in `ALL` order.
///
/// Compound names such as "Elder / Regular Pioneer" carry several tags.
pub fn classify_privilege(name: &str) -> Vec<PrivilegeTag> {
    let lower = name.to_lowercase();
    PrivilegeTag::ALL
        .iter()
        .copied()
        .filter(|tag| lower.contains(tag.pattern()))
        .collect()
}

// ============================================================================
// PRIVILEGE FLAGS
// ============================================================================

/// Boolean standing flags for one member.
///
/// "Auxiliary pioneer" has two meanings and both are kept:
/// - `standing_auxiliary_pioneer`: the member holds an auxiliary-pioneer privilege
/// - `reported_auxiliary_pioneer`: at least one report in the requested range was
///   submitted with the auxiliary-pioneer flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeFlags {
    pub elder: bool,
    pub ministerial_servant: bool,
    pub regular_pioneer: bool,
    pub special_pioneer: bool,
    pub field_missionary: bool,
    pub anointed: bool,
    pub other_sheep: bool,
    pub standing_auxiliary_pioneer: bool,
    pub reported_auxiliary_pioneer: bool,
}

impl PrivilegeFlags {
    /// Standing flags from already-classified tags.
    ///
    /// Other sheep is the unmarked class: true when tagged, and also for anyone not anointed.
    pub fn from_tags<I>(tags: I) -> Self
    where
        I: IntoIterator<Item = PrivilegeTag>,
    {
        let mut flags = PrivilegeFlags::default();
        let mut tagged_other_sheep = false;

        for tag in tags {
            match tag {
                PrivilegeTag::Elder => flags.elder = true,
                PrivilegeTag::MinisterialServant => flags.ministerial_servant = true,
                PrivilegeTag::RegularPioneer => flags.regular_pioneer = true,
                PrivilegeTag::AuxiliaryPioneer => flags.standing_auxiliary_pioneer = true,
                PrivilegeTag::SpecialPioneer => flags.special_pioneer = true,
                PrivilegeTag::FieldMissionary => flags.field_missionary = true,
                PrivilegeTag::Anointed => flags.anointed = true,
                PrivilegeTag::OtherSheep => tagged_other_sheep = true,
            }
        }

        flags.other_sheep = tagged_other_sheep || !flags.anointed;
        flags
    }

    /// Attach the monthly auxiliary-pioneer flag derived from reports
    pub fn with_reported_auxiliary(mut self, reported: bool) -> Self {
        self.reported_auxiliary_pioneer = reported;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
