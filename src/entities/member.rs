// 🙋 Member Entity - Identity and standing record
//
// Members are created by administrative CRUD outside the reporting core.
// The reporting core only reads them, as MemberRecord (relations resolved).

use crate::entities::privilege::PrivilegeRef;
use crate::error::InputError;
use crate::privileges::{PrivilegeFlags, PrivilegeTag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLE / GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Publisher,
    Elder,
    MinisterialServant,
    Pioneer,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Publisher,
        Role::Elder,
        Role::MinisterialServant,
        Role::Pioneer,
    ];

    /// Storage name; role filters compare against this exactly
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Elder => "elder",
            Role::MinisterialServant => "ministerial_servant",
            Role::Pioneer => "pioneer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_key(s);
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| InputError::UnknownRole(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(InputError::UnknownGender(s.to_string())),
        }
    }
}

fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

// ============================================================================
// MEMBER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub baptism_date: Option<NaiveDate>,
    pub gender: Gender,
    pub role: Role,

    /// Privilege ids in the order they were granted (no duplicates)
    pub privilege_ids: Vec<String>,

    /// At most one group
    pub group_id: Option<String>,
}

impl Member {
    pub fn new(name: impl Into<String>, gender: Gender, role: Role) -> Self {
        Member {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            date_of_birth: None,
            baptism_date: None,
            gender,
            role,
            privilege_ids: Vec::new(),
            group_id: None,
        }
    }

    /// Grant a privilege (ignored when already held)
    pub fn add_privilege(&mut self, privilege_id: impl Into<String>) {
        let privilege_id = privilege_id.into();
        if !self.privilege_ids.contains(&privilege_id) {
            self.privilege_ids.push(privilege_id);
        }
    }

    pub fn with_privilege(mut self, privilege_id: impl Into<String>) -> Self {
        self.add_privilege(privilege_id);
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

// ============================================================================
// MEMBER RECORD (lookup output)
// ============================================================================

/// Member row as the directory lookup returns it: group and privilege names resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub baptism_date: Option<NaiveDate>,
    pub gender: Gender,
    pub role: Role,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub privileges: Vec<PrivilegeRef>,
}

impl MemberRecord {
    pub fn has_tag(&self, tag: PrivilegeTag) -> bool {
        self.privileges.iter().any(|p| p.has_tag(tag))
    }

    /// Standing flags from held privileges (no report-derived flags)
    pub fn standing_flags(&self) -> PrivilegeFlags {
        PrivilegeFlags::from_tags(self.privileges.iter().flat_map(|p| p.tags.iter().copied()))
    }

    pub fn privilege_names(&self) -> Vec<&str> {
        self.privileges.iter().map(|p| p.name.as_str()).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
