//! Roster ingestion: sheet rows in, normalized participants out.
//!
//! The registration form was revised several times, so one logical field may
//! live under any of a few column headers. Each field carries its ordered alias
//! list and rows are resolved once here; nothing downstream sees raw headers.

use core::{
    fmt,
    ops::{Index, IndexMut},
};
use std::{fs::File, io::BufReader, path::Path};

use compact_str::CompactString;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use unicase::UniCase;

use crate::platform::Platform;

const TARGET: &str = "roster";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Department,
    Section,
    TeamName,
    TeamLead,
    Batch,
    Profile(Platform),
}

impl Field {
    /// Accepted headers, most recent form revision first.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Name => &["Full Name", "Name"],
            Self::Email => &["Email Address", "Email ID"],
            Self::Department => &["Department"],
            Self::Section => &["Section"],
            Self::TeamName => &["Team Name"],
            Self::TeamLead => &["Team Lead"],
            Self::Batch => &["Batch"],
            Self::Profile(Platform::LeetCode) => &[
                "LeetCode Profile URL",
                "LeetCode ID (eg: Gfz6n0WdOg or https://leetcode.com/u/Gfz6n0WdOg/)",
            ],
            Self::Profile(Platform::SkillRack) => &["SkillRack Profile URL", "Skillrack Profile URL"],
            Self::Profile(Platform::CodeChef) => &["CodeChef Profile URL"],
            Self::Profile(Platform::HackerRank) => &["HackerRank Profile URL", "Hackerrank Profile URL"],
            Self::Profile(Platform::GitHub) => &["GitHub Profile URL"],
        }
    }

    pub const fn default_value(self) -> &'static str {
        match self {
            Self::Department => "AIML",
            Self::Section => "A",
            Self::TeamName => "ByteBreakers",
            _ => "",
        }
    }
}

/// One sheet row: trimmed header -> trimmed cell.
#[derive(Debug, Default)]
pub struct Row(HashMap<UniCase<CompactString>, String>);

impl Row {
    pub fn from_record(record: Map<String, Value>) -> Self {
        let cells = record
            .into_iter()
            .map(|(header, value)| {
                let cell = match value {
                    Value::String(s) => s.trim().to_owned(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (UniCase::new(CompactString::new(header.trim())), cell)
            })
            .collect();
        Self(cells)
    }

    /// First non-empty cell among the field's aliases, else its default.
    pub fn get(&self, field: Field) -> &str {
        field
            .aliases()
            .iter()
            .filter_map(|alias| self.0.get(&UniCase::new(CompactString::new(*alias))))
            .map(String::as_str)
            .find(|cell| !cell.is_empty())
            .unwrap_or_else(|| field.default_value())
    }
}

/// Raw profile references, one per platform, as typed into the sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRefs(pub [String; 5]);

impl Index<Platform> for ProfileRefs {
    type Output = String;

    fn index(&self, platform: Platform) -> &String {
        &self.0[platform.index()]
    }
}

impl IndexMut<Platform> for ProfileRefs {
    fn index_mut(&mut self, platform: Platform) -> &mut String {
        &mut self.0[platform.index()]
    }
}

/// Position of a member in the department / section / team hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberPath {
    pub dept_id: String,
    pub section_id: String,
    pub team_id: String,
    pub member_id: String,
}

impl MemberPath {
    /// Flat key used by the snapshot table.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.dept_id, self.section_id, self.team_id, self.member_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub path: MemberPath,
    pub name: String,
    pub email: String,
    pub profiles: ProfileRefs,
}

/// A participant plus the hierarchy metadata the store upserts with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub participant: Participant,
    pub department: String,
    pub section: String,
    pub team_name: String,
    pub team_display_name: String,
    pub team_lead: String,
    pub is_team_lead: bool,
    pub batch: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Skip {
    NoName,
    NoTeamLead(String),
}

impl RosterEntry {
    pub fn from_row(row: &Row) -> Result<Self, Skip> {
        let name = row.get(Field::Name);
        if name.is_empty() {
            return Err(Skip::NoName);
        }
        let team_lead = row.get(Field::TeamLead);
        if team_lead.is_empty() {
            return Err(Skip::NoTeamLead(name.to_owned()));
        }

        let department = row.get(Field::Department);
        let section = row.get(Field::Section);
        let team_name = row.get(Field::TeamName);
        let batch = row.get(Field::Batch);

        let mut profiles = ProfileRefs::default();
        for p in Platform::ALL {
            row.get(Field::Profile(p)).clone_into(&mut profiles[p]);
        }

        Ok(Self {
            participant: Participant {
                path: MemberPath {
                    dept_id: department.to_uppercase(),
                    section_id: format!("Section_{}", section.to_uppercase()),
                    team_id: format!("{team_name}_{team_lead}").replace(' ', "_"),
                    member_id: name.replace(' ', "_"),
                },
                name: name.to_owned(),
                email: row.get(Field::Email).to_owned(),
                profiles,
            },
            department: department.to_owned(),
            section: section.to_owned(),
            team_name: team_name.to_owned(),
            team_display_name: format!("{team_name} - {team_lead}"),
            team_lead: team_lead.to_owned(),
            is_team_lead: name.to_lowercase() == team_lead.to_lowercase(),
            batch: (!batch.is_empty()).then(|| batch.to_owned()),
        })
    }
}

/// Resolves every row, logging and dropping the unusable ones.
pub fn ingest(rows: impl IntoIterator<Item = Row>) -> Vec<RosterEntry> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(idx, row)| match RosterEntry::from_row(&row) {
            Ok(entry) => Some(entry),
            Err(Skip::NoName) => {
                tracing::debug!(target: TARGET, "row {}: no name, skipped", idx + 1);
                None
            }
            Err(Skip::NoTeamLead(name)) => {
                tracing::warn!(target: TARGET, "skipping {name}: no team lead assigned");
                None
            }
        })
        .collect()
}

/// Sheet export: a JSON array of row objects keyed by header.
pub fn parse_rows(json: &str) -> serde_json::Result<Vec<Row>> {
    let records = serde_json::from_str::<Vec<Map<String, Value>>>(json)?;
    Ok(records.into_iter().map(Row::from_record).collect())
}

pub fn load(path: &Path) -> anyhow::Result<Vec<RosterEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let records = serde_json::from_reader::<_, Vec<Map<String, Value>>>(reader)?;
    let entries = ingest(records.into_iter().map(Row::from_record));
    tracing::info!(target: TARGET, "read {} members from {}", entries.len(), path.display());
    Ok(entries)
}
