//! Rankings over each member's most recent snapshot.

use core::cmp::Reverse;

use hashbrown::HashMap;
use serde::Serialize;

use crate::{db::MemberStanding, platform::PlatformCounts, roster::MemberPath};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub path: MemberPath,
    pub name: String,
    /// Problems across every platform but GitHub.
    pub total_solved: u32,
    pub totals: PlatformCounts,
    pub is_team_lead: bool,
    pub assigned_team_lead: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub dept_id: String,
    pub section_id: String,
    pub team_id: String,
    pub members: usize,
    pub total_solved: u32,
    /// Rounded half up.
    pub avg_per_member: u32,
    pub top_performer: String,
    pub top_performer_score: u32,
    pub team_lead_name: Option<String>,
    pub team_lead_score: u32,
}

/// Keeps the newest standing per member, then orders team leads first and
/// by problems solved.
fn latest_by_member(standings: &[MemberStanding]) -> Vec<&MemberStanding> {
    let mut latest = HashMap::<&MemberPath, &MemberStanding>::new();
    for s in standings {
        latest
            .entry(&s.path)
            .and_modify(|cur| {
                if s.snapshot.date > cur.snapshot.date {
                    *cur = s;
                }
            })
            .or_insert(s);
    }
    let mut latest = latest.into_values().collect::<Vec<_>>();
    latest.sort_by(|a, b| {
        b.is_team_lead
            .cmp(&a.is_team_lead)
            .then_with(|| b.snapshot.totals.problems().cmp(&a.snapshot.totals.problems()))
            .then_with(|| a.name.cmp(&b.name))
    });
    latest
}

pub fn leaderboard(standings: &[MemberStanding]) -> Vec<LeaderboardRow> {
    latest_by_member(standings)
        .into_iter()
        .enumerate()
        .map(|(i, s)| LeaderboardRow {
            rank: i + 1,
            path: s.path.clone(),
            name: s.name.clone(),
            total_solved: s.snapshot.totals.problems(),
            totals: s.snapshot.totals,
            is_team_lead: s.is_team_lead,
            assigned_team_lead: s.assigned_team_lead.clone(),
        })
        .collect()
}

pub fn team_comparison(standings: &[MemberStanding]) -> Vec<TeamSummary> {
    let mut groups = HashMap::<(&str, &str, &str), Vec<&MemberStanding>>::new();
    for s in latest_by_member(standings) {
        let p = &s.path;
        groups.entry((&*p.dept_id, &*p.section_id, &*p.team_id)).or_default().push(s);
    }

    let mut out = groups
        .into_iter()
        .map(|((dept_id, section_id, team_id), members)| {
            let total = members.iter().map(|m| m.snapshot.totals.problems()).sum::<u32>();
            let n = members.len();
            let top = members.iter().max_by_key(|m| (m.snapshot.totals.problems(), Reverse(&m.name)));
            let lead = members.iter().find(|m| m.is_team_lead);
            TeamSummary {
                dept_id: dept_id.to_owned(),
                section_id: section_id.to_owned(),
                team_id: team_id.to_owned(),
                members: n,
                total_solved: total,
                avg_per_member: ((2 * u64::from(total) + n as u64) / (2 * n as u64)) as u32,
                top_performer: top.map(|m| m.name.clone()).unwrap_or_default(),
                top_performer_score: top.map_or(0, |m| m.snapshot.totals.problems()),
                team_lead_name: lead.map(|m| m.name.clone()),
                team_lead_score: lead.map_or(0, |m| m.snapshot.totals.problems()),
            }
        })
        .collect::<Vec<_>>();

    out.sort_by(|a, b| {
        b.total_solved
            .cmp(&a.total_solved)
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::delta::DailySnapshot;

    fn standing(team: &str, name: &str, lead: bool, day: u32, totals: [u32; 5]) -> MemberStanding {
        MemberStanding {
            path: MemberPath {
                dept_id: "CSE".to_owned(),
                section_id: "Section_A".to_owned(),
                team_id: team.to_owned(),
                member_id: name.replace(' ', "_"),
            },
            name: name.to_owned(),
            is_team_lead: lead,
            assigned_team_lead: String::new(),
            snapshot: DailySnapshot {
                date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                totals: PlatformCounts(totals),
                deltas: PlatformCounts::ZERO,
                scraped_at: Utc::now(),
            },
        }
    }

    fn sample() -> Vec<MemberStanding> {
        vec![
            standing("Alpha", "Asha", true, 2, [10, 5, 0, 0, 90]),
            standing("Alpha", "Ben", false, 1, [100, 0, 0, 0, 0]),
            standing("Alpha", "Ben", false, 2, [120, 0, 0, 0, 0]),
            standing("Alpha", "Cleo", false, 2, [20, 20, 5, 5, 1]),
            standing("Beta", "Dev", true, 2, [3, 0, 0, 0, 0]),
        ]
    }

    #[test]
    fn leads_first_then_problems_without_repos() {
        let board = leaderboard(&sample());
        let order = board.iter().map(|r| (r.rank, r.name.as_str(), r.total_solved)).collect::<Vec<_>>();
        assert_eq!(order, [(1, "Asha", 15), (2, "Dev", 3), (3, "Ben", 120), (4, "Cleo", 50)]);
    }

    #[test]
    fn teams_grouped_and_sorted_by_total() {
        let teams = team_comparison(&sample());
        assert_eq!(teams.len(), 2);

        let alpha = &teams[0];
        assert_eq!(alpha.team_id, "Alpha");
        assert_eq!(alpha.members, 3);
        assert_eq!(alpha.total_solved, 185);
        assert_eq!(alpha.avg_per_member, 62);
        assert_eq!(alpha.top_performer, "Ben");
        assert_eq!(alpha.top_performer_score, 120);
        assert_eq!(alpha.team_lead_name.as_deref(), Some("Asha"));
        assert_eq!(alpha.team_lead_score, 15);

        assert_eq!(teams[1].team_id, "Beta");
        assert_eq!(teams[1].avg_per_member, 3);
    }

    #[test]
    fn average_rounds_half_up() {
        let teams = team_comparison(&[
            standing("G", "A", false, 1, [1, 0, 0, 0, 0]),
            standing("G", "B", false, 1, [2, 0, 0, 0, 0]),
        ]);
        assert_eq!(teams[0].avg_per_member, 2);
        assert_eq!(teams[0].team_lead_name, None);
    }
}
