use pulse::{
    leaderboard::{LeaderboardRow, TeamSummary},
    platform::{Measurement, Platform},
};

pub fn measurement(m: Measurement) -> String {
    m.map_or_else(|| "unknown".to_owned(), |n| n.to_string())
}

pub fn members(rows: &[LeaderboardRow]) {
    println!(
        "{:>4}  {:<28} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "#", "name", "solved", "LC", "SR", "CC", "HR", "repos"
    );
    for r in rows {
        let lead = if r.is_team_lead { " ★" } else { "" };
        println!(
            "{:>4}  {:<28} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
            r.rank,
            format!("{}{lead}", r.name),
            r.total_solved,
            r.totals[Platform::LeetCode],
            r.totals[Platform::SkillRack],
            r.totals[Platform::CodeChef],
            r.totals[Platform::HackerRank],
            r.totals[Platform::GitHub],
        );
    }
}

pub fn teams(teams: &[TeamSummary]) {
    println!(
        "{:<36} {:>7} {:>7} {:>7}  {:<24} {}",
        "team", "members", "solved", "avg", "top", "lead"
    );
    for t in teams {
        println!(
            "{:<36} {:>7} {:>7} {:>7}  {:<24} {}",
            format!("{}/{}/{}", t.dept_id, t.section_id, t.team_id),
            t.members,
            t.total_solved,
            t.avg_per_member,
            format!("{} ({})", t.top_performer, t.top_performer_score),
            t.team_lead_name
                .as_ref()
                .map_or_else(|| "-".to_owned(), |n| format!("{n} ({})", t.team_lead_score)),
        );
    }
}
