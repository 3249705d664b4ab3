use core::{
    fmt,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Platform {
    LeetCode,
    SkillRack,
    CodeChef,
    HackerRank,
    GitHub,
}

impl Platform {
    /// Fetch order within one participant.
    pub const ALL: [Self; 5] = [
        Self::LeetCode,
        Self::SkillRack,
        Self::CodeChef,
        Self::HackerRank,
        Self::GitHub,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::LeetCode => "LeetCode",
            Self::SkillRack => "SkillRack",
            Self::CodeChef => "CodeChef",
            Self::HackerRank => "HackerRank",
            Self::GitHub => "GitHub",
        }
    }

    pub const fn domain(self) -> &'static str {
        match self {
            Self::LeetCode => "leetcode.com",
            Self::SkillRack => "skillrack",
            Self::CodeChef => "codechef.com",
            Self::HackerRank => "hackerrank.com",
            Self::GitHub => "github.com",
        }
    }

    pub const fn emoji(self) -> &'static str {
        match self {
            Self::LeetCode => "🧠",
            Self::SkillRack => "🎯",
            Self::CodeChef => "🥇",
            Self::HackerRank => "🏅",
            Self::GitHub => "💻",
        }
    }

    /// GitHub counts repositories, everything else counts solved problems.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::GitHub => "Repos",
            _ => "Total",
        }
    }

    pub const fn counts_problems(self) -> bool {
        !matches!(self, Self::GitHub)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one probe: `None` when the platform could not be measured.
///
/// Kept apart from the persisted integer so a failed fetch and a genuine zero
/// stay distinguishable until [`crate::run`] settles them.
pub type Measurement = Option<u32>;

/// One integer per platform, indexed by [`Platform`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PlatformCounts(pub [u32; 5]);

impl PlatformCounts {
    pub const ZERO: Self = Self([0; 5]);

    pub fn iter(&self) -> impl Iterator<Item = (Platform, u32)> + '_ {
        Platform::ALL.into_iter().map(|p| (p, self[p]))
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Sum over the platforms that count problems (repositories excluded).
    pub fn problems(&self) -> u32 {
        self.iter()
            .filter(|(p, _)| p.counts_problems())
            .map(|(_, n)| n)
            .sum()
    }
}

impl Index<Platform> for PlatformCounts {
    type Output = u32;

    #[inline]
    fn index(&self, platform: Platform) -> &u32 {
        &self.0[platform.index()]
    }
}

impl IndexMut<Platform> for PlatformCounts {
    #[inline]
    fn index_mut(&mut self, platform: Platform) -> &mut u32 {
        &mut self.0[platform.index()]
    }
}

impl fmt::Display for PlatformCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [lc, sr, cc, hr, gh] = self.0;
        write!(f, "LC: {lc} | SR: {sr} | CC: {cc} | HR: {hr} | GH: {gh}")
    }
}

/// Per-platform measurements of one participant, before settling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readings(pub [Measurement; 5]);

impl Readings {
    /// Replaces every unknown reading with `fallback`'s value for that platform.
    pub fn settle(&self, fallback: &PlatformCounts) -> PlatformCounts {
        let mut out = PlatformCounts::ZERO;
        for p in Platform::ALL {
            out[p] = self[p].unwrap_or(fallback[p]);
        }
        out
    }

    pub fn unknown(&self) -> impl Iterator<Item = Platform> + '_ {
        Platform::ALL.into_iter().filter(|&p| self[p].is_none())
    }
}

impl Index<Platform> for Readings {
    type Output = Measurement;

    #[inline]
    fn index(&self, platform: Platform) -> &Measurement {
        &self.0[platform.index()]
    }
}

impl IndexMut<Platform> for Readings {
    #[inline]
    fn index_mut(&mut self, platform: Platform) -> &mut Measurement {
        &mut self.0[platform.index()]
    }
}
