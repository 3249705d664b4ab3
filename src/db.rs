use core::{fmt::Debug, pin::pin};

use anyhow::Context;
use bb8_postgres::{PostgresConnectionManager, bb8};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use hashbrown::HashMap;
use tokio_postgres::{
    NoTls, Row,
    types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked},
};

use crate::{
    delta::DailySnapshot,
    platform::{Platform, PlatformCounts},
    roster::{MemberPath, Participant, ProfileRefs, RosterEntry},
};

pub type ConnectionManager = PostgresConnectionManager<NoTls>;
pub type Pool = bb8::Pool<ConnectionManager>;
pub type DBError = tokio_postgres::Error;
pub type BB8Error = bb8::RunError<DBError>;

pub mod constants {
    use core::time::Duration;

    macro_rules! env_or_default {
        ($name:expr, $default:expr) => {
            if let Some(s) = option_env!($name) {
                s
            } else {
                $default
            }
        };
    }

    pub const HOST: &str = env_or_default!("DB_HOST", "/var/run/postgresql");
    pub const USER: &str = env_or_default!("DB_USER", "postgres");
    pub const DBNAME: &str = env_or_default!("DB_NAME", "postgres");
    pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub dbname: String,
    pub password: Option<String>,
}

const SCHEMA: &str = "
create schema if not exists tracker;
create table if not exists tracker.departments (
    id text primary key,
    name text not null,
    updated_at timestamptz not null
);
create table if not exists tracker.sections (
    dept_id text not null,
    id text not null,
    name text not null,
    updated_at timestamptz not null,
    primary key (dept_id, id)
);
create table if not exists tracker.teams (
    dept_id text not null,
    section_id text not null,
    id text not null,
    name text not null,
    base_team_name text not null,
    team_lead_name text not null,
    updated_at timestamptz not null,
    primary key (dept_id, section_id, id)
);
create table if not exists tracker.members (
    key text primary key,
    dept_id text not null,
    section_id text not null,
    team_id text not null,
    member_id text not null,
    name text not null,
    email text not null,
    assigned_team_lead text not null,
    is_team_lead boolean not null,
    assigned_batch text,
    leetcode_url text not null,
    skillrack_url text not null,
    codechef_url text not null,
    hackerrank_url text not null,
    github_url text not null,
    last_synced timestamptz not null
);
create table if not exists tracker.daily_totals (
    member_key text not null,
    date date not null,
    leetcode_total bigint not null,
    skillrack_total bigint not null,
    codechef_total bigint not null,
    hackerrank_total bigint not null,
    github_repos bigint not null,
    leetcode_daily_increase bigint not null,
    skillrack_daily_increase bigint not null,
    codechef_daily_increase bigint not null,
    hackerrank_daily_increase bigint not null,
    github_daily_increase bigint not null,
    scraped_at timestamptz not null,
    primary key (member_key, date)
);
";

const SNAPSHOT_COLUMNS: &str = "date, leetcode_total, skillrack_total, codechef_total, hackerrank_total, github_repos, leetcode_daily_increase, skillrack_daily_increase, codechef_daily_increase, hackerrank_daily_increase, github_daily_increase, scraped_at";

#[inline]
pub fn transfer_type<'a, T, U>(row: &'a Row, idx: usize) -> anyhow::Result<U>
where
    T: FromSql<'a> + TryInto<U>,
    <T as TryInto<U>>::Error: core::error::Error + Send + Sync + 'static,
{
    let value = row.try_get::<'a, usize, T>(idx)?;
    value.try_into().with_context(|| format!("column {idx} out of range"))
}

#[derive(Debug)]
#[repr(transparent)]
pub struct ToSqlIter<T>(pub T);

impl<T, U> ToSql for ToSqlIter<T>
where
    T: ExactSizeIterator<Item = U> + Clone + Debug,
    U: ToSql,
{
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        let Kind::Array(member_type) = ty.kind() else {
            return Err(format!("expected array type, got {ty}").into());
        };

        let lower_bound = match *ty {
            Type::OID_VECTOR | Type::INT2_VECTOR => 0,
            _ => 1,
        };

        let dimension = postgres_protocol::types::ArrayDimension {
            len: self.0.len().try_into()?,
            lower_bound,
        };

        postgres_protocol::types::array_to_sql(
            Some(dimension),
            member_type.oid(),
            self.0.clone(),
            |e, w| match e.to_sql(member_type, w)? {
                IsNull::No => Ok(postgres_protocol::IsNull::No),
                IsNull::Yes => Ok(postgres_protocol::IsNull::Yes),
            },
            out,
        )?;
        Ok(IsNull::No)
    }

    #[inline]
    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Five bigint columns starting at `first`.
fn counts_at(row: &Row, first: usize) -> anyhow::Result<PlatformCounts> {
    let mut counts = PlatformCounts::ZERO;
    for p in Platform::ALL {
        counts[p] = transfer_type::<i64, u32>(row, first + p.index())?;
    }
    Ok(counts)
}

/// Row in [`SNAPSHOT_COLUMNS`] order, starting at `first`.
fn snapshot_at(row: &Row, first: usize) -> anyhow::Result<DailySnapshot> {
    Ok(DailySnapshot {
        date: row.try_get(first)?,
        totals: counts_at(row, first + 1)?,
        deltas: counts_at(row, first + 6)?,
        scraped_at: row.try_get(first + 11)?,
    })
}

/// What the run driver needs from persistence.
pub trait SnapshotStore {
    fn snapshot(
        &self,
        member: &MemberPath,
        date: NaiveDate,
    ) -> impl Future<Output = anyhow::Result<Option<DailySnapshot>>> + Send;

    /// Merge-upsert keyed by (member, date).
    fn upsert_snapshot(
        &self,
        member: &MemberPath,
        snapshot: &DailySnapshot,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Latest snapshot of one member, with the hierarchy around it.
#[derive(Clone, Debug)]
pub struct MemberStanding {
    pub path: MemberPath,
    pub name: String,
    pub is_team_lead: bool,
    pub assigned_team_lead: String,
    pub snapshot: DailySnapshot,
}

/// Postgres-backed hierarchical store.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    pub async fn connect(config: &DbConfig) -> Result<Self, DBError> {
        use constants::CONNECTION_TIMEOUT;

        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .user(&config.user)
            .dbname(&config.dbname)
            .connect_timeout(CONNECTION_TIMEOUT);
        if let Some(password) = &config.password {
            pg.password(password);
        }

        let manager = PostgresConnectionManager::new(pg, NoTls);
        let pool = Pool::builder()
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), BB8Error> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA).await?;
        Ok(())
    }

    /// Upserts every level of the hierarchy for `entries`, merging into
    /// existing rows.
    pub async fn sync_roster(&self, entries: &[RosterEntry]) -> Result<u64, BB8Error> {
        const SQL_DEPT: &str = "with tmp_insert(i, n) as (select * from unnest($1::text[], $2::text[])) insert into tracker.departments (id, name, updated_at) select i, n, now() from tmp_insert on conflict (id) do update set name = excluded.name, updated_at = excluded.updated_at";
        const SQL_SECTION: &str = "with tmp_insert(d, i, n) as (select * from unnest($1::text[], $2::text[], $3::text[])) insert into tracker.sections (dept_id, id, name, updated_at) select d, i, n, now() from tmp_insert on conflict (dept_id, id) do update set name = excluded.name, updated_at = excluded.updated_at";
        const SQL_TEAM: &str = "with tmp_insert(d, s, i, n, b, l) as (select * from unnest($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[])) insert into tracker.teams (dept_id, section_id, id, name, base_team_name, team_lead_name, updated_at) select d, s, i, n, b, l, now() from tmp_insert on conflict (dept_id, section_id, id) do update set name = excluded.name, base_team_name = excluded.base_team_name, team_lead_name = excluded.team_lead_name, updated_at = excluded.updated_at";
        const SQL_MEMBER: &str = "with tmp_insert(k, d, s, t, m, n, e, l, il, b, lc, sr, cc, hr, gh) as (select * from unnest($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[], $8::text[], $9::bool[], $10::text[], $11::text[], $12::text[], $13::text[], $14::text[], $15::text[])) insert into tracker.members (key, dept_id, section_id, team_id, member_id, name, email, assigned_team_lead, is_team_lead, assigned_batch, leetcode_url, skillrack_url, codechef_url, hackerrank_url, github_url, last_synced) select k, d, s, t, m, n, e, l, il, b, lc, sr, cc, hr, gh, now() from tmp_insert on conflict (key) do update set name = excluded.name, email = excluded.email, assigned_team_lead = excluded.assigned_team_lead, is_team_lead = excluded.is_team_lead, assigned_batch = excluded.assigned_batch, leetcode_url = excluded.leetcode_url, skillrack_url = excluded.skillrack_url, codechef_url = excluded.codechef_url, hackerrank_url = excluded.hackerrank_url, github_url = excluded.github_url, last_synced = excluded.last_synced";

        // One statement may not touch the same key twice; later rows win.
        let mut depts = HashMap::new();
        let mut sections = HashMap::new();
        let mut teams = HashMap::new();
        let mut members = HashMap::new();
        for e in entries {
            let path = &e.participant.path;
            depts.insert(&*path.dept_id, format!("{} Department", e.department));
            sections.insert((&*path.dept_id, &*path.section_id), format!("Section {}", e.section));
            teams.insert((&*path.dept_id, &*path.section_id, &*path.team_id), e);
            members.insert(path.key(), e);
        }
        let depts = depts.into_iter().collect::<Vec<_>>();
        let sections = sections.into_iter().collect::<Vec<_>>();
        let teams = teams.into_iter().collect::<Vec<_>>();
        let members = members.into_iter().collect::<Vec<_>>();

        let mut conn = self.pool.get().await?;
        let txn = conn.transaction().await?;

        let stmt = txn.prepare(SQL_DEPT).await?;
        txn.execute(&stmt, &[
            &ToSqlIter(depts.iter().map(|x| x.0)),
            &ToSqlIter(depts.iter().map(|x| &*x.1)),
        ]).await?;

        let stmt = txn.prepare(SQL_SECTION).await?;
        txn.execute(&stmt, &[
            &ToSqlIter(sections.iter().map(|x| x.0.0)),
            &ToSqlIter(sections.iter().map(|x| x.0.1)),
            &ToSqlIter(sections.iter().map(|x| &*x.1)),
        ]).await?;

        let stmt = txn.prepare(SQL_TEAM).await?;
        txn.execute(&stmt, &[
            &ToSqlIter(teams.iter().map(|x| x.0.0)),
            &ToSqlIter(teams.iter().map(|x| x.0.1)),
            &ToSqlIter(teams.iter().map(|x| x.0.2)),
            &ToSqlIter(teams.iter().map(|x| &*x.1.team_display_name)),
            &ToSqlIter(teams.iter().map(|x| &*x.1.team_name)),
            &ToSqlIter(teams.iter().map(|x| &*x.1.team_lead)),
        ]).await?;

        let stmt = txn.prepare(SQL_MEMBER).await?;
        let n = txn.execute(&stmt, &[
            &ToSqlIter(members.iter().map(|x| &*x.0)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.path.dept_id)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.path.section_id)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.path.team_id)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.path.member_id)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.name)),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.email)),
            &ToSqlIter(members.iter().map(|x| &*x.1.team_lead)),
            &ToSqlIter(members.iter().map(|x| x.1.is_team_lead)),
            &ToSqlIter(members.iter().map(|x| x.1.batch.as_deref())),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.profiles[Platform::LeetCode])),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.profiles[Platform::SkillRack])),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.profiles[Platform::CodeChef])),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.profiles[Platform::HackerRank])),
            &ToSqlIter(members.iter().map(|x| &*x.1.participant.profiles[Platform::GitHub])),
        ]).await?;

        txn.commit().await?;

        tracing::info!(target: "db", "\x1b[36m{n}/{} members upserted\x1b[0m", entries.len());
        Ok(n)
    }

    /// Every member, in hierarchy order.
    pub async fn members(&self) -> Result<Vec<Participant>, BB8Error> {
        const SQL: &str = "select dept_id, section_id, team_id, member_id, name, email, leetcode_url, skillrack_url, codechef_url, hackerrank_url, github_url from tracker.members order by dept_id, section_id, team_id, member_id";

        let conn = self.pool.get().await?;
        let stmt = conn.prepare(SQL).await?;
        let stream = conn.query_raw(&stmt, core::iter::empty::<&str>()).await?;
        let mut stream = pin!(stream);
        let mut result = Vec::new();
        while let Some(row) = stream.try_next().await? {
            let mut profiles = ProfileRefs::default();
            for p in Platform::ALL {
                profiles[p] = row.try_get(6 + p.index())?;
            }
            result.push(Participant {
                path: MemberPath {
                    dept_id: row.try_get(0)?,
                    section_id: row.try_get(1)?,
                    team_id: row.try_get(2)?,
                    member_id: row.try_get(3)?,
                },
                name: row.try_get(4)?,
                email: row.try_get(5)?,
                profiles,
            });
        }
        Ok(result)
    }

    pub async fn get_snapshot(&self, member_key: &str, date: NaiveDate) -> anyhow::Result<Option<DailySnapshot>> {
        let sql = format!("select {SNAPSHOT_COLUMNS} from tracker.daily_totals where member_key = $1 and date = $2");

        let conn = self.pool.get().await?;
        let stmt = conn.prepare(&sql).await?;
        let row = conn.query_opt(&stmt, &[&member_key, &date]).await?;
        row.map(|r| snapshot_at(&r, 0)).transpose()
    }

    pub async fn put_snapshot(&self, member_key: &str, snapshot: &DailySnapshot) -> Result<(), BB8Error> {
        const SQL: &str = "insert into tracker.daily_totals (member_key, date, leetcode_total, skillrack_total, codechef_total, hackerrank_total, github_repos, leetcode_daily_increase, skillrack_daily_increase, codechef_daily_increase, hackerrank_daily_increase, github_daily_increase, scraped_at) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) on conflict (member_key, date) do update set leetcode_total = excluded.leetcode_total, skillrack_total = excluded.skillrack_total, codechef_total = excluded.codechef_total, hackerrank_total = excluded.hackerrank_total, github_repos = excluded.github_repos, leetcode_daily_increase = excluded.leetcode_daily_increase, skillrack_daily_increase = excluded.skillrack_daily_increase, codechef_daily_increase = excluded.codechef_daily_increase, hackerrank_daily_increase = excluded.hackerrank_daily_increase, github_daily_increase = excluded.github_daily_increase, scraped_at = excluded.scraped_at";

        let [t0, t1, t2, t3, t4] = snapshot.totals.0.map(i64::from);
        let [d0, d1, d2, d3, d4] = snapshot.deltas.0.map(i64::from);

        let conn = self.pool.get().await?;
        let stmt = conn.prepare(SQL).await?;
        conn.execute(&stmt, &[
            &member_key,
            &snapshot.date,
            &t0, &t1, &t2, &t3, &t4,
            &d0, &d1, &d2, &d3, &d4,
            &snapshot.scraped_at,
        ]).await?;
        Ok(())
    }

    /// Most recent snapshot of every member that has one.
    pub async fn standings(&self) -> Result<Vec<MemberStanding>, BB8Error> {
        let sql = format!(
            "select distinct on (m.key) m.dept_id, m.section_id, m.team_id, m.member_id, m.name, m.is_team_lead, m.assigned_team_lead, {} \
             from tracker.members m join tracker.daily_totals d on d.member_key = m.key \
             order by m.key, d.date desc",
            SNAPSHOT_COLUMNS
                .split(", ")
                .map(|c| format!("d.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let conn = self.pool.get().await?;
        let stmt = conn.prepare(&sql).await?;
        let rows = conn.query(&stmt, &[]).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                standing_at(row)
                    .inspect_err(|e| tracing::error!(target: "db", "\x1b[31mbad standing row: {e:#}\x1b[0m"))
                    .ok()
            })
            .collect())
    }
}

fn standing_at(row: &Row) -> anyhow::Result<MemberStanding> {
    Ok(MemberStanding {
        path: MemberPath {
            dept_id: row.try_get(0)?,
            section_id: row.try_get(1)?,
            team_id: row.try_get(2)?,
            member_id: row.try_get(3)?,
        },
        name: row.try_get(4)?,
        is_team_lead: row.try_get(5)?,
        assigned_team_lead: row.try_get(6)?,
        snapshot: snapshot_at(row, 7)?,
    })
}

impl SnapshotStore for Store {
    async fn snapshot(&self, member: &MemberPath, date: NaiveDate) -> anyhow::Result<Option<DailySnapshot>> {
        self.get_snapshot(&member.key(), date).await
    }

    async fn upsert_snapshot(&self, member: &MemberPath, snapshot: &DailySnapshot) -> anyhow::Result<()> {
        Ok(self.put_snapshot(&member.key(), snapshot).await?)
    }
}
