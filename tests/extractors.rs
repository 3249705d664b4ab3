mod common;

use pulse::{
    extract::{extract, probe, skillrack},
    platform::Platform,
};

#[tokio::test]
async fn leetcode_graphql_then_profile() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    assert_eq!(extract(&scraper, Platform::LeetCode, "asha").await, 212);
    assert_eq!(extract(&scraper, Platform::LeetCode, "https://leetcode.com/u/asha/").await, 212);
    assert_eq!(extract(&scraper, Platform::LeetCode, "ghost").await, 57);
    assert_eq!(probe(&scraper, Platform::LeetCode, "down", None).await, None);
}

#[tokio::test]
async fn codechef_both_layouts() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    assert_eq!(extract(&scraper, Platform::CodeChef, "https://www.codechef.com/users/asha").await, 321);
    assert_eq!(extract(&scraper, Platform::CodeChef, "legacy").await, 45);
    assert_eq!(probe(&scraper, Platform::CodeChef, "nobody", None).await, None);
}

#[tokio::test]
async fn hackerrank_sums_badges() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    assert_eq!(extract(&scraper, Platform::HackerRank, "https://www.hackerrank.com/profile/asha").await, 15);
    assert_eq!(probe(&scraper, Platform::HackerRank, "nobody", None).await, None);
}

#[tokio::test]
async fn github_counts_repos_and_sends_token() {
    let base = common::serve(common::upstream()).await;
    let anonymous = common::scraper(&base, |_| {});
    let authorized = common::scraper(&base, |c| c.github_token = Some("secret".to_owned()));

    assert_eq!(extract(&anonymous, Platform::GitHub, "https://github.com/asha").await, 3);
    assert_eq!(probe(&anonymous, Platform::GitHub, "private", None).await, None);
    assert_eq!(extract(&authorized, Platform::GitHub, "private").await, 1);
}

#[tokio::test]
async fn malformed_references_are_zero_without_requests() {
    let (router, hits) = common::counted(common::upstream());
    let base = common::serve(router).await;
    let scraper = common::scraper(&base, |c| c.skillrack_api = Some(format!("{base}/api")));

    for platform in Platform::ALL {
        for reference in ["", "   ", "https://", "not a handle", "https://skillrack.gururaja.in/a b"] {
            assert_eq!(extract(&scraper, platform, reference).await, 0, "{platform} {reference:?}");
            assert_eq!(hits.get(), 0, "{platform} {reference:?} went over the network");
        }
    }
}

#[tokio::test]
async fn scheme_less_leetcode_address() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    assert_eq!(extract(&scraper, Platform::LeetCode, "leetcode.com/u/asha").await, 212);
    assert_eq!(extract(&scraper, Platform::LeetCode, "www.leetcode.com/u/asha/").await, 212);
}

#[tokio::test]
async fn skillrack_official_page() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    let r = skillrack::resolve_with_trail(&scraper, &format!("{base}/profile/asha"), None).await;
    assert_eq!(r.value, Some(150));
    assert_eq!(r.attempts, [(skillrack::Source::Official, Some(150))]);
}

#[tokio::test]
async fn skillrack_zero_official_falls_through_to_mirror() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    let r = skillrack::resolve_with_trail(&scraper, &format!("{base}/profile/zero"), None).await;
    assert_eq!(r.value, Some(120));
    assert_eq!(r.attempts, [
        (skillrack::Source::Official, Some(0)),
        (skillrack::Source::MirrorApi, None),
        (skillrack::Source::MirrorPage, Some(120)),
    ]);
}

#[tokio::test]
async fn skillrack_mirror_api_tier() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |c| c.skillrack_api = Some(format!("{base}/api")));

    let r = skillrack::resolve_with_trail(&scraper, &format!("{base}/profile/apionly"), None).await;
    assert_eq!(r.value, Some(133));
    assert_eq!(r.attempts.len(), 2);
}

#[tokio::test]
async fn skillrack_never_drops_below_last_known() {
    let base = common::serve(common::upstream()).await;
    let scraper = common::scraper(&base, |_| {});

    let flaky = format!("{base}/profile/flaky");
    assert_eq!(probe(&scraper, Platform::SkillRack, &flaky, None).await, Some(90));
    assert_eq!(probe(&scraper, Platform::SkillRack, &flaky, Some(95)).await, Some(95));

    let gone = format!("{base}/profile/gone");
    assert_eq!(probe(&scraper, Platform::SkillRack, &gone, Some(77)).await, Some(77));
    assert_eq!(probe(&scraper, Platform::SkillRack, &gone, None).await, None);
    assert_eq!(extract(&scraper, Platform::SkillRack, &gone).await, 0);
}
