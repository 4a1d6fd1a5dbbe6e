use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::testing::{login, team, user_id, Call, FakeService, Operation};

fn rules(include: AuthorRules, exclude: AuthorRules) -> RosterRules {
    RosterRules { include, exclude }
}

fn users(logins: &[&str]) -> AuthorRules {
    AuthorRules {
        users: logins.iter().map(|l| login(l)).collect(),
        ..AuthorRules::default()
    }
}

fn teams(refs: &[(&str, &str)]) -> AuthorRules {
    AuthorRules {
        teams: refs.iter().map(|(org, slug)| team(org, slug)).collect(),
        ..AuthorRules::default()
    }
}

fn orgs(names: &[&str]) -> AuthorRules {
    AuthorRules {
        orgs: names.iter().map(|n| login(n)).collect(),
        ..AuthorRules::default()
    }
}

async fn authors(service: &Arc<FakeService>, rules: RosterRules) -> Authors {
    Authors::new(service.clone(), rules)
        .await
        .expect("evaluator construction")
}

async fn resolve(authors: &mut Authors, user: &str) -> bool {
    authors.resolve(&login(user)).await.expect("resolve")
}

#[tokio::test]
async fn everyone_is_included_without_rules() {
    let service = Arc::new(FakeService::new());
    let mut authors = authors(&service, RosterRules::default()).await;

    assert!(resolve(&mut authors, "anyone").await);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn explicit_inclusion_beats_team_exclusion() {
    let service = Arc::new(FakeService::new().with_team(team("org1", "team1"), &["user"]));
    let mut authors = authors(
        &service,
        rules(users(&["user"]), teams(&[("org1", "team1")])),
    )
    .await;

    assert!(resolve(&mut authors, "user").await);
    // Include rules exist, so a login matching nothing is excluded.
    assert!(!resolve(&mut authors, "user1").await);
    assert_eq!(
        service.count(|c| matches!(c, Call::UserOrganizations(_))),
        0
    );
}

#[tokio::test]
async fn explicit_exclusion_beats_team_inclusion() {
    let service = Arc::new(FakeService::new().with_team(team("org1", "team1"), &["user", "user1"]));
    let mut authors = authors(
        &service,
        rules(teams(&[("org1", "team1")]), users(&["user1"])),
    )
    .await;

    assert!(resolve(&mut authors, "user").await);
    assert!(!resolve(&mut authors, "user1").await);
}

#[tokio::test]
async fn explicit_exclusion_beats_org_inclusion() {
    let service = Arc::new(FakeService::new().with_user_orgs("user", &["org1"]));
    let mut authors = authors(&service, rules(orgs(&["org1"]), users(&["user"]))).await;

    assert!(!resolve(&mut authors, "user").await);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn team_inclusion_with_org_exclusion() {
    let service = Arc::new(
        FakeService::new()
            .with_team(team("org1", "team1"), &["user", "user1"])
            .with_team(team("org1", "team2"), &["user2", "user3"]),
    );
    let mut authors = authors(
        &service,
        rules(
            teams(&[("org1", "team1"), ("org1", "team2")]),
            AuthorRules {
                users: vec![login("user1")],
                orgs: vec![login("org2")],
                ..AuthorRules::default()
            },
        ),
    )
    .await;

    assert!(resolve(&mut authors, "user").await);
    assert!(resolve(&mut authors, "user3").await);
    assert!(!resolve(&mut authors, "user4").await);
    assert!(!resolve(&mut authors, "user1").await);

    // Only the login that fell through the team rules needed its orgs.
    assert_eq!(
        service.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::TeamMembers(_)))
            .collect::<Vec<_>>(),
        vec![
            Call::UserOrganizations(login("user4")),
            Call::IsOrganizationMember(login("user4"), login("org2")),
        ]
    );
}

#[tokio::test]
async fn team_exclusion_beats_team_inclusion() {
    let service = Arc::new(
        FakeService::new()
            .with_team(team("acme", "all"), &["alice", "bob"])
            .with_team(team("acme", "contractors"), &["bob"]),
    );
    let mut authors = authors(
        &service,
        rules(teams(&[("acme", "all")]), teams(&[("acme", "contractors")])),
    )
    .await;

    assert!(resolve(&mut authors, "alice").await);
    assert!(!resolve(&mut authors, "bob").await);
}

#[tokio::test]
async fn org_exclusion_beats_org_inclusion() {
    let service = Arc::new(FakeService::new().with_user_orgs("alice", &["acme", "rival"]));
    let mut authors = authors(&service, rules(orgs(&["acme"]), orgs(&["rival"]))).await;

    assert!(!resolve(&mut authors, "alice").await);
}

#[rstest]
#[case::exclude_only_admits_the_rest(rules(AuthorRules::default(), users(&["mallory"])), true)]
#[case::include_rules_make_exclusion_the_default(rules(users(&["alice"]), users(&["mallory"])), false)]
#[case::include_only_rejects_the_rest(rules(users(&["alice"]), AuthorRules::default()), false)]
#[tokio::test]
async fn default_outcome_depends_on_include_rules(
    #[case] roster: RosterRules,
    #[case] expected: bool,
) {
    let service = Arc::new(FakeService::new());
    let mut authors = authors(&service, roster).await;

    assert_eq!(resolve(&mut authors, "zed").await, expected);
}

#[tokio::test]
async fn teams_are_fetched_once_at_construction() {
    let service = Arc::new(
        FakeService::new()
            .with_team(team("acme", "a"), &["alice"])
            .with_team(team("acme", "b"), &["bob"]),
    );
    let mut authors = authors(
        &service,
        rules(
            teams(&[("acme", "a"), ("acme", "b"), ("acme", "a")]),
            AuthorRules::default(),
        ),
    )
    .await;

    assert_eq!(
        service.calls(),
        vec![
            Call::TeamMembers(team("acme", "a")),
            Call::TeamMembers(team("acme", "b")),
        ]
    );

    for _ in 0..3 {
        assert!(resolve(&mut authors, "bob").await);
    }
    assert_eq!(service.calls().len(), 2);
    assert_eq!(
        authors
            .cache()
            .decision(RuleCategory::Team(Side::Include), &login("bob")),
        Some(true)
    );
}

#[tokio::test]
async fn missing_team_aborts_construction() {
    let service = Arc::new(FakeService::new());
    let result = Authors::new(
        service.clone(),
        rules(teams(&[("acme", "ghosts")]), AuthorRules::default()),
    )
    .await;

    assert!(matches!(result, Err(ServiceError::NotFound { .. })));
}

#[tokio::test]
async fn organizations_are_fetched_at_most_once_per_login() {
    let service = Arc::new(FakeService::new().with_user_orgs("alice", &["acme"]));
    let mut authors = authors(&service, rules(orgs(&["acme"]), orgs(&["rival"]))).await;

    for _ in 0..3 {
        assert!(resolve(&mut authors, "alice").await);
    }

    assert_eq!(
        service.calls(),
        vec![Call::UserOrganizations(login("alice"))]
    );
}

#[tokio::test]
async fn private_profiles_are_probed_per_rule_side() {
    let service = Arc::new(FakeService::new().with_org_member("acme", "alice"));
    let mut authors = authors(&service, rules(orgs(&["acme"]), orgs(&["rival"]))).await;

    assert!(resolve(&mut authors, "alice").await);
    assert!(resolve(&mut authors, "alice").await);

    assert_eq!(
        service.calls(),
        vec![
            Call::UserOrganizations(login("alice")),
            Call::IsOrganizationMember(login("alice"), login("rival")),
            Call::IsOrganizationMember(login("alice"), login("acme")),
        ]
    );
}

#[tokio::test]
async fn visible_organizations_skip_membership_probes() {
    let service = Arc::new(FakeService::new().with_user_orgs("alice", &["other"]));
    let mut authors = authors(&service, rules(orgs(&["acme"]), AuthorRules::default())).await;

    assert!(!resolve(&mut authors, "alice").await);
    assert_eq!(
        service.count(|c| matches!(c, Call::IsOrganizationMember(..))),
        0
    );
}

#[tokio::test]
async fn failed_lookups_are_not_cached() {
    let service = Arc::new(FakeService::new().with_user_orgs("alice", &["acme"]));
    let mut authors = authors(&service, rules(orgs(&["acme"]), AuthorRules::default())).await;

    service.fail(Operation::UserOrganizations);
    assert!(authors.resolve(&login("alice")).await.is_err());
    assert_eq!(
        authors
            .cache()
            .decision(RuleCategory::Org(Side::Include), &login("alice")),
        None
    );

    service.recover(Operation::UserOrganizations);
    assert!(resolve(&mut authors, "alice").await);
    assert_eq!(
        service.count(|c| matches!(c, Call::UserOrganizations(_))),
        2
    );
}

#[tokio::test]
async fn failed_probe_is_retried_but_listing_is_not() {
    let service = Arc::new(FakeService::new().with_org_member("acme", "alice"));
    let mut authors = authors(&service, rules(orgs(&["acme"]), AuthorRules::default())).await;

    service.fail(Operation::IsOrganizationMember);
    assert!(authors.resolve(&login("alice")).await.is_err());

    service.recover(Operation::IsOrganizationMember);
    assert!(resolve(&mut authors, "alice").await);

    assert_eq!(
        service.count(|c| matches!(c, Call::UserOrganizations(_))),
        1
    );
    assert_eq!(
        service.count(|c| matches!(c, Call::IsOrganizationMember(..))),
        2
    );
}

#[tokio::test]
async fn user_ids_come_from_team_enumeration() {
    let service = Arc::new(FakeService::new().with_team(team("acme", "a"), &["alice"]));
    let mut authors = authors(&service, rules(teams(&[("acme", "a")]), AuthorRules::default())).await;

    assert_eq!(authors.user_id(&login("alice")).await.unwrap(), user_id("alice"));
    assert_eq!(service.count(|c| matches!(c, Call::LookupUser(_))), 0);
}

#[tokio::test]
async fn user_ids_are_memoized() {
    let service = Arc::new(FakeService::new().with_user("bob"));
    let mut authors = authors(&service, RosterRules::default()).await;

    assert_eq!(authors.user_id(&login("bob")).await.unwrap(), user_id("bob"));
    assert_eq!(authors.user_id(&login("bob")).await.unwrap(), user_id("bob"));
    assert_eq!(service.calls(), vec![Call::LookupUser(login("bob"))]);
    assert_eq!(authors.cache().user_id(&login("bob")), Some(&user_id("bob")));
}

#[tokio::test]
async fn unknown_user_is_not_found_and_not_cached() {
    let service = Arc::new(FakeService::new());
    let mut authors = authors(&service, RosterRules::default()).await;

    let err = authors.user_id(&login("nobody")).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(authors.user_id(&login("nobody")).await.is_err());
    assert_eq!(service.count(|c| matches!(c, Call::LookupUser(_))), 2);
}
