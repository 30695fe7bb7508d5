mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use common::{execute, execute_with, CallCounts, FakeBackend};
use controlplane_graphql::models::JobStage;
use controlplane_graphql::{to_global_id, ApiConfig, Caller, ResourceType};

fn backend() -> Arc<FakeBackend> {
    Arc::new(FakeBackend::default())
}

#[tokio::test]
async fn missing_group_resolves_to_null() {
    let backend = backend();

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{ group(id: "trn:group:nowhere") { fullPath } }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data, json!({ "group": null }));
}

#[tokio::test]
async fn malformed_id_is_an_error() {
    let backend = backend();

    let (data, errors) = execute(&backend, Caller::Anonymous, r#"{ group(id: "not an id") { fullPath } }"#).await;

    // A resolver error on a root field nulls the whole response
    assert_eq!(data, json!(null));
    assert_eq!(errors.len(), 1);
    let code = errors[0]
        .extensions
        .as_ref()
        .and_then(|extensions| extensions.get("code"))
        .cloned();
    assert_eq!(code, Some(async_graphql::Value::from("INVALID")));
}

#[tokio::test]
async fn id_of_another_type_is_rejected() {
    let backend = backend();
    let group = backend.add_group("top", None);
    let gid = to_global_id(ResourceType::Group, group.metadata.id);

    let query = format!(r#"{{ workspace(id: "{}") {{ fullPath }} }}"#, gid);
    let (_, errors) = execute(&backend, Caller::Anonymous, &query).await;

    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("expected a"));
}

#[tokio::test]
async fn group_is_found_by_trn_and_global_id() {
    let backend = backend();
    let top = backend.add_group("top", None);
    let sub = backend.add_group("sub", Some(&top));
    let gid = to_global_id(ResourceType::Group, sub.metadata.id);

    let query = format!(
        r#"{{
            byTrn: group(id: "trn:group:top/sub") {{ fullPath parent {{ name }} }}
            byGid: group(id: "{}") {{ id name metadata {{ version trn }} }}
        }}"#,
        gid
    );
    let (data, errors) = execute(&backend, Caller::Anonymous, &query).await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["byTrn"]["fullPath"], "top/sub");
    assert_eq!(data["byTrn"]["parent"]["name"], "top");
    assert_eq!(data["byGid"]["id"], gid.as_str());
    assert_eq!(data["byGid"]["metadata"]["version"], "1");
    assert_eq!(data["byGid"]["metadata"]["trn"], "trn:group:top/sub");
}

#[tokio::test]
async fn access_rules_batch_user_lookups() {
    let backend = backend();
    let group = backend.add_group("top", None);
    let alice = backend.add_user("alice", false);
    let bob = backend.add_user("bob", false);
    let identity = backend.add_managed_identity("deployer", &group);
    backend.add_access_rule(&identity, JobStage::Plan, &[&alice]);
    backend.add_access_rule(&identity, JobStage::Apply, &[&alice, &bob]);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{
            managedIdentity(id: "trn:managed_identity:top/deployer") {
                isAlias
                accessRules {
                    runStage
                    allowedUsers { username }
                }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["managedIdentity"]["accessRules"],
        json!([
            { "runStage": "PLAN", "allowedUsers": [{ "username": "alice" }] },
            { "runStage": "APPLY", "allowedUsers": [{ "username": "alice" }, { "username": "bob" }] },
        ])
    );
    assert_eq!(CallCounts::get(&backend.calls.users_by_ids), 1);
}

#[tokio::test]
async fn workspace_groups_load_in_one_batch() {
    let backend = backend();
    let top = backend.add_group("top", None);
    let other = backend.add_group("other", None);
    backend.add_workspace("prod", &top);
    backend.add_workspace("staging", &top);
    backend.add_workspace("dev", &other);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{ workspaces { totalCount edges { node { name group { fullPath } } } } }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["workspaces"]["totalCount"], 3);
    assert_eq!(data["workspaces"]["edges"][2]["node"]["group"]["fullPath"], "other");
    assert_eq!(CallCounts::get(&backend.calls.groups_by_ids), 1);
}

#[tokio::test]
async fn connection_pages_forward_with_cursors() {
    let backend = backend();
    for name in ["alpha", "beta", "gamma"] {
        backend.add_group(name, None);
    }

    let first_page = r#"{
        groups(first: 2) {
            totalCount
            edges { cursor node { name } }
            pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
        }
    }"#;
    let (data, errors) = execute(&backend, Caller::Anonymous, first_page).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    let groups = &data["groups"];
    assert_eq!(groups["totalCount"], 3);
    assert_eq!(groups["edges"].as_array().map(Vec::len), Some(2));
    assert_eq!(groups["pageInfo"]["hasNextPage"], true);
    assert_eq!(groups["pageInfo"]["hasPreviousPage"], false);
    assert_eq!(groups["pageInfo"]["startCursor"], groups["edges"][0]["cursor"]);
    assert_eq!(groups["pageInfo"]["endCursor"], groups["edges"][1]["cursor"]);

    let end_cursor = groups["pageInfo"]["endCursor"].as_str().unwrap().to_string();
    let next_page = format!(
        r#"{{ groups(first: 2, after: "{}") {{ edges {{ node {{ name }} }} pageInfo {{ hasNextPage hasPreviousPage }} }} }}"#,
        end_cursor
    );
    let (data, errors) = execute(&backend, Caller::Anonymous, &next_page).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["groups"]["edges"], json!([{ "node": { "name": "gamma" } }]));
    assert_eq!(data["groups"]["pageInfo"]["hasNextPage"], false);
    assert_eq!(data["groups"]["pageInfo"]["hasPreviousPage"], true);
}

#[tokio::test]
async fn empty_connection_has_no_cursors() {
    let backend = backend();

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{ groups { totalCount edges { cursor } pageInfo { hasNextPage startCursor endCursor } } }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["groups"],
        json!({
            "totalCount": 0,
            "edges": [],
            "pageInfo": { "hasNextPage": false, "startCursor": null, "endCursor": null },
        })
    );
}

#[tokio::test]
async fn contradictory_pagination_arguments_are_rejected() {
    let backend = backend();
    backend.add_group("alpha", None);

    for query in [
        r#"{ groups(first: 1, last: 1) { totalCount } }"#,
        r#"{ groups(first: 101) { totalCount } }"#,
        r#"{ groups(after: "garbage") { totalCount } }"#,
    ] {
        let (_, errors) = execute(&backend, Caller::Anonymous, query).await;
        assert_eq!(errors.len(), 1, "expected an error for {}", query);
    }
}

#[tokio::test]
async fn create_group_reports_success_without_problems() {
    let backend = backend();
    backend.add_group("top", None);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createGroup(input: { clientMutationId: "m1", name: "sub", parentId: "trn:group:top" }) {
                clientMutationId
                group { fullPath }
                problems { message type field }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["createGroup"],
        json!({ "clientMutationId": "m1", "group": { "fullPath": "top/sub" }, "problems": [] })
    );
}

#[tokio::test]
async fn failed_mutation_returns_problems_and_no_model() {
    let backend = backend();
    backend.add_group("top", None);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createGroup(input: { clientMutationId: "m2", name: "top" }) {
                clientMutationId
                group { fullPath }
                problems { message type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "mutation failures must not be GraphQL errors: {:?}", errors);
    let payload = &data["createGroup"];
    assert_eq!(payload["clientMutationId"], "m2");
    assert_eq!(payload["group"], json!(null));
    assert_eq!(payload["problems"][0]["type"], "CONFLICT");
    assert_eq!(payload["problems"][0]["message"], "group top already exists");
}

#[tokio::test]
async fn stale_version_is_a_conflict_problem() {
    let backend = backend();
    backend.add_group("top", None);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            updateGroup(input: { id: "trn:group:top", version: "7", description: "new" }) {
                group { description }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["updateGroup"], json!({ "group": null, "problems": [{ "type": "CONFLICT" }] }));
}

#[tokio::test]
async fn deleting_missing_resource_reports_not_found() {
    let backend = backend();

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            deleteTeam(input: { id: "trn:team:ghosts" }) {
                team { name }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["deleteTeam"], json!({ "team": null, "problems": [{ "type": "NOT_FOUND" }] }));
}

#[tokio::test]
async fn access_rule_with_principals_is_created() {
    let backend = backend();
    let group = backend.add_group("top", None);
    backend.add_user("alice", false);
    backend.add_team("ops");
    backend.add_managed_identity("deployer", &group);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createManagedIdentityAccessRule(input: {
                managedIdentityId: "trn:managed_identity:top/deployer",
                type: ELIGIBLE_PRINCIPALS,
                runStage: APPLY,
                allowedUsers: ["trn:user:alice"],
                allowedTeams: ["trn:team:ops"]
            }) {
                accessRule {
                    allowedPrincipals {
                        __typename
                        ... on User { username }
                        ... on Team { name }
                    }
                }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["createManagedIdentityAccessRule"],
        json!({
            "accessRule": {
                "allowedPrincipals": [
                    { "__typename": "User", "username": "alice" },
                    { "__typename": "Team", "name": "ops" },
                ]
            },
            "problems": [],
        })
    );
}

#[tokio::test]
async fn identity_with_unresolvable_rule_is_not_created() {
    let backend = backend();
    backend.add_group("top", None);
    backend.add_user("alice", false);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createManagedIdentity(input: {
                name: "deployer",
                type: AWS_FEDERATED,
                groupId: "trn:group:top",
                data: "e30",
                accessRules: [
                    { type: ELIGIBLE_PRINCIPALS, runStage: PLAN, allowedUsers: ["trn:user:alice"] },
                    { type: ELIGIBLE_PRINCIPALS, runStage: APPLY, allowedUsers: ["trn:user:ghost"] }
                ]
            }) {
                managedIdentity { name }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["createManagedIdentity"],
        json!({ "managedIdentity": null, "problems": [{ "type": "NOT_FOUND" }] })
    );
    assert!(backend.managed_identities.lock().unwrap().is_empty());
    assert!(backend.access_rules.lock().unwrap().is_empty());
}

#[tokio::test]
async fn identity_is_created_with_its_rules() {
    let backend = backend();
    backend.add_group("top", None);
    backend.add_user("alice", false);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createManagedIdentity(input: {
                name: "deployer",
                type: AWS_FEDERATED,
                groupId: "trn:group:top",
                data: "e30",
                accessRules: [{ type: ELIGIBLE_PRINCIPALS, runStage: PLAN, allowedUsers: ["trn:user:alice"] }]
            }) {
                managedIdentity {
                    name
                    accessRules { runStage allowedUsers { username } }
                }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["createManagedIdentity"],
        json!({
            "managedIdentity": {
                "name": "deployer",
                "accessRules": [{ "runStage": "PLAN", "allowedUsers": [{ "username": "alice" }] }],
            },
            "problems": [],
        })
    );
}

#[tokio::test]
async fn namespace_resolves_groups_and_workspaces() {
    let backend = backend();
    let top = backend.add_group("top", None);
    backend.add_workspace("prod", &top);

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{
            group: namespace(fullPath: "top") { __typename ... on Group { fullPath } }
            workspace: namespace(fullPath: "top/prod") { __typename ... on Workspace { groupPath } }
            missing: namespace(fullPath: "top/none") { __typename }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data,
        json!({
            "group": { "__typename": "Group", "fullPath": "top" },
            "workspace": { "__typename": "Workspace", "groupPath": "top" },
            "missing": null,
        })
    );
}

#[tokio::test]
async fn namespace_rejects_empty_path() {
    let backend = backend();
    backend.add_group("top", None);

    for full_path in ["", "/", "top//prod"] {
        let query = format!(r#"{{ namespace(fullPath: "{}") {{ __typename }} }}"#, full_path);
        let (_, errors) = execute(&backend, Caller::Anonymous, &query).await;

        assert_eq!(errors.len(), 1, "expected an error for {:?}", full_path);
        assert!(errors[0].message.contains("fullPath"), "unexpected message: {}", errors[0].message);
    }
}

#[tokio::test]
async fn node_query_dispatches_on_resource_type() {
    let backend = backend();
    let top = backend.add_group("top", None);
    let prod = backend.add_workspace("prod", &top);
    let gid = to_global_id(ResourceType::Workspace, prod.metadata.id);

    let query = format!(
        r#"{{
            byTrn: node(id: "trn:workspace:top/prod") {{ __typename ... on Workspace {{ fullPath }} }}
            byGid: node(id: "{}") {{ __typename ... on Workspace {{ fullPath }} }}
            missing: node(id: "trn:runner:nowhere") {{ __typename }}
        }}"#,
        gid
    );
    let (data, errors) = execute(&backend, Caller::Anonymous, &query).await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["byTrn"], json!({ "__typename": "Workspace", "fullPath": "top/prod" }));
    assert_eq!(data["byGid"], data["byTrn"]);
    assert_eq!(data["missing"], json!(null));
}

fn sensitive_config() -> ApiConfig {
    ApiConfig::from_toml_str(
        r#"
        public_api_url = "https://api.example.com"
        db_password = "hunter2"
        jwt_signing_key_arn = "arn:aws:kms:us-east-1:123:key/abc"

        [[oauth_providers]]
        issuer_url = "https://login.example.com"
        client_id = "client-123"
        "#,
    )
    .unwrap()
}

const CONFIG_QUERY: &str = r#"{
    config {
        publicApiUrl
        dbPassword
        jwtSigningKeyArn
        oauthProviders { issuerUrl clientId }
    }
}"#;

#[tokio::test]
async fn config_is_redacted_for_non_admins() {
    let backend = backend();
    let user = backend.add_user("alice", false);

    let (data, errors) = execute_with(&backend, sensitive_config(), Caller::User(user), CONFIG_QUERY).await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["config"],
        json!({
            "publicApiUrl": "https://api.example.com",
            "dbPassword": null,
            "jwtSigningKeyArn": null,
            "oauthProviders": [{ "issuerUrl": "https://login.example.com", "clientId": null }],
        })
    );
}

#[tokio::test]
async fn config_is_complete_for_admins() {
    let backend = backend();
    let admin = backend.add_user("root", true);

    let (data, errors) = execute_with(&backend, sensitive_config(), Caller::User(admin), CONFIG_QUERY).await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["config"]["dbPassword"], "hunter2");
    assert_eq!(data["config"]["oauthProviders"][0]["clientId"], "client-123");
}

#[tokio::test]
async fn me_returns_the_caller() {
    let backend = backend();
    let user = backend.add_user("alice", false);
    let query = r#"{ me { __typename ... on User { username } } }"#;

    let (data, errors) = execute(&backend, Caller::User(user), query).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["me"], json!({ "__typename": "User", "username": "alice" }));

    let (data, _) = execute(&backend, Caller::Anonymous, query).await;
    assert_eq!(data["me"], json!(null));
}

#[tokio::test]
async fn announcements_filter_on_activity() {
    let backend = backend();
    backend.add_announcement("maintenance tonight", Some(Utc::now() + Duration::hours(2)));
    backend.add_announcement("old outage", Some(Utc::now() - Duration::minutes(5)));

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"{
            active: announcements(active: true) { edges { node { message active expired } } }
            all: announcements { totalCount }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["active"]["edges"],
        json!([{ "node": { "message": "maintenance tonight", "active": true, "expired": false } }])
    );
    assert_eq!(data["all"]["totalCount"], 2);
}

#[tokio::test]
async fn announcement_end_time_is_cleared_by_null() {
    let backend = backend();
    let announcement = backend.add_announcement("maintenance tonight", Some(Utc::now() + Duration::hours(2)));
    let gid = to_global_id(ResourceType::Announcement, announcement.metadata.id);

    let keep = format!(
        r#"mutation {{
            updateAnnouncement(input: {{ id: "{}", message: "maintenance moved" }}) {{
                announcement {{ message endTime }}
            }}
        }}"#,
        gid
    );
    let (data, errors) = execute(&backend, Caller::Anonymous, &keep).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["updateAnnouncement"]["announcement"]["message"], "maintenance moved");
    assert!(data["updateAnnouncement"]["announcement"]["endTime"].is_string());

    let clear = format!(
        r#"mutation {{
            updateAnnouncement(input: {{ id: "{}", endTime: null }}) {{
                announcement {{ endTime expired }}
                problems {{ type }}
            }}
        }}"#,
        gid
    );
    let (data, errors) = execute(&backend, Caller::Anonymous, &clear).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["updateAnnouncement"],
        json!({ "announcement": { "endTime": null, "expired": false }, "problems": [] })
    );
    assert!(backend.announcements.lock().unwrap()[0].end_time.is_none());
}

#[tokio::test]
async fn shared_runner_has_no_group() {
    let backend = backend();

    let (data, errors) = execute(
        &backend,
        Caller::Anonymous,
        r#"mutation {
            createRunner(input: { name: "shared-1", tags: ["linux"] }) {
                runner { type tags runUntaggedJobs group { name } }
                problems { type }
            }
        }"#,
    )
    .await;

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(
        data["createRunner"],
        json!({
            "runner": { "type": "SHARED", "tags": ["linux"], "runUntaggedJobs": true, "group": null },
            "problems": [],
        })
    );

    let (data, errors) = execute(&backend, Caller::Anonymous, r#"{ sharedRunners { totalCount } }"#).await;
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(data["sharedRunners"]["totalCount"], 1);
}
