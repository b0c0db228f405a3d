//! Online tier: contract scenarios against the running defect tracker.

use crate::client::{ApiClient, ApiResponse, DefectQuery, NewDefect};
use crate::config::{Credentials, HarnessConfig};
use crate::scenario::{
    ensure, ensure_eq, ensure_status, ensure_valid, fail, Scenario, ScenarioRegistry,
    ScenarioResult,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};
use validators::prelude::*;

/// Shared state handed to every online scenario.
pub struct OnlineContext {
    pub client: ApiClient,
    pub config: HarnessConfig,
}

impl OnlineContext {
    pub fn new(client: ApiClient, config: HarnessConfig) -> Self {
        Self { client, config }
    }

    /// Log in as `credentials` and return the user id used as bearer token.
    ///
    /// Accounts with a role are registered first; 409 means the account is
    /// left over from an earlier run and is fine.
    pub async fn sign_in(&self, credentials: &Credentials) -> ScenarioResult<String> {
        if let Some(role) = &credentials.role {
            let response = self
                .client
                .register(&credentials.email, &credentials.password, Some(role.as_str()))
                .await?;
            if !matches!(response.status_code(), 201 | 409) {
                warn!(
                    "Registration of {} returned {}",
                    credentials.email, response.status
                );
            }
        }

        let response = self
            .client
            .login(&credentials.email, &credentials.password)
            .await?;
        ensure_status(&response, &[200], &format!("login as {}", credentials.email))?;

        match id_of(&response.body["user"]["id"]) {
            Some(id) => {
                debug!("Signed in as {} (id {})", credentials.email, id);
                Ok(id)
            }
            None => fail(format!(
                "login as {}: response has no user id: {}",
                credentials.email, response.body
            )),
        }
    }
}

/// Identifiers arrive as strings or numbers depending on the record.
fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn items_of<'a>(response: &'a ApiResponse, action: &str) -> ScenarioResult<&'a Vec<Value>> {
    match response.body["items"].as_array() {
        Some(items) => Ok(items),
        None => fail(format!("{action}: 'items' is not an array: {}", response.body)),
    }
}

fn array_of<'a>(response: &'a ApiResponse, action: &str) -> ScenarioResult<&'a Vec<Value>> {
    match response.body.as_array() {
        Some(items) => Ok(items),
        None => fail(format!("{action}: expected a JSON array, got {}", response.body)),
    }
}

/// Register a fresh account and log in with it.
pub struct RegistrationAndLogin;

#[async_trait]
impl Scenario<OnlineContext> for RegistrationAndLogin {
    fn name(&self) -> &str {
        "registration and login"
    }

    async fn run(&self, ctx: &OnlineContext) -> ScenarioResult<()> {
        let user = &ctx.config.integration_user;
        let role = user.role.as_deref();

        let response = ctx
            .client
            .register(&user.email, &user.password, role)
            .await?;
        ensure_status(&response, &[201, 409], "register")?;

        let response = ctx.client.login(&user.email, &user.password).await?;
        ensure_status(&response, &[200], "login")?;

        let logged_in = &response.body["user"];
        ensure_valid("logged-in user", validate_user(logged_in))?;
        ensure_eq("user.email", &json!(user.email), &logged_in["email"])?;
        if let Some(role) = role {
            ensure_eq("user.role", &json!(role), &logged_in["role"])?;
        }
        Ok(())
    }
}

/// Create, read back and update one defect.
pub struct DefectCrud;

#[async_trait]
impl Scenario<OnlineContext> for DefectCrud {
    fn name(&self) -> &str {
        "defect crud"
    }

    async fn run(&self, ctx: &OnlineContext) -> ScenarioResult<()> {
        let auth = ctx.sign_in(&ctx.config.test_user).await?;
        let auth = Some(auth.as_str());

        let projects = ctx.client.projects(auth).await?;
        ensure_status(&projects, &[200], "list projects")?;
        let Some(project_id) = array_of(&projects, "list projects")?
            .first()
            .and_then(|p| id_of(&p["id"]))
        else {
            return fail("list projects: no project to file a defect against");
        };

        let new_defect = NewDefect {
            project_id,
            title: format!("Contract test defect {}", generate_id("d")),
            description: normalize_whitespace(Some("Created by the contract harness.\n")),
            priority: Priority::High.to_string(),
            assignee_id: None,
            due_date: iso_days_ago(-30),
        };

        let created = ctx.client.create_defect(&new_defect, auth).await?;
        ensure_status(&created, &[201], "create defect")?;
        ensure_valid("created defect", validate_defect(&created.body))?;
        ensure_eq("created.title", &json!(new_defect.title), &created.body["title"])?;
        ensure_eq("created.status", &json!("new"), &created.body["status"])?;
        let Some(defect_id) = id_of(&created.body["id"]) else {
            return fail(format!("create defect: response has no id: {}", created.body));
        };

        let fetched = ctx.client.defect(&defect_id, auth).await?;
        ensure_status(&fetched, &[200], "get defect")?;
        ensure_eq("fetched.id", &created.body["id"], &fetched.body["id"])?;
        ensure_eq("fetched.title", &json!(new_defect.title), &fetched.body["title"])?;

        let changes = json!({
            "title": format!("{} (updated)", truncate(Some(new_defect.title.as_str()), 40)),
            "priority": Priority::Critical,
            "status": Status::InProgress,
        });
        let updated = ctx.client.update_defect(&defect_id, &changes, auth).await?;
        ensure_status(&updated, &[200], "update defect")?;
        ensure_eq("updated.title", &changes["title"], &updated.body["title"])?;
        ensure_eq("updated.priority", &changes["priority"], &updated.body["priority"])
    }
}

/// Status and priority filters and page bounds of the defect listing.
pub struct FilteringAndPagination;

#[async_trait]
impl Scenario<OnlineContext> for FilteringAndPagination {
    fn name(&self) -> &str {
        "filtering and pagination"
    }

    async fn run(&self, ctx: &OnlineContext) -> ScenarioResult<()> {
        let auth = ctx.sign_in(&ctx.config.test_user).await?;
        let auth = Some(auth.as_str());

        let all = ctx.client.defects(&DefectQuery::new(), auth).await?;
        ensure_status(&all, &[200], "list defects")?;
        ensure_valid("defect page", validate_defect_page(&all.body))?;

        let query = DefectQuery::new().with_status(Status::New.as_str());
        let new_only = ctx.client.defects(&query, auth).await?;
        ensure_status(&new_only, &[200], "filter by status")?;
        for item in items_of(&new_only, "filter by status")? {
            ensure_eq("filtered item status", &json!("new"), &item["status"])?;
        }

        let query = DefectQuery::new().with_priority(Priority::High.as_str());
        let high_only = ctx.client.defects(&query, auth).await?;
        ensure_status(&high_only, &[200], "filter by priority")?;

        let query = DefectQuery::new().with_page(1, 5);
        let page = ctx.client.defects(&query, auth).await?;
        ensure_status(&page, &[200], "paginate")?;
        let items = items_of(&page, "paginate")?;
        ensure(items.len() <= 5, || {
            format!("paginate: {} items on a page of 5", items.len())
        })?;
        ensure_eq("page", &json!(1), &page.body["page"])?;
        ensure_eq("pageSize", &json!(5), &page.body["pageSize"])
    }
}

/// Project listing and the aggregated defect statistics.
pub struct ProjectsAndStatistics;

#[async_trait]
impl Scenario<OnlineContext> for ProjectsAndStatistics {
    fn name(&self) -> &str {
        "projects and statistics"
    }

    async fn run(&self, ctx: &OnlineContext) -> ScenarioResult<()> {
        let auth = ctx.sign_in(&ctx.config.test_user).await?;
        let auth = Some(auth.as_str());

        let response = ctx.client.projects(auth).await?;
        ensure_status(&response, &[200], "list projects")?;
        let projects = array_of(&response, "list projects")?;
        ensure(!projects.is_empty(), || "list projects: empty list".to_string())?;
        for (i, project) in projects.iter().enumerate() {
            ensure_valid(&format!("projects[{i}]"), validate_project(project))?;
        }

        let stats = ctx.client.stats(auth).await?;
        ensure_status(&stats, &[200], "defect statistics")?;
        ensure_valid("stats", validate_stats(&stats.body))
    }
}

/// Protected routes reject anonymous calls and admit the administrator.
pub struct AuthEnforcement;

#[async_trait]
impl Scenario<OnlineContext> for AuthEnforcement {
    fn name(&self) -> &str {
        "authentication and authorization"
    }

    async fn run(&self, ctx: &OnlineContext) -> ScenarioResult<()> {
        let anonymous = ctx.client.projects(None).await?;
        ensure_status(&anonymous, &[401], "list projects without credentials")?;

        let admin = ctx.sign_in(&ctx.config.admin).await?;
        let auth = Some(admin.as_str());

        let projects = ctx.client.projects(auth).await?;
        ensure_status(&projects, &[200], "list projects as admin")?;
        let projects = array_of(&projects, "list projects as admin")?;
        ensure(!projects.is_empty(), || {
            "list projects as admin: empty list".to_string()
        })?;

        let users = ctx.client.users(auth).await?;
        ensure_status(&users, &[200], "list users")?;
        array_of(&users, "list users")?;

        let engineers = ctx.client.engineers(auth).await?;
        ensure_status(&engineers, &[200], "list engineers")?;
        array_of(&engineers, "list engineers")?;
        Ok(())
    }
}

/// Scenarios of the online tier, in execution order.
pub fn online_scenarios() -> ScenarioRegistry<OnlineContext> {
    let mut registry = ScenarioRegistry::new();
    registry.register(Box::new(RegistrationAndLogin));
    registry.register(Box::new(DefectCrud));
    registry.register(Box::new(FilteringAndPagination));
    registry.register(Box::new(ProjectsAndStatistics));
    registry.register(Box::new(AuthEnforcement));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Tier;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn context_for(server: &MockServer) -> OnlineContext {
        let config = HarnessConfig::default().with_base_url(server.uri());
        let client = ApiClient::with_timeout(config.api_base(), Duration::from_secs(5)).unwrap();
        OnlineContext::new(client, config)
    }

    #[test]
    fn test_id_of() {
        assert_eq!(id_of(&json!("u1")), Some("u1".to_string()));
        assert_eq!(id_of(&json!(7)), Some("7".to_string()));
        assert_eq!(id_of(&json!("")), None);
        assert_eq!(id_of(&Value::Null), None);
    }

    #[test]
    fn test_registry_order() {
        let registry = online_scenarios();
        assert_eq!(
            registry.names(),
            vec![
                "registration and login",
                "defect crud",
                "filtering and pagination",
                "projects and statistics",
                "authentication and authorization",
            ]
        );
    }

    #[tokio::test]
    async fn test_sign_in_tolerates_existing_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_partial_json(json!({"email": "test@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 3, "email": "test@example.com", "role": "engineer"}
            })))
            .mount(&server)
            .await;

        let ctx = context_for(&server).await;
        let id = ctx.sign_in(&ctx.config.test_user).await.unwrap();
        assert_eq!(id, "3");
    }

    #[tokio::test]
    async fn test_admin_sign_in_skips_registration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": "u1", "email": "admin@example.com", "role": "admin"}
            })))
            .mount(&server)
            .await;

        let ctx = context_for(&server).await;
        assert_eq!(ctx.sign_in(&ctx.config.admin).await.unwrap(), "u1");
    }

    #[tokio::test]
    async fn test_auth_enforcement_detects_open_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let ctx = context_for(&server).await;
        let err = AuthEnforcement.run(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("list projects without credentials"));
    }

    #[tokio::test]
    async fn test_filter_scenario_rejects_foreign_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": "u2", "email": "test@example.com", "role": "engineer"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/defects"))
            .and(header("authorization", "Bearer u2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "d1", "title": "t", "status": "closed",
                    "priority": "low", "createdAt": "2024-01-01T00:00:00.000Z"
                }],
                "total": 1, "page": 1, "pageSize": 20
            })))
            .mount(&server)
            .await;

        let ctx = context_for(&server).await;
        let report = online_scenarios().run_all(Tier::Integration, &ctx).await;
        let filtering = &report.outcomes[2];
        assert_eq!(filtering.name, "filtering and pagination");
        let failure = filtering.failure.as_deref().unwrap();
        assert!(failure.contains("filtered item status"));
    }
}
