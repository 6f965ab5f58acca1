//! Composition root shared by the front ends.
//!
//! [`TaskflowApp`] owns one session manager, one notification scheduler and
//! one task store, and adds the auth flows and view routing on top of them.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::api::{HttpApiClient, LoginRequest, RegisterRequest, TaskApi};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{AuthGrant, Task, TaskId, UserProfile};
use crate::notify::NotificationScheduler;
use crate::router::{View, ViewRouter};
use crate::session::{SessionManager, SessionState, Termination};
use crate::storage::KeyValueStore;
use crate::tasks::{PendingEdit, TaskStore};
use crate::util::require_field;

const MIN_PASSWORD_LENGTH: usize = 6;
const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Please check your inputs.";
const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials.";

pub struct TaskflowApp<A: TaskApi> {
    api: Arc<A>,
    session: Arc<SessionManager>,
    notifications: NotificationScheduler,
    tasks: TaskStore<A>,
    router: Mutex<ViewRouter>,
}

impl TaskflowApp<HttpApiClient> {
    /// Build an app that talks to the server described by `config`.
    pub fn connect(config: &ClientConfig, store: impl KeyValueStore) -> Result<Self> {
        let api = HttpApiClient::new(config)?;
        Ok(Self::new(api, store, config.notification_ttl))
    }
}

impl<A: TaskApi> TaskflowApp<A> {
    pub fn new(api: A, store: impl KeyValueStore, notification_ttl: Duration) -> Self {
        let api = Arc::new(api);
        let session = Arc::new(SessionManager::new(store));
        let notifications = NotificationScheduler::new(notification_ttl);
        let tasks = TaskStore::new(
            Arc::clone(&api),
            Arc::clone(&session),
            notifications.clone(),
        );
        Self {
            api,
            session,
            notifications,
            tasks,
            router: Mutex::new(ViewRouter::default()),
        }
    }

    /// Restore any persisted session and pick the initial view.
    pub fn start(&self) -> SessionState {
        let state = self.session.restore();
        let view = if state.is_authenticated() {
            View::Dashboard
        } else {
            View::Home
        };
        self.router.lock().navigate(view, &state);
        state
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile> {
        let request = self.validated(|| {
            let username = require_field(username, "Username")?;
            let email = require_field(email, "Email")?;
            let password = require_field(password, "Password")?;
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(format!(
                    "Password must be at least {MIN_PASSWORD_LENGTH} characters."
                ));
            }
            Ok(RegisterRequest {
                username,
                email,
                password,
            })
        })?;

        let grant = self.api.register(&request).await.map_err(|error| {
            self.notifications
                .failure(error.user_message(REGISTER_FAILED_MESSAGE));
            Error::Api(error)
        })?;
        self.enter_dashboard(grant, "Registration successful!").await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let request = self.validated(|| {
            Ok(LoginRequest {
                username: require_field(username, "Username")?,
                password: require_field(password, "Password")?,
            })
        })?;

        let grant = self.api.login(&request).await.map_err(|error| {
            self.notifications
                .failure(error.user_message(LOGIN_FAILED_MESSAGE));
            Error::Api(error)
        })?;
        self.enter_dashboard(grant, "Login successful!").await
    }

    /// Sign out. Returns `None` when there was no session to end.
    pub fn logout(&self) -> Option<Termination> {
        let ended = self.session.terminate(Termination::UserLogout);
        self.tasks.clear();
        self.notifications.clear();
        self.router.lock().on_session_ended(Termination::UserLogout);
        ended
    }

    pub async fn load(&self) -> Result<usize> {
        let result = self.tasks.load().await;
        self.follow_expiry(result)
    }

    pub async fn create(&self, title: &str, description: &str) -> Result<Task> {
        let result = self.tasks.create(title, description).await;
        self.follow_expiry(result)
    }

    pub async fn remove(&self, id: TaskId) -> Result<()> {
        let result = self.tasks.remove(id).await;
        self.follow_expiry(result)
    }

    pub async fn toggle_completion(&self, id: TaskId) -> Result<bool> {
        let result = self.tasks.toggle_completion(id).await;
        self.follow_expiry(result)
    }

    /// Start editing the task with `id` from the current collection.
    pub fn begin_edit(&self, id: TaskId) -> Result<PendingEdit> {
        let task = self.tasks.task(id).ok_or_else(|| {
            self.notifications.failure(crate::api::NOT_FOUND_MESSAGE);
            Error::Api(crate::api::ApiError::NotFound)
        })?;
        Ok(self.tasks.begin_edit(&task))
    }

    pub fn set_draft(&self, title: Option<&str>, description: Option<&str>) -> Result<PendingEdit> {
        self.tasks.set_draft(title, description)
    }

    pub fn cancel_edit(&self) -> Option<PendingEdit> {
        self.tasks.cancel_edit()
    }

    pub async fn save_edit(&self, id: TaskId) -> Result<Option<Task>> {
        let result = self.tasks.save_edit(id).await;
        self.follow_expiry(result)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub const fn tasks(&self) -> &TaskStore<A> {
        &self.tasks
    }

    pub const fn notifications(&self) -> &NotificationScheduler {
        &self.notifications
    }

    pub fn view(&self) -> View {
        self.router.lock().current()
    }

    pub fn navigate(&self, view: View) -> View {
        let state = self.session.state();
        self.router.lock().navigate(view, &state)
    }

    fn validated<T>(&self, build: impl FnOnce() -> std::result::Result<T, String>) -> Result<T> {
        build().map_err(|message| {
            self.notifications.failure(message.clone());
            Error::Validation(message)
        })
    }

    async fn enter_dashboard(&self, grant: AuthGrant, message: &str) -> Result<UserProfile> {
        let profile = grant.user.clone();
        if let Err(error) = self.session.establish(grant.token, grant.user) {
            self.notifications.failure(error.to_string());
            return Err(error);
        }
        self.notifications.success(message);
        self.navigate(View::Dashboard);

        // The load reports its own failures; the sign-in itself succeeded.
        if let Err(error) = self.load().await {
            tracing::debug!("Initial task load failed: {}", error);
        }
        Ok(profile)
    }

    fn follow_expiry<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(Error::SessionExpired)) {
            self.router.lock().on_session_ended(Termination::Expired);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::ApiError;
    use crate::notify::Outcome;
    use crate::session::SESSION_EXPIRED_MESSAGE;
    use crate::storage::{MemoryStore, CREDENTIAL_KEY, PROFILE_KEY};
    use crate::testing::{profile, sample_task, Endpoint, FakeApi, VALID_TOKEN};

    const TTL: Duration = Duration::from_millis(3000);

    fn app_with(tasks: Vec<Task>) -> (TaskflowApp<FakeApi>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let app = TaskflowApp::new(FakeApi::with_tasks(tasks), Arc::clone(&store), TTL);
        (app, store)
    }

    fn two_tasks() -> Vec<Task> {
        vec![sample_task(1, "Write report"), sample_task(2, "Buy milk")]
    }

    #[tokio::test]
    async fn start_without_persisted_session_shows_home() {
        let (app, _store) = app_with(Vec::new());
        assert_eq!(app.start(), SessionState::Anonymous);
        assert_eq!(app.view(), View::Home);
    }

    #[tokio::test]
    async fn start_restores_persisted_session() {
        let (app, store) = app_with(two_tasks());
        store.set(CREDENTIAL_KEY, VALID_TOKEN).unwrap();
        store
            .set(PROFILE_KEY, &serde_json::to_string(&profile(1, "ada")).unwrap())
            .unwrap();

        assert!(app.start().is_authenticated());
        assert_eq!(app.view(), View::Dashboard);
        assert_eq!(app.load().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn login_load_toggle_then_notification_expires() {
        let (app, store) = app_with(two_tasks());
        app.start();

        let user = app.login("ada", "secret-pw").await.unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(app.view(), View::Dashboard);
        assert_eq!(app.tasks().len(), 2);
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some(VALID_TOKEN));

        assert!(app.toggle_completion(TaskId::new(1)).await.unwrap());
        let tasks = app.tasks().tasks();
        assert!(tasks[0].is_completed);
        assert!(!tasks[1].is_completed);

        let notification = app.notifications().current().unwrap();
        assert_eq!(notification.text, "Task marked as completed!");
        assert_eq!(notification.outcome, Outcome::Success);

        tokio::time::sleep(TTL + Duration::from_millis(1)).await;
        assert_eq!(app.notifications().current(), None);
    }

    #[tokio::test]
    async fn rejected_login_shows_server_message() {
        let (app, _store) = app_with(Vec::new());
        app.start();

        let error = app.login("ada", "wrong").await.unwrap_err();
        assert!(matches!(error, Error::Api(ApiError::Rejected(_))));
        assert!(!app.session().is_authenticated());
        assert_eq!(app.view(), View::Home);
        assert_eq!(
            app.notifications().current().map(|n| n.text).as_deref(),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn register_checks_inputs_before_any_request() {
        let (app, _store) = app_with(Vec::new());

        let error = app.register("bob", "bob@example.com", "abc").await.unwrap_err();
        assert!(matches!(error, Error::Validation(message) if message.contains("6 characters")));
        let error = app.register("bob", "  ", "secret-pw").await.unwrap_err();
        assert!(matches!(error, Error::Validation(message) if message.contains("Email")));
        assert_eq!(app.api().call_count(Endpoint::Register), 0);
    }

    #[tokio::test]
    async fn register_signs_in_and_loads() {
        let (app, _store) = app_with(Vec::new());

        let user = app
            .register(" bob ", "bob@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.username, "bob");
        assert!(app.session().is_authenticated());
        assert_eq!(app.view(), View::Dashboard);
        assert_eq!(app.api().call_count(Endpoint::List), 1);
        assert_eq!(
            app.notifications().current().map(|n| n.text).as_deref(),
            Some("Registration successful!")
        );
    }

    #[tokio::test]
    async fn failed_initial_load_keeps_sign_in() {
        let (app, _store) = app_with(two_tasks());
        app.api()
            .fail_next(Endpoint::List, ApiError::Network("timed out".to_string()));

        app.login("ada", "secret-pw").await.unwrap();
        assert!(app.session().is_authenticated());
        assert!(app.tasks().is_empty());
        assert_eq!(
            app.notifications().current().map(|n| n.text).as_deref(),
            Some("Network error. Please check your connection.")
        );
    }

    #[tokio::test]
    async fn logout_clears_state_and_is_idempotent() {
        let (app, store) = app_with(two_tasks());
        app.login("ada", "secret-pw").await.unwrap();
        let task = app.tasks().task(TaskId::new(1)).unwrap();
        app.tasks().begin_edit(&task);

        assert_eq!(app.logout(), Some(Termination::UserLogout));
        assert!(matches!(
            app.session().credential_for(),
            Err(Error::NotAuthenticated)
        ));
        assert!(app.tasks().is_empty());
        assert_eq!(app.tasks().pending_edit(), None);
        assert_eq!(app.notifications().current(), None);
        assert_eq!(app.view(), View::Home);
        assert!(store.is_empty());

        assert_eq!(app.logout(), None);
        assert_eq!(app.view(), View::Home);
    }

    #[tokio::test]
    async fn toggle_in_flight_across_repeat_login_still_reconciles() {
        let (app, _store) = app_with(two_tasks());
        app.login("ada", "secret-pw").await.unwrap();
        let gate = app.api().hold_next(Endpoint::Patch);

        let (toggled, ()) = tokio::join!(app.toggle_completion(TaskId::new(1)), async {
            tokio::task::yield_now().await;
            app.login("ada", "secret-pw").await.unwrap();
            gate.send(()).unwrap();
        });

        assert!(toggled.unwrap());
        assert!(app.session().is_authenticated());
        assert_eq!(app.tasks().tasks(), app.api().server_tasks());
        assert_eq!(
            app.notifications().current().unwrap().text,
            "Task marked as completed!"
        );
    }

    #[tokio::test]
    async fn failed_remove_across_repeat_login_still_rolls_back() {
        let (app, _store) = app_with(two_tasks());
        app.login("ada", "secret-pw").await.unwrap();
        let gate = app.api().hold_next(Endpoint::Delete);
        app.api().fail_next(
            Endpoint::Delete,
            ApiError::Server {
                status: 500,
                message: "database unavailable".to_string(),
            },
        );

        let (removed, ()) = tokio::join!(app.remove(TaskId::new(2)), async {
            tokio::task::yield_now().await;
            app.login("ada", "secret-pw").await.unwrap();
            gate.send(()).unwrap();
        });

        assert!(matches!(removed, Err(Error::Api(ApiError::Server { .. }))));
        assert_eq!(app.tasks().tasks(), app.api().server_tasks());
        assert_eq!(app.tasks().len(), 2);
    }

    #[tokio::test]
    async fn expired_credential_routes_to_login() {
        let (app, _store) = app_with(two_tasks());
        app.login("ada", "secret-pw").await.unwrap();
        app.api().expire_token();

        let error = app.toggle_completion(TaskId::new(1)).await.unwrap_err();
        assert!(matches!(error, Error::SessionExpired));
        assert_eq!(app.view(), View::Login);
        assert!(app.tasks().is_empty());
        assert_eq!(
            app.notifications().current().map(|n| n.text).as_deref(),
            Some(SESSION_EXPIRED_MESSAGE)
        );
        assert!(matches!(app.load().await, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn dashboard_needs_a_session() {
        let (app, _store) = app_with(Vec::new());
        app.start();
        assert_eq!(app.navigate(View::Dashboard), View::Login);
    }

    #[tokio::test]
    async fn edit_flow_through_app() {
        let (app, _store) = app_with(two_tasks());
        app.login("ada", "secret-pw").await.unwrap();

        assert!(matches!(
            app.begin_edit(TaskId::new(9)),
            Err(Error::Api(ApiError::NotFound))
        ));

        app.begin_edit(TaskId::new(2)).unwrap();
        app.set_draft(Some("Buy bread"), None).unwrap();
        let saved = app.save_edit(TaskId::new(2)).await.unwrap().unwrap();
        assert_eq!(saved.title, "Buy bread");
        assert_eq!(app.api().server_tasks()[1].title, "Buy bread");
    }
}
