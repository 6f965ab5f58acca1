//! In-memory fake of the remote API for state-core tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::api::{ApiError, ApiResult, LoginRequest, RegisterRequest, TaskApi};
use crate::models::{AuthGrant, Credential, Role, Task, TaskDraft, TaskId, TaskPatch, UserProfile};
use crate::notify::NotificationScheduler;
use crate::session::SessionManager;
use crate::storage::MemoryStore;
use crate::tasks::TaskStore;

pub const VALID_TOKEN: &str = "token-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    List,
    Create,
    Patch,
    Put,
    Delete,
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub fn sample_task(id: i64, title: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: format!("{title} details"),
        is_completed: false,
        created_at: fixed_time(),
        updated_at: None,
        created_by: Some(1),
    }
}

pub fn profile(id: i64, username: &str) -> UserProfile {
    UserProfile {
        id,
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        role: Role::User,
    }
}

struct Account {
    password: String,
    profile: UserProfile,
    token: String,
}

#[derive(Default)]
struct FakeState {
    valid_token: Option<String>,
    accounts: HashMap<String, Account>,
    tasks: Vec<Task>,
    next_id: i64,
    failures: HashMap<Endpoint, VecDeque<ApiError>>,
    gates: HashMap<Endpoint, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<Endpoint>,
    completion_override: Option<bool>,
    omit_patch_fields: bool,
}

/// Behaves like the server: it owns its own task list and checks tokens.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        let mut state = FakeState {
            valid_token: Some(VALID_TOKEN.to_string()),
            next_id: 100,
            ..FakeState::default()
        };
        state.accounts.insert(
            "ada".to_string(),
            Account {
                password: "secret-pw".to_string(),
                profile: profile(1, "ada"),
                token: VALID_TOKEN.to_string(),
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        api.state.lock().tasks = tasks;
        api
    }

    /// Fail the next call to `endpoint` with `error`.
    pub fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        self.state
            .lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    /// Hold the next call to `endpoint` in flight until the sender fires.
    pub fn hold_next(&self, endpoint: Endpoint) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state
            .lock()
            .gates
            .entry(endpoint)
            .or_default()
            .push_back(receiver);
        sender
    }

    pub fn expire_token(&self) {
        self.state.lock().valid_token = None;
    }

    pub fn override_completion(&self, value: Option<bool>) {
        self.state.lock().completion_override = value;
    }

    pub fn omit_patch_fields(&self) {
        self.state.lock().omit_patch_fields = true;
    }

    pub fn calls(&self) -> Vec<Endpoint> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| **call == endpoint)
            .count()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    async fn enter(&self, endpoint: Endpoint) -> ApiResult<()> {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push(endpoint);
            state
                .gates
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self
            .state
            .lock()
            .failures
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);
        failure.map_or(Ok(()), Err)
    }

    fn check(&self, credential: &Credential) -> ApiResult<()> {
        let state = self.state.lock();
        if state.valid_token.as_deref() == Some(credential.expose()) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    fn patch_for(&self, task: &Task) -> TaskPatch {
        if self.state.lock().omit_patch_fields {
            return TaskPatch {
                id: Some(task.id),
                ..TaskPatch::default()
            };
        }
        TaskPatch {
            id: Some(task.id),
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            is_completed: Some(task.is_completed),
            updated_at: task.updated_at,
        }
    }
}

impl TaskApi for FakeApi {
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthGrant> {
        self.enter(Endpoint::Register).await?;
        let mut state = self.state.lock();
        if state.accounts.contains_key(&request.username) {
            return Err(ApiError::Rejected(
                "A user with that username already exists.".to_string(),
            ));
        }
        let id = i64::try_from(state.accounts.len()).unwrap_or_default() + 1;
        let token = format!("token-{}", request.username);
        let account = Account {
            password: request.password.clone(),
            profile: UserProfile {
                id,
                username: request.username.clone(),
                email: Some(request.email.clone()),
                role: Role::User,
            },
            token: token.clone(),
        };
        let grant = AuthGrant {
            user: account.profile.clone(),
            token: Credential::new(token.clone()),
        };
        state.accounts.insert(request.username.clone(), account);
        state.valid_token = Some(token);
        Ok(grant)
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthGrant> {
        self.enter(Endpoint::Login).await?;
        let mut state = self.state.lock();
        let grant = match state.accounts.get(&request.username) {
            Some(account) if account.password == request.password => AuthGrant {
                user: account.profile.clone(),
                token: Credential::new(account.token.clone()),
            },
            _ => return Err(ApiError::Rejected("Invalid credentials".to_string())),
        };
        state.valid_token = Some(grant.token.expose().to_string());
        Ok(grant)
    }

    async fn list_tasks(&self, credential: &Credential) -> ApiResult<Vec<Task>> {
        self.enter(Endpoint::List).await?;
        self.check(credential)?;
        Ok(self.server_tasks())
    }

    async fn create_task(&self, credential: &Credential, draft: &TaskDraft) -> ApiResult<Task> {
        self.enter(Endpoint::Create).await?;
        self.check(credential)?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let task = Task {
            id: TaskId::new(state.next_id),
            title: draft.title.clone(),
            description: draft.description.clone(),
            is_completed: false,
            created_at: fixed_time(),
            updated_at: None,
            created_by: Some(1),
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn set_completion(
        &self,
        credential: &Credential,
        id: TaskId,
        is_completed: bool,
    ) -> ApiResult<TaskPatch> {
        self.enter(Endpoint::Patch).await?;
        self.check(credential)?;
        let task = {
            let mut state = self.state.lock();
            let value = state.completion_override.unwrap_or(is_completed);
            let task = state
                .tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(ApiError::NotFound)?;
            task.is_completed = value;
            task.clone()
        };
        Ok(self.patch_for(&task))
    }

    async fn replace_task(
        &self,
        credential: &Credential,
        id: TaskId,
        draft: &TaskDraft,
    ) -> ApiResult<TaskPatch> {
        self.enter(Endpoint::Put).await?;
        self.check(credential)?;
        let task = {
            let mut state = self.state.lock();
            let task = state
                .tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(ApiError::NotFound)?;
            task.title.clone_from(&draft.title);
            task.description.clone_from(&draft.description);
            task.clone()
        };
        Ok(self.patch_for(&task))
    }

    async fn delete_task(&self, credential: &Credential, id: TaskId) -> ApiResult<()> {
        self.enter(Endpoint::Delete).await?;
        self.check(credential)?;
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        if state.tasks.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}

/// Session signed in as `ada` with the fake's valid token.
pub fn signed_in_session() -> Arc<SessionManager> {
    let session = SessionManager::new(MemoryStore::new());
    session
        .establish(Credential::new(VALID_TOKEN), profile(1, "ada"))
        .unwrap();
    Arc::new(session)
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub session: Arc<SessionManager>,
    pub notifications: NotificationScheduler,
    pub store: TaskStore<FakeApi>,
}

impl Harness {
    pub fn new(tasks: Vec<Task>) -> Self {
        let api = Arc::new(FakeApi::with_tasks(tasks));
        let session = signed_in_session();
        let notifications = NotificationScheduler::default();
        let store = TaskStore::new(
            Arc::clone(&api),
            Arc::clone(&session),
            notifications.clone(),
        );
        Self {
            api,
            session,
            notifications,
            store,
        }
    }

    /// Signed in with `tasks` already loaded.
    pub async fn loaded(tasks: Vec<Task>) -> Self {
        let harness = Self::new(tasks);
        harness.store.load().await.unwrap();
        harness
    }

    pub fn notification_text(&self) -> Option<String> {
        self.notifications.current().map(|notification| notification.text)
    }
}
