//! Typed access to the gateway plus the client-held model it synchronizes.
//!
//! [`ClientStore`] is only ever changed through [`ClientStore::apply`]: the
//! update is turned into a full replacement collection, pushed, and the
//! server's answer becomes the new state. A failed push leaves the last
//! confirmed state in place.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::{
    AccessRequestBody, AccessRequestResponse, LoginRequest, LoginResponse, MoodDataResponse,
    MoodUpdateRequest, ScheduleSmsRequest, ScheduleSmsResponse, SignupRequest, SignupResponse,
    TasksResponse, TasksUpdateRequest, UserDataResponse, UserSnapshot, VerifyResponse,
};
use crate::models::mood::{DateKey, Mood, MoodMap};
use crate::models::task::{NewTask, TaskEntry};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("no task with id {0}")]
    UnknownTask(Uuid),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SyncClient {
    /// `base_url` is the server origin, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::NotAuthenticated)
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<SignupResponse, ClientError> {
        let body = SignupRequest {
            email: email.into(),
            password: password.into(),
        };
        let resp = self.http.post(self.url("/signup")).json(&body).send().await?;
        decode(resp).await
    }

    /// Keeps the issued token for later calls and returns the initial store.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<ClientStore, ClientError> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let resp = self.http.post(self.url("/login")).json(&body).send().await?;
        let login: LoginResponse = decode(resp).await?;
        self.token = Some(login.token);
        Ok(ClientStore::from_snapshot(login.user))
    }

    pub async fn verify(&self) -> Result<VerifyResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/verify"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn user_data(&self) -> Result<UserDataResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/user/data"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn replace_moods(&self, moods: &MoodMap) -> Result<MoodMap, ClientError> {
        let body = MoodUpdateRequest {
            mood_data: moods.clone(),
        };
        let resp = self
            .http
            .put(self.url("/user/mood"))
            .bearer_auth(self.bearer()?)
            .json(&body)
            .send()
            .await?;
        let data: MoodDataResponse = decode(resp).await?;
        Ok(data.mood_data)
    }

    pub async fn replace_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<TaskEntry>, ClientError> {
        let body = TasksUpdateRequest { tasks };
        let resp = self
            .http
            .put(self.url("/user/tasks"))
            .bearer_auth(self.bearer()?)
            .json(&body)
            .send()
            .await?;
        let data: TasksResponse = decode(resp).await?;
        Ok(data.tasks)
    }

    pub async fn schedule_sms(
        &self,
        phone: &str,
        message: &str,
        delay: Duration,
    ) -> Result<ScheduleSmsResponse, ClientError> {
        let body = ScheduleSmsRequest {
            phone: phone.into(),
            message: message.into(),
            delay: Some(delay.as_millis() as f64),
        };
        let resp = self
            .http
            .post(self.url("/schedule-sms"))
            .bearer_auth(self.bearer()?)
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn request_access(
        &self,
        body: &AccessRequestBody,
    ) -> Result<AccessRequestResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/twilio-access-request"))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

/// A single user action against the local model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Update {
    SetMood { day: DateKey, mood: Mood },
    ClearMood(DateKey),
    AddTask { text: String, date: DateTime<Utc> },
    ToggleTask(Uuid),
    DeleteTask(Uuid),
    ClearCompleted,
}

/// The full collection an update pushes.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Moods(MoodMap),
    Tasks(Vec<NewTask>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStore {
    pub moods: MoodMap,
    pub tasks: Vec<TaskEntry>,
}

impl ClientStore {
    pub fn from_snapshot(snapshot: UserSnapshot) -> Self {
        Self {
            moods: snapshot.mood_data,
            tasks: snapshot.tasks,
        }
    }

    pub fn mood_on(&self, day: &DateKey) -> Option<Mood> {
        self.moods.get(day).copied()
    }

    /// What the store would look like after `update`, as a replace payload.
    /// `self` is not touched.
    pub fn plan(&self, update: &Update) -> Result<Change, ClientError> {
        let change = match update {
            Update::SetMood { day, mood } => {
                let mut moods = self.moods.clone();
                moods.insert(*day, *mood);
                Change::Moods(moods)
            }
            Update::ClearMood(day) => {
                let mut moods = self.moods.clone();
                moods.remove(day);
                Change::Moods(moods)
            }
            Update::AddTask { text, date } => {
                let mut tasks = vec![NewTask {
                    text: text.clone(),
                    completed: false,
                    date: *date,
                }];
                tasks.extend(self.tasks.iter().map(NewTask::from));
                Change::Tasks(tasks)
            }
            Update::ToggleTask(id) => {
                self.find_task(*id)?;
                Change::Tasks(
                    self.tasks
                        .iter()
                        .map(|t| {
                            let mut task = NewTask::from(t);
                            if t.id == *id {
                                task.completed = !task.completed;
                            }
                            task
                        })
                        .collect(),
                )
            }
            Update::DeleteTask(id) => {
                self.find_task(*id)?;
                Change::Tasks(
                    self.tasks
                        .iter()
                        .filter(|t| t.id != *id)
                        .map(NewTask::from)
                        .collect(),
                )
            }
            Update::ClearCompleted => Change::Tasks(
                self.tasks
                    .iter()
                    .filter(|t| !t.completed)
                    .map(NewTask::from)
                    .collect(),
            ),
        };
        Ok(change)
    }

    /// Push `update` and adopt the server's copy of the affected collection.
    pub async fn apply(&mut self, client: &SyncClient, update: Update) -> Result<(), ClientError> {
        match self.plan(&update)? {
            Change::Moods(moods) => {
                self.moods = client.replace_moods(&moods).await?;
            }
            Change::Tasks(tasks) => {
                self.tasks = client.replace_tasks(tasks).await?;
            }
        }
        Ok(())
    }

    fn find_task(&self, id: Uuid) -> Result<&TaskEntry, ClientError> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(ClientError::UnknownTask(id))
    }
}
