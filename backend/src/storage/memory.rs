use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AccessRequestRegistry, CredentialStore, MoodLedger, Result, Storage, StorageError, TaskLedger,
};
use crate::models::{
    access_request::{AccessRequest, NewAccessRequest},
    mood::MoodMap,
    task::{sort_by_date_desc, NewTask, TaskEntry},
    user::User,
};

#[derive(Default)]
struct StorageData {
    users: HashMap<Uuid, User>,
    moods: HashMap<Uuid, MoodMap>,
    tasks: HashMap<Uuid, Vec<TaskEntry>>,
    access_requests: Vec<AccessRequest>,
}

/// In-memory storage. Every operation holds one lock, so each replace is
/// trivially atomic and concurrent replaces for a user are serialized.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<StorageData>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored access requests; lets tests assert no duplicate rows.
    pub async fn access_request_count(&self) -> usize {
        self.data.lock().await.access_requests.len()
    }

    /// Remove a user and, like the foreign-key cascade, everything they own.
    pub async fn remove_user(&self, user_id: Uuid) {
        let mut data = self.data.lock().await;
        data.users.remove(&user_id);
        data.moods.remove(&user_id);
        data.tasks.remove(&user_id);
    }
}

fn ensure_user(data: &StorageData, user_id: Uuid) -> Result<()> {
    if data.users.contains_key(&user_id) {
        Ok(())
    } else {
        Err(StorageError::NotFound("User not found".into()))
    }
}

#[async_trait]
impl CredentialStore for MemoryStorage {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Uuid> {
        let mut data = self.data.lock().await;
        if data.users.values().any(|u| u.email == email) {
            return Err(StorageError::Conflict("User already exists".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        let id = user.id;
        data.users.insert(id, user);
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let data = self.data.lock().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.data.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl MoodLedger for MemoryStorage {
    async fn moods(&self, user_id: Uuid) -> Result<MoodMap> {
        let data = self.data.lock().await;
        Ok(data.moods.get(&user_id).cloned().unwrap_or_default())
    }

    async fn replace_moods(&self, user_id: Uuid, moods: &MoodMap) -> Result<()> {
        let mut data = self.data.lock().await;
        ensure_user(&data, user_id)?;
        data.moods.insert(user_id, moods.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskLedger for MemoryStorage {
    async fn tasks(&self, user_id: Uuid) -> Result<Vec<TaskEntry>> {
        let data = self.data.lock().await;
        Ok(data.tasks.get(&user_id).cloned().unwrap_or_default())
    }

    async fn replace_tasks(&self, user_id: Uuid, tasks: &[NewTask]) -> Result<()> {
        let mut data = self.data.lock().await;
        ensure_user(&data, user_id)?;

        let mut entries: Vec<TaskEntry> = tasks
            .iter()
            .map(|t| TaskEntry {
                id: Uuid::new_v4(),
                text: t.text.clone(),
                completed: t.completed,
                date: t.date,
            })
            .collect();
        sort_by_date_desc(&mut entries);
        data.tasks.insert(user_id, entries);
        Ok(())
    }
}

#[async_trait]
impl AccessRequestRegistry for MemoryStorage {
    async fn register_access_request(&self, request: &NewAccessRequest) -> Result<bool> {
        let mut data = self.data.lock().await;
        if data.access_requests.iter().any(|r| r.email == request.email) {
            return Ok(false);
        }
        if data
            .access_requests
            .iter()
            .any(|r| r.phone_number == request.phone_number)
        {
            return Err(StorageError::Conflict(
                "An account with this email or phone number already exists.".into(),
            ));
        }

        data.access_requests.push(AccessRequest {
            id: Uuid::new_v4(),
            username: request.username.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            company: request.company.clone(),
            reference_id: request.reference_id.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
