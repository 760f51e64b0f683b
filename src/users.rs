use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::User;

/// 全ユーザーを保持するテーブル
///
/// ステーションとは別のロックで守る。パスワードのハッシュ化はロックの外で済ませておくこと。
#[derive(Debug, Default)]
pub struct UserTable {
    users: Mutex<Vec<User>>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// メールアドレスが重複していれば `Validation`
    pub fn insert(&self, user: User) -> StoreResult<User> {
        let mut users = self.lock();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Validation(format!("email {} is already registered", user.email)));
        }
        users.push(user.clone());
        Ok(user)
    }

    pub fn remove(&self, id: Uuid) -> StoreResult<User> {
        let mut users = self.lock();
        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("user with id {id}")))?;
        Ok(users.remove(index))
    }

    /// ID 以外をまとめて置き換える
    pub fn replace(&self, user: User) -> StoreResult<User> {
        let mut users = self.lock();
        if users.iter().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Validation(format!("email {} is already registered", user.email)));
        }
        let existing = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user with id {}", user.id)))?;
        *existing = user.clone();
        Ok(user)
    }

    pub fn all(&self) -> Vec<User> {
        self.lock().clone()
    }

    pub fn by_id(&self, id: Uuid) -> StoreResult<User> {
        self.lock()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user with id {id}")))
    }

    pub fn by_email(&self, email: &str) -> StoreResult<User> {
        self.lock()
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user with email {email}")))
    }
}
