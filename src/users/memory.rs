use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::users::{
    model::{NewUser, User, UserUpdate},
    repo::{DirectoryError, UserDirectory},
};

/// In-process directory used when no database is configured.
///
/// Users are kept in insertion order behind one lock; uniqueness is checked
/// under the write lock so concurrent sign-ups cannot both win.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<Vec<User>>,
}

impl MemoryDirectory {
    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<User>>, DirectoryError> {
        self.users
            .read()
            .map_err(|_| anyhow::anyhow!("user directory lock poisoned").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<User>>, DirectoryError> {
        self.users
            .write()
            .map_err(|_| anyhow::anyhow!("user directory lock poisoned").into())
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn create(&self, user: NewUser) -> Result<User, DirectoryError> {
        let mut users = self.write()?;
        if users.iter().any(|u| u.username == user.username) {
            return Err(DirectoryError::DuplicateUsername);
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(DirectoryError::DuplicateEmail);
        }
        let created = user.into_user(Uuid::new_v4());
        users.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<User, DirectoryError> {
        self.read()?
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.read()?.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.read()?.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(self.read()?.clone())
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, DirectoryError> {
        let mut users = self.write()?;
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(DirectoryError::NotFound)?;
        if let Some(email) = &update.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(DirectoryError::DuplicateEmail);
            }
        }
        let user = &mut users[idx];
        user.apply(update);
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DirectoryError> {
        let mut users = self.write()?;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, DirectoryError> {
        Ok(self.read()?.len() as i64)
    }
}
