//! In-memory school store
//!
//! Useful for testing without database dependencies. Failure injection lets
//! callers exercise the persistence-error path.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{NewSchool, School};

use super::{SchoolStore, StoreError};

/// In-memory mock implementation of [`SchoolStore`]
pub struct MockSchoolStore {
    schools: RwLock<Vec<School>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl MockSchoolStore {
    /// Create a new, empty mock store
    pub fn new() -> Self {
        Self {
            schools: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Create a store whose every operation fails
    pub fn failing() -> Self {
        let store = Self::new();
        store.set_failing(true);
        store
    }

    /// Toggle failure injection
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.schools.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockSchoolStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchoolStore for MockSchoolStore {
    fn backend(&self) -> &'static str {
        "mock"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn insert(&self, school: &NewSchool) -> Result<i64, StoreError> {
        self.check()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut schools = self.schools.write().map_err(|_| StoreError::LockPoisoned)?;
        schools.push(school.clone().into_school(id));
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<School>, StoreError> {
        self.check()?;

        let schools = self.schools.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(schools.clone())
    }
}
