//! In-process repositories backing the handler tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    model::{
        leave_request::{
            BulkOutcome, LeaveRequest, LeaveStatus, NewLeaveRequest, decide, dedupe_ids, plan_bulk,
        },
        user::{NewUser, User, UserUpdate},
    },
    repository::{leave_request::{LeaveRequestRepository, now}, user::UserRepository},
};

struct Table<T> {
    next_id: u64,
    rows: BTreeMap<u64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryLeaveRequests {
    table: Mutex<Table<LeaveRequest>>,
}

impl InMemoryLeaveRequests {
    fn ids_for_user(&self, user_id: u64) -> Vec<u64> {
        let table = self.table.lock().unwrap();
        table
            .rows
            .values()
            .filter(|r| r.user == user_id)
            .map(|r| r.id)
            .collect()
    }

    /// Moves a record's `updated_at` into the past so a later write is observable.
    pub fn backdate(&self, id: u64, by: chrono::Duration) {
        if let Some(record) = self.table.lock().unwrap().rows.get_mut(&id) {
            record.updated_at = record.updated_at - by;
        }
    }

    fn select(&self, keep: impl Fn(&LeaveRequest) -> bool) -> Vec<LeaveRequest> {
        let table = self.table.lock().unwrap();
        table.rows.values().filter(|r| keep(r)).cloned().collect()
    }
}

#[async_trait]
impl LeaveRequestRepository for InMemoryLeaveRequests {
    async fn create(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        new.check()?;

        let mut table = self.table.lock().unwrap();
        let id = table.next_id();
        let created_at = now();
        let record = LeaveRequest {
            id,
            user: new.user,
            leave_category: new.leave_category,
            leave_from: new.leave_from,
            leave_to: new.leave_to,
            contact_during_leave: new.contact_during_leave,
            reason: new.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            created_at,
            updated_at: created_at,
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        Ok(self.table.lock().unwrap().rows.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<LeaveRequest>> {
        Ok(self.select(|_| true))
    }

    async fn find_by_user(&self, user_id: u64) -> AppResult<Vec<LeaveRequest>> {
        Ok(self.select(|r| r.user == user_id))
    }

    async fn find_by_status(&self, status: LeaveStatus) -> AppResult<Vec<LeaveRequest>> {
        Ok(self.select(|r| r.status == status))
    }

    async fn update_status(
        &self,
        id: u64,
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<LeaveRequest> {
        let mut table = self.table.lock().unwrap();
        let record = table.rows.get_mut(&id).ok_or(AppError::NotFound {
            resource: "Leave request",
            id,
        })?;

        record.status = decide(id, record.status, target)?;
        record.updated_at = now();
        if approved_by.is_some() {
            record.approved_by = approved_by;
        }
        Ok(record.clone())
    }

    async fn update_status_bulk(
        &self,
        ids: &[u64],
        target: LeaveStatus,
        approved_by: Option<u64>,
    ) -> AppResult<BulkOutcome> {
        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            return Err(AppError::validation("No leave requests selected"));
        }

        let mut table = self.table.lock().unwrap();
        let current: HashMap<u64, LeaveStatus> = ids
            .iter()
            .filter_map(|id| table.rows.get(id).map(|r| (*id, r.status)))
            .collect();

        let plan = plan_bulk(&ids, &current, target)?;
        let updated_at = now();
        for id in &plan.to_update {
            if let Some(record) = table.rows.get_mut(id) {
                record.status = target;
                record.updated_at = updated_at;
                if approved_by.is_some() {
                    record.approved_by = approved_by;
                }
            }
        }
        Ok(plan.into_outcome())
    }

    async fn delete(&self, id: u64) -> AppResult<()> {
        self.table.lock().unwrap().rows.remove(&id);
        Ok(())
    }
}

pub struct InMemoryUsers {
    table: Mutex<Table<User>>,
    leaves: Arc<InMemoryLeaveRequests>,
}

impl InMemoryUsers {
    pub fn new(leaves: Arc<InMemoryLeaveRequests>) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            leaves,
        }
    }

    fn with_leave_ids(&self, mut user: User) -> User {
        user.leave_requests = self.leaves.ids_for_user(user.id);
        user
    }

    fn email_taken(table: &Table<User>, email: &str, except: Option<u64>) -> bool {
        table
            .rows
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        new.check()?;

        let mut table = self.table.lock().unwrap();
        if Self::email_taken(&table, &new.email, None) {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let id = table.next_id();
        let user = User {
            id,
            name: new.name,
            email: new.email,
            contact: new.contact,
            role: new.role,
            course: new.course,
            semester: new.semester,
            leave_requests: Vec::new(),
            created_at: now(),
            password_hash: new.password_hash,
        };
        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let found = {
            let table = self.table.lock().unwrap();
            table.rows.values().find(|u| u.email == email).cloned()
        };
        Ok(found.map(|u| self.with_leave_ids(u)))
    }

    async fn find_by_id(&self, id: u64) -> AppResult<Option<User>> {
        let found = self.table.lock().unwrap().rows.get(&id).cloned();
        Ok(found.map(|u| self.with_leave_ids(u)))
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let users: Vec<User> = self.table.lock().unwrap().rows.values().cloned().collect();
        Ok(users.into_iter().map(|u| self.with_leave_ids(u)).collect())
    }

    async fn update(&self, id: u64, changes: UserUpdate) -> AppResult<User> {
        if changes.is_empty() {
            return Err(AppError::validation("No fields provided for update"));
        }

        let updated = {
            let mut table = self.table.lock().unwrap();
            if let Some(email) = &changes.email {
                if Self::email_taken(&table, email, Some(id)) {
                    return Err(AppError::Conflict("Email already registered".into()));
                }
            }
            let user = table
                .rows
                .get_mut(&id)
                .ok_or(AppError::NotFound { resource: "User", id })?;
            changes.apply(user);
            user.clone()
        };
        Ok(self.with_leave_ids(updated))
    }

    async fn delete(&self, id: u64) -> AppResult<()> {
        match self.table.lock().unwrap().rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound { resource: "User", id }),
        }
    }

    async fn emails(&self) -> AppResult<Vec<String>> {
        let table = self.table.lock().unwrap();
        Ok(table.rows.values().map(|u| u.email.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::{Duration, NaiveDate};

    fn leave(user: u64) -> NewLeaveRequest {
        NewLeaveRequest {
            user,
            leave_category: "Casual Leave".into(),
            leave_from: NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
            leave_to: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
            contact_during_leave: String::new(),
            reason: "family visit".into(),
        }
    }

    #[actix_web::test]
    async fn single_update_touches_only_status_fields() {
        let repo = InMemoryLeaveRequests::default();
        let created = repo.create(leave(1)).await.unwrap();
        let other = repo.create(leave(2)).await.unwrap();
        repo.backdate(created.id, Duration::seconds(60));
        let before = repo.find_by_id(created.id).await.unwrap().unwrap();

        let updated = repo
            .update_status(created.id, LeaveStatus::Approved, Some(9))
            .await
            .unwrap();

        assert_eq!(updated.status, LeaveStatus::Approved);
        assert_eq!(updated.approved_by, Some(9));
        assert!(updated.updated_at > before.updated_at);
        assert_eq!(updated.user, created.user);
        assert_eq!(updated.leave_category, created.leave_category);
        assert_eq!(updated.leave_from, created.leave_from);
        assert_eq!(updated.leave_to, created.leave_to);
        assert_eq!(updated.created_at, created.created_at);

        let untouched = repo.find_by_id(other.id).await.unwrap().unwrap();
        assert_eq!(untouched, other);
    }

    #[actix_web::test]
    async fn decided_request_is_not_redecided() {
        let repo = InMemoryLeaveRequests::default();
        let created = repo.create(leave(1)).await.unwrap();
        repo.update_status(created.id, LeaveStatus::Rejected, None)
            .await
            .unwrap();

        let again = repo
            .update_status(created.id, LeaveStatus::Approved, Some(3))
            .await;
        assert!(matches!(again, Err(AppError::AlreadyDecided { .. })));

        let stored = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Rejected);
        assert_eq!(stored.approved_by, None);
    }

    #[actix_web::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryLeaveRequests::default();
        assert!(matches!(
            repo.update_status(77, LeaveStatus::Approved, None).await,
            Err(AppError::NotFound { id: 77, .. })
        ));
    }

    #[actix_web::test]
    async fn pending_filter_excludes_decided_requests() {
        let repo = InMemoryLeaveRequests::default();
        let a = repo.create(leave(1)).await.unwrap();
        let b = repo.create(leave(1)).await.unwrap();
        let c = repo.create(leave(2)).await.unwrap();
        repo.update_status(a.id, LeaveStatus::Approved, None).await.unwrap();
        repo.update_status_bulk(&[b.id], LeaveStatus::Rejected, None)
            .await
            .unwrap();

        let pending = repo.find_by_status(LeaveStatus::Pending).await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![c.id]);

        let mine = repo.find_by_user(1).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[actix_web::test]
    async fn bulk_update_changes_exactly_the_valid_ids() {
        let repo = InMemoryLeaveRequests::default();
        let ids: Vec<u64> = {
            let mut ids = Vec::new();
            for _ in 0..4 {
                ids.push(repo.create(leave(1)).await.unwrap().id);
            }
            ids
        };

        for id in &ids {
            repo.backdate(*id, Duration::seconds(60));
        }
        let before = repo.find_all().await.unwrap();

        let outcome = repo
            .update_status_bulk(&[ids[0], ids[1], 999, ids[2]], LeaveStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(outcome.modified, 3);

        for old in &before {
            let now = repo.find_by_id(old.id).await.unwrap().unwrap();
            assert_eq!(now.created_at, old.created_at);
            if old.id == ids[3] {
                assert_eq!(now.updated_at, old.updated_at);
            } else {
                assert!(now.updated_at > old.updated_at, "updatedAt of {}", old.id);
            }
        }

        let approved = repo.find_by_status(LeaveStatus::Approved).await.unwrap();
        assert_eq!(approved.len(), 3);
        let pending = repo.find_by_status(LeaveStatus::Pending).await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[3]]);
    }

    #[actix_web::test]
    async fn delete_is_idempotent() {
        let repo = InMemoryLeaveRequests::default();
        let created = repo.create(leave(1)).await.unwrap();
        repo.delete(created.id).await.unwrap();
        repo.delete(created.id).await.unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn users_see_their_leave_requests() {
        let leaves = Arc::new(InMemoryLeaveRequests::default());
        let users = InMemoryUsers::new(leaves.clone());

        let user = users
            .create(NewUser {
                name: "Asha".into(),
                email: "asha@college.edu".into(),
                contact: String::new(),
                role: Role::Student,
                course: Some("B.Tech".into()),
                semester: Some(5),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let request = leaves.create(leave(user.id)).await.unwrap();

        let found = users.find_by_email("asha@college.edu").await.unwrap().unwrap();
        assert_eq!(found.leave_requests, vec![request.id]);

        // No cascade: the request outlives its owner.
        users.delete(user.id).await.unwrap();
        assert!(leaves.find_by_id(request.id).await.unwrap().is_some());
        assert!(users.find_by_id(user.id).await.unwrap().is_none());
    }
}
