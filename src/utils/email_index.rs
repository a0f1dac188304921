use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;

use crate::{error::AppResult, repository::UserRepository};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Two-layer "is this email free?" index in front of the user store.
///
/// The cuckoo filter answers "definitely free"; the cache answers
/// "recently seen as taken"; anything else falls through to the store.
pub struct EmailIndex {
    filter: RwLock<CuckooFilter<String>>,
    /// true => email is TAKEN
    taken: Cache<String, bool>,
}

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Default for EmailIndex {
    fn default() -> Self {
        Self::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)
    }
}

impl EmailIndex {
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(capacity, false_positive_rate)),
            taken: Cache::builder()
                .max_capacity(capacity as u64)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    /// Check if an email might be registered (false positives possible)
    fn might_exist(&self, email: &String) -> bool {
        self.filter
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(email)
    }

    pub async fn mark_taken(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(&email);
        self.taken.insert(email, true).await;
    }

    /// Called when a user is deleted or changes address.
    pub async fn forget(&self, email: &str) {
        let email = normalize(email);
        self.filter
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&email);
        self.taken.invalidate(&email).await;
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    pub async fn is_available(&self, email: &str, users: &dyn UserRepository) -> AppResult<bool> {
        let email = normalize(email);

        // 1️⃣ Cuckoo filter: fast negative
        if !self.might_exist(&email) {
            return Ok(true);
        }

        // 2️⃣ Moka cache: fast positive
        if self.taken.get(&email).await.unwrap_or(false) {
            return Ok(false);
        }

        // 3️⃣ Store fallback
        match users.find_by_email(&email).await? {
            Some(_) => {
                self.taken.insert(email, true).await;
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Loads every stored email into the filter, in batches.
    ///
    /// Only the filter is filled. The cache is left to `is_available`, which
    /// confirms against the store, so a user deleted while the warm-up runs
    /// is never reported as taken.
    pub async fn warmup(&self, users: &dyn UserRepository, batch_size: usize) -> Result<usize> {
        let emails = users
            .emails()
            .await
            .context("failed to load emails for the email index")?;

        for batch in emails.chunks(batch_size.max(1)) {
            let mut filter = self
                .filter
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for email in batch {
                filter.add(&normalize(email));
            }
        }

        log::info!("Email index warmup complete: {} users", emails.len());
        Ok(emails.len())
    }
}
