use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// In-process counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub users_registered: Arc<AtomicU64>,
    pub logins_succeeded: Arc<AtomicU64>,
    pub logins_failed: Arc<AtomicU64>,
    pub books_created: Arc<AtomicU64>,
    pub books_updated: Arc<AtomicU64>,
    pub books_deleted: Arc<AtomicU64>,
    pub books_borrowed: Arc<AtomicU64>,
    pub books_returned: Arc<AtomicU64>,
    pub reviews_created: Arc<AtomicU64>,
    pub bans_applied: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            users_registered: Arc::new(AtomicU64::new(0)),
            logins_succeeded: Arc::new(AtomicU64::new(0)),
            logins_failed: Arc::new(AtomicU64::new(0)),
            books_created: Arc::new(AtomicU64::new(0)),
            books_updated: Arc::new(AtomicU64::new(0)),
            books_deleted: Arc::new(AtomicU64::new(0)),
            books_borrowed: Arc::new(AtomicU64::new(0)),
            books_returned: Arc::new(AtomicU64::new(0)),
            reviews_created: Arc::new(AtomicU64::new(0)),
            bans_applied: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            users_registered: self.users_registered.load(Ordering::Relaxed),
            logins_succeeded: self.logins_succeeded.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            books_created: self.books_created.load(Ordering::Relaxed),
            books_updated: self.books_updated.load(Ordering::Relaxed),
            books_deleted: self.books_deleted.load(Ordering::Relaxed),
            books_borrowed: self.books_borrowed.load(Ordering::Relaxed),
            books_returned: self.books_returned.load(Ordering::Relaxed),
            reviews_created: self.reviews_created.load(Ordering::Relaxed),
            bans_applied: self.bans_applied.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub users_registered: u64,
    pub logins_succeeded: u64,
    pub logins_failed: u64,
    pub books_created: u64,
    pub books_updated: u64,
    pub books_deleted: u64,
    pub books_borrowed: u64,
    pub books_returned: u64,
    pub reviews_created: u64,
    pub bans_applied: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Prometheus text exposition (counters plus the uptime gauge).
    pub fn to_prometheus(&self) -> String {
        let counters = [
            ("users_registered", "Users registered", self.users_registered),
            ("logins_succeeded", "Successful logins", self.logins_succeeded),
            ("logins_failed", "Failed logins", self.logins_failed),
            ("books_created", "Books created", self.books_created),
            ("books_updated", "Books updated", self.books_updated),
            ("books_deleted", "Books deleted", self.books_deleted),
            ("books_borrowed", "Books borrowed", self.books_borrowed),
            ("books_returned", "Books returned", self.books_returned),
            ("reviews_created", "Reviews created", self.reviews_created),
            ("bans_applied", "Bans applied", self.bans_applied),
        ];
        let mut out = String::new();
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP buecherei_{name} {help}\n# TYPE buecherei_{name} counter\nbuecherei_{name} {value}\n"
            ));
        }
        out.push_str(&format!(
            "# HELP buecherei_uptime_seconds Uptime seconds\n# TYPE buecherei_uptime_seconds gauge\nbuecherei_uptime_seconds {}\n",
            self.uptime_seconds
        ));
        out
    }
}
