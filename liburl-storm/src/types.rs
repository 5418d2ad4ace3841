use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            s if s >= 500 => StatusClass::ServerError,
            s if s >= 400 => StatusClass::ClientError,
            s if s >= 300 => StatusClass::Redirect,
            _ => StatusClass::Success,
        }
    }
}

/// One probed target: the status it answered with, the URL as requested,
/// and the measured response length when length collection is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub status: u16,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

impl Outcome {
    pub fn class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }
}

// Identity is (status, url); length never splits otherwise equal outcomes.
impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status && self.url == other.url
    }
}

impl Eq for Outcome {}

impl Hash for Outcome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.status.hash(state);
        self.url.hash(state);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub every: u32,
    pub pause: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            every: 100,
            pause: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub workers: usize,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub insecure_ssl: bool,
    pub include_length: bool,
    pub cookie: Option<String>,
    pub user_agent: Option<String>,
    pub throttle: Option<ThrottleConfig>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout: Duration::from_secs(10),
            follow_redirects: false,
            insecure_ssl: false,
            include_length: false,
            cookie: None,
            user_agent: None,
            throttle: None,
        }
    }
}

/// Cooperative stop signal shared between the dispatcher and whoever is
/// watching for interrupts. Setting it stops new dispatches; probes already
/// handed to a worker still run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn classifies_status_brackets() {
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(204), StatusClass::Success);
        assert_eq!(StatusClass::of(299), StatusClass::Success);
        assert_eq!(StatusClass::of(300), StatusClass::Redirect);
        assert_eq!(StatusClass::of(307), StatusClass::Redirect);
        assert_eq!(StatusClass::of(399), StatusClass::Redirect);
        assert_eq!(StatusClass::of(400), StatusClass::ClientError);
        assert_eq!(StatusClass::of(404), StatusClass::ClientError);
        assert_eq!(StatusClass::of(499), StatusClass::ClientError);
        assert_eq!(StatusClass::of(500), StatusClass::ServerError);
        assert_eq!(StatusClass::of(503), StatusClass::ServerError);
    }

    #[test]
    fn sub_300_codes_count_as_success() {
        assert_eq!(StatusClass::of(100), StatusClass::Success);
        assert_eq!(StatusClass::of(101), StatusClass::Success);
    }

    #[test]
    fn outcome_identity_ignores_length() {
        let a = Outcome {
            status: 200,
            url: "http://example.com".into(),
            length: Some(1234),
        };
        let b = Outcome {
            status: 200,
            url: "http://example.com".into(),
            length: None,
        };
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn outcome_identity_distinguishes_status_and_url() {
        let base = Outcome {
            status: 200,
            url: "http://example.com".into(),
            length: None,
        };
        let other_status = Outcome {
            status: 404,
            ..base.clone()
        };
        let other_url = Outcome {
            url: "http://example.org".into(),
            ..base.clone()
        };

        let mut set = HashSet::new();
        set.insert(base);
        set.insert(other_status);
        set.insert(other_url);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.follow_redirects);
        assert!(!config.insecure_ssl);
        assert!(!config.include_length);
        assert!(config.throttle.is_none());
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let seen_by_dispatcher = flag.clone();
        assert!(!seen_by_dispatcher.is_cancelled());
        flag.cancel();
        assert!(seen_by_dispatcher.is_cancelled());
    }
}
