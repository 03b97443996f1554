//! Per-test admission inside the external runner's process.
//!
//! The retrier restricts a rerun by persisting the failing set and flagging
//! the next invocation with [`RETRY_ADMISSION_FLAG`]. A harness embedding
//! this crate builds a [`RetryAdmission`] once at startup:
//!
//! ```no_run
//! # use flakeloop::core::admission::{AdmissionPolicy, RetryAdmission, invocation_is_flagged};
//! # use flakeloop::io::state::RetryStateStore;
//! # fn main() -> anyhow::Result<()> {
//! let store = RetryStateStore::new(".flakeloop/retry-specs");
//! let policy = RetryAdmission::new(
//!     invocation_is_flagged(std::env::args()),
//!     store.load()?,
//!     None,
//! );
//! assert!(policy.admits("Suite A > does X") || true);
//! # Ok(())
//! # }
//! ```
//!
//! The policy wraps any previously-installed admission policy instead of
//! overwriting it: suppressed cases are never offered to the inner policy,
//! admitted cases still pass through it as a final check.

use tracing::debug;

/// Marker argument appended to every supervised invocation so the admission
/// filter knows to consult persisted retry state.
pub const RETRY_ADMISSION_FLAG: &str = "--retry-admission";

/// Decides, per test case, whether it is eligible to execute.
pub trait AdmissionPolicy {
    /// `full_name` is the complete hierarchical identifier as printed by the
    /// runner (suite path + case description).
    fn admits(&self, full_name: &str) -> bool;
}

impl<F> AdmissionPolicy for F
where
    F: Fn(&str) -> bool,
{
    fn admits(&self, full_name: &str) -> bool {
        self(full_name)
    }
}

/// Returns true when the invocation carries the retry-admission marker.
pub fn invocation_is_flagged<I>(args: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    args.into_iter()
        .any(|arg| arg.as_ref() == RETRY_ADMISSION_FLAG)
}

/// Admission policy restricting execution to the persisted retry set.
pub struct RetryAdmission {
    /// Lowercased retry set; `None` means the run is unrestricted.
    retry_set: Option<Vec<String>>,
    inner: Option<Box<dyn AdmissionPolicy>>,
}

impl RetryAdmission {
    /// Build the policy for one runner invocation.
    ///
    /// `persisted` is whatever the retry state store last wrote. When the
    /// invocation is not flagged, or no state is present, every case is
    /// admitted (subject only to `inner`).
    pub fn new(
        flagged: bool,
        persisted: Option<Vec<String>>,
        inner: Option<Box<dyn AdmissionPolicy>>,
    ) -> Self {
        let retry_set = if flagged {
            persisted.map(|names| names.into_iter().map(|name| name.to_lowercase()).collect())
        } else {
            None
        };
        Self { retry_set, inner }
    }

    fn inner_admits(&self, full_name: &str) -> bool {
        self.inner
            .as_ref()
            .is_none_or(|policy| policy.admits(full_name))
    }
}

impl AdmissionPolicy for RetryAdmission {
    fn admits(&self, full_name: &str) -> bool {
        match &self.retry_set {
            None => self.inner_admits(full_name),
            Some(set) => {
                let needle = full_name.to_lowercase();
                if set.iter().any(|name| *name == needle) {
                    self.inner_admits(full_name)
                } else {
                    debug!(case = full_name, "suppressed by retry state");
                    false
                }
            }
        }
    }
}
