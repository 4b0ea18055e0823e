use parking_lot::RwLock;
use tracing::info;
use voxlink_core::SecurityStatus;

/// Session-local access-control state, explicitly constructed per
/// session and torn down with it.
///
/// When a biometric reference (a visual description of the authorized
/// user) is registered, the session starts `Locked` and the system
/// instruction tells the model to verify before doing anything else.
/// The biometric confirmation tool flips the gate. Enforcement of
/// "don't call other tools while locked" is a model-behavior convention,
/// not a guarantee from this engine.
pub struct SecurityContext {
    reference: Option<String>,
    status: RwLock<SecurityStatus>,
}

impl SecurityContext {
    /// Creates a context. A registered reference starts the session
    /// locked; no reference leaves the gate open.
    pub fn new(reference: Option<String>) -> Self {
        let initial = if reference.is_some() {
            SecurityStatus::Locked
        } else {
            SecurityStatus::Open
        };
        Self {
            reference,
            status: RwLock::new(initial),
        }
    }

    /// The registered biometric reference, if any.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Current gate state.
    pub fn status(&self) -> SecurityStatus {
        *self.status.read()
    }

    /// Applies the result of a biometric verification and returns the
    /// new gate state.
    pub fn apply_verification(&self, matched: bool) -> SecurityStatus {
        let next = if matched {
            SecurityStatus::Unlocked
        } else {
            SecurityStatus::Locked
        };
        info!(matched, status = ?next, "biometric verification applied");
        *self.status.write() = next;
        next
    }

    /// Resets the gate to its initial state. Called on session stop so
    /// no verification outlives the session it was performed in.
    pub fn teardown(&self) {
        *self.status.write() = if self.reference.is_some() {
            SecurityStatus::Locked
        } else {
            SecurityStatus::Open
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reference_means_open() {
        let ctx = SecurityContext::new(None);
        assert_eq!(ctx.status(), SecurityStatus::Open);
    }

    #[test]
    fn reference_locks_until_verified() {
        let ctx = SecurityContext::new(Some("tall, glasses".into()));
        assert_eq!(ctx.status(), SecurityStatus::Locked);

        assert_eq!(ctx.apply_verification(true), SecurityStatus::Unlocked);
        assert_eq!(ctx.status(), SecurityStatus::Unlocked);

        assert_eq!(ctx.apply_verification(false), SecurityStatus::Locked);
    }

    #[test]
    fn teardown_does_not_leak_verification() {
        let ctx = SecurityContext::new(Some("tall, glasses".into()));
        ctx.apply_verification(true);
        ctx.teardown();
        assert_eq!(ctx.status(), SecurityStatus::Locked);
    }
}
