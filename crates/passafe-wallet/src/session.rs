use crate::context::PassafeContext;
use crate::onboarding::OnboardingMachine;
use passafe_types::{PassafeError, PassafeResult, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Hands out one machine per session. Sessions share nothing but the
/// collaborators in the context, so they progress in parallel.
pub struct OnboardingSessions {
    context: PassafeContext,
    machines: Mutex<HashMap<SessionId, Arc<OnboardingMachine>>>,
}

impl OnboardingSessions {
    pub fn new(context: PassafeContext) -> Self {
        Self {
            context,
            machines: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, session: &SessionId) -> PassafeResult<Arc<OnboardingMachine>> {
        let mut machines = self.machines.lock().await;
        if let Some(machine) = machines.get(session) {
            return Ok(machine.clone());
        }

        let machine = Arc::new(OnboardingMachine::resume(self.context.clone(), session.clone())?);
        machines.insert(session.clone(), machine.clone());
        debug!(%session, active = machines.len(), "Session opened");
        Ok(machine)
    }

    /// Drops the in-memory machine. Persisted state is kept.
    ///
    /// Refused while any handle from [`get`](Self::get) is still alive, since
    /// that handle may be mid-transition and a reopened session would build a
    /// second machine over the same persisted state. Returns `false` when the
    /// session was not open.
    pub async fn close(&self, session: &SessionId) -> PassafeResult<bool> {
        let mut machines = self.machines.lock().await;
        let Some(machine) = machines.get(session) else {
            return Ok(false);
        };
        if Arc::strong_count(machine) > 1 {
            return Err(PassafeError::PreconditionNotMet(format!(
                "session {} is still in use; finish or drop pending operations first",
                session
            )));
        }
        machines.remove(session);
        debug!(%session, active = machines.len(), "Session closed");
        Ok(true)
    }

    pub async fn active(&self) -> Vec<SessionId> {
        self.machines.lock().await.keys().cloned().collect()
    }

    pub fn persisted(&self) -> PassafeResult<Vec<SessionId>> {
        self.context.store.list_sessions()
    }
}
