use passafe_types::{OnboardingState, PassafeError, PassafeResult, SessionId};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";

/// Persisted onboarding progress keyed by session.
pub trait OnboardingStore: Send + Sync {
    fn load(&self, session: &SessionId) -> PassafeResult<Option<OnboardingState>>;

    fn save(&self, session: &SessionId, state: &OnboardingState) -> PassafeResult<()>;

    fn delete(&self, session: &SessionId) -> PassafeResult<()>;

    fn list_sessions(&self) -> PassafeResult<Vec<SessionId>>;
}

#[derive(Serialize, Deserialize)]
struct SchemaInfo {
    version: u32,
    created_at: i64,
}

fn decode_state(bytes: &[u8]) -> PassafeResult<OnboardingState> {
    let state: OnboardingState = serde_json::from_slice(bytes)
        .map_err(|e| PassafeError::Serialization(format!("Failed to decode state: {}", e)))?;
    state.validate()?;
    Ok(state)
}

fn encode_state(state: &OnboardingState) -> PassafeResult<Vec<u8>> {
    serde_json::to_vec(state)
        .map_err(|e| PassafeError::Serialization(format!("Failed to encode state: {}", e)))
}

pub struct SledOnboardingStore {
    db: Db,
    schema: Tree,
    sessions: Tree,
}

impl SledOnboardingStore {
    pub fn open(path: impl AsRef<Path>) -> PassafeResult<Self> {
        let path = path.as_ref();
        info!("Opening onboarding store at {:?}", path);

        let db = sled::Config::new()
            .path(path)
            .open()
            .map_err(|e| PassafeError::Storage(format!("Failed to open database: {}", e)))?;
        Self::from_db(db)
    }

    pub fn temporary() -> PassafeResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| PassafeError::Storage(format!("Failed to open temp database: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> PassafeResult<Self> {
        let schema = Self::open_tree(&db, "schema")?;
        let sessions = Self::open_tree(&db, "sessions")?;
        let store = Self { db, schema, sessions };
        store.ensure_schema()?;
        Ok(store)
    }

    fn open_tree(db: &Db, name: &str) -> PassafeResult<Tree> {
        db.open_tree(name)
            .map_err(|e| PassafeError::Storage(format!("Failed to open {} tree: {}", name, e)))
    }

    fn ensure_schema(&self) -> PassafeResult<()> {
        let stored = self
            .schema
            .get(SCHEMA_KEY)
            .map_err(|e| PassafeError::Storage(format!("Failed to read schema: {}", e)))?;

        match stored {
            None => {
                let info = SchemaInfo {
                    version: CURRENT_SCHEMA_VERSION,
                    created_at: chrono::Utc::now().timestamp(),
                };
                let bytes = serde_json::to_vec(&info)
                    .map_err(|e| PassafeError::Storage(format!("Failed to serialize schema: {}", e)))?;
                self.schema
                    .insert(SCHEMA_KEY, bytes)
                    .map_err(|e| PassafeError::Storage(format!("Failed to store schema: {}", e)))?;
                self.flush()
            }
            Some(bytes) => {
                let info: SchemaInfo = serde_json::from_slice(&bytes)
                    .map_err(|e| PassafeError::Storage(format!("Failed to deserialize schema: {}", e)))?;
                if info.version > CURRENT_SCHEMA_VERSION {
                    return Err(PassafeError::Storage(format!(
                        "Database schema version {} is newer than supported {}",
                        info.version, CURRENT_SCHEMA_VERSION
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn flush(&self) -> PassafeResult<()> {
        self.db
            .flush()
            .map_err(|e| PassafeError::Storage(format!("Failed to flush: {}", e)))?;
        Ok(())
    }
}

impl OnboardingStore for SledOnboardingStore {
    fn load(&self, session: &SessionId) -> PassafeResult<Option<OnboardingState>> {
        let stored = self
            .sessions
            .get(session.as_str().as_bytes())
            .map_err(|e| PassafeError::Storage(format!("Failed to read session: {}", e)))?;
        stored.map(|bytes| decode_state(&bytes)).transpose()
    }

    fn save(&self, session: &SessionId, state: &OnboardingState) -> PassafeResult<()> {
        let bytes = encode_state(state)?;
        self.sessions
            .insert(session.as_str().as_bytes(), bytes)
            .map_err(|e| PassafeError::Storage(format!("Failed to write session: {}", e)))?;
        self.flush()?;
        debug!(%session, step = %state.step(), "Persisted onboarding state");
        Ok(())
    }

    fn delete(&self, session: &SessionId) -> PassafeResult<()> {
        self.sessions
            .remove(session.as_str().as_bytes())
            .map_err(|e| PassafeError::Storage(format!("Failed to delete session: {}", e)))?;
        self.flush()
    }

    fn list_sessions(&self) -> PassafeResult<Vec<SessionId>> {
        self.sessions
            .iter()
            .keys()
            .map(|key| {
                let key = key.map_err(|e| PassafeError::Storage(e.to_string()))?;
                let id = std::str::from_utf8(&key)
                    .map_err(|e| PassafeError::Storage(format!("Invalid session key: {}", e)))?;
                id.parse()
            })
            .collect()
    }
}

pub struct MemoryOnboardingStore {
    sessions: RwLock<HashMap<SessionId, Vec<u8>>>,
}

impl MemoryOnboardingStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOnboardingStore {
    fn default() -> Self {
        Self::new()
    }
}

// States go through the same encoding as on disk so tests exercise the
// serialized form.
impl OnboardingStore for MemoryOnboardingStore {
    fn load(&self, session: &SessionId) -> PassafeResult<Option<OnboardingState>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| PassafeError::Storage("Lock poisoned".into()))?;
        sessions.get(session).map(|bytes| decode_state(bytes)).transpose()
    }

    fn save(&self, session: &SessionId, state: &OnboardingState) -> PassafeResult<()> {
        let bytes = encode_state(state)?;
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| PassafeError::Storage("Lock poisoned".into()))?;
        sessions.insert(session.clone(), bytes);
        Ok(())
    }

    fn delete(&self, session: &SessionId) -> PassafeResult<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| PassafeError::Storage("Lock poisoned".into()))?;
        sessions.remove(session);
        Ok(())
    }

    fn list_sessions(&self) -> PassafeResult<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| PassafeError::Storage("Lock poisoned".into()))?;
        Ok(sessions.keys().cloned().collect())
    }
}
