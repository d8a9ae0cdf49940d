//! Per-credential mutual exclusion for skill re-derivation.
//!
//! Replacing a credential's skill facts is a delete followed by inserts. Two
//! overlapping runs for the same credential can interleave and leave
//! duplicates, so every caller that derives skills goes through
//! [`CredentialLocks::run`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const LEASE_MS: u64 = 120_000;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(150);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub enum CredentialLocks {
    /// In-process mutex per credential. Correct for a single replica.
    Local(Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>),
    /// Redis lease (`SET NX PX`), shared by every replica.
    Redis(redis::Client),
}

impl CredentialLocks {
    pub fn local() -> Self {
        CredentialLocks::Local(Arc::new(Mutex::new(HashMap::new())))
    }

    pub fn redis(client: redis::Client) -> Self {
        CredentialLocks::Redis(client)
    }

    /// Runs `work` while holding the lock for `credential_id`.
    pub async fn run<F, T>(&self, credential_id: Uuid, work: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        match self {
            CredentialLocks::Local(slots) => {
                let slot = {
                    let mut slots = slots.lock().await;
                    slots.retain(|_, m| Arc::strong_count(m) > 1);
                    slots.entry(credential_id).or_default().clone()
                };
                let _guard = slot.lock().await;
                Ok(work.await)
            }
            CredentialLocks::Redis(client) => {
                let mut conn = client
                    .get_multiplexed_async_connection()
                    .await
                    .context("Failed to connect to Redis for credential lock")?;
                let key = lock_key(credential_id);
                let token = Uuid::new_v4().to_string();

                acquire(&mut conn, &key, &token).await?;
                let output = work.await;

                let released: i32 = redis::Script::new(RELEASE_SCRIPT)
                    .key(&key)
                    .arg(&token)
                    .invoke_async(&mut conn)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(%credential_id, "Failed to release credential lock: {e}");
                        0
                    });
                if released == 0 {
                    warn!(%credential_id, "Credential lock lease expired before release");
                }
                Ok(output)
            }
        }
    }
}

async fn acquire(
    conn: &mut redis::aio::MultiplexedConnection,
    key: &str,
    token: &str,
) -> Result<()> {
    let started = tokio::time::Instant::now();
    let mut waited = false;
    loop {
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(LEASE_MS)
            .query_async(conn)
            .await
            .context("Redis SET NX failed")?;
        if acquired.is_some() {
            debug!(key, "Credential lock acquired");
            return Ok(());
        }
        if !waited {
            warn!(key, "Credential is being re-derived elsewhere; waiting");
            waited = true;
        }
        if started.elapsed() >= ACQUIRE_TIMEOUT {
            bail!("Timed out waiting for lock {key}");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn lock_key(credential_id: Uuid) -> String {
    format!("skillmatch:credential-lock:{credential_id}")
}
