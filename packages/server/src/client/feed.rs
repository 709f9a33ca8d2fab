//! Periodically refreshed snapshot of the active boosts.
//!
//! Timer polls and on-demand refreshes (after a transaction) are not
//! coordinated: whichever response arrives last replaces the snapshot.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime},
};

use anyhow::Result;
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::chain::{Boost, BoostContract};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostSnapshot {
    /// Monotonic refresh counter; 0 until the first successful fetch.
    pub revision: u64,
    /// Unix seconds of the fetch that produced this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<u64>,
    pub boosts: Vec<Boost>,
}

impl BoostSnapshot {
    pub fn find(&self, id: u64) -> Option<&Boost> {
        self.boosts.iter().find(|b| b.id == id)
    }
}

pub struct BoostFeed {
    contract: BoostContract,
    snapshot_tx: watch::Sender<Arc<BoostSnapshot>>,
    revision: AtomicU64,
}

impl BoostFeed {
    pub fn new(contract: BoostContract) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(Arc::new(BoostSnapshot::default()));
        Arc::new(Self {
            contract,
            snapshot_tx,
            revision: AtomicU64::new(0),
        })
    }

    pub fn contract(&self) -> &BoostContract {
        &self.contract
    }

    pub fn snapshot(&self) -> Arc<BoostSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<BoostSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Fetch `getActiveBoosts()` and publish the result.
    pub async fn refresh(&self) -> Result<Arc<BoostSnapshot>> {
        let boosts = self.contract.active_boosts().await?;
        let fetched_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .ok();
        let snapshot = Arc::new(BoostSnapshot {
            revision: self.revision.fetch_add(1, Ordering::Relaxed) + 1,
            fetched_at,
            boosts,
        });
        tracing::debug!(
            revision = snapshot.revision,
            count = snapshot.boosts.len(),
            "boost snapshot refreshed"
        );
        self.snapshot_tx.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Poll forever on a fixed period. Failed polls keep the previous snapshot.
    pub fn spawn_polling(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let feed = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = feed.refresh().await {
                    tracing::warn!(error = %format!("{:#}", e), "error loading boosts");
                }
            }
        })
    }
}
