//! Maintenance state machine.
//!
//! Holds the active flag, operator message and branding, and an optional
//! expiry deadline backed by a single one-shot timer. Arming a new state
//! always cancels the previous timer first; an expiring timer performs the
//! same disable transition an administrator would, broadcast included.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::events::ServerEvent;
use crate::hub::Hub;
use crate::models::MaintenanceSnapshot;

/// What happens to live connections when maintenance turns on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Close every connection and clear the registry.
    Hard,
    /// Leave connections open; they only get the maintenance event.
    Soft,
}

impl EvictionPolicy {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "soft" => EvictionPolicy::Soft,
            "hard" => EvictionPolicy::Hard,
            other => {
                warn!("Unknown eviction policy {:?}, using hard", other);
                EvictionPolicy::Hard
            }
        }
    }
}

const DEFAULT_MESSAGE: &str = "The board is down for maintenance. Please check back soon.";

struct State {
    active: bool,
    message: String,
    logo_url: Option<String>,
    until: Option<DateTime<Utc>>,
    /// Bumped on every transition so a stale timer can tell it lost the
    /// race against a newer enable/disable.
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

pub struct MaintenanceManager {
    state: Mutex<State>,
    hub: Arc<Hub>,
    eviction: EvictionPolicy,
    /// Handed to timer tasks so an expiring timer can re-enter the manager.
    weak_self: Weak<MaintenanceManager>,
}

impl MaintenanceManager {
    pub fn new(hub: Arc<Hub>, eviction: EvictionPolicy) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(State {
                active: false,
                message: DEFAULT_MESSAGE.to_string(),
                logo_url: None,
                until: None,
                epoch: 0,
                timer: None,
            }),
            hub,
            eviction,
            weak_self: weak_self.clone(),
        })
    }

    pub fn snapshot(&self) -> MaintenanceSnapshot {
        snapshot_of(&self.state.lock())
    }

    /// Gate for write endpoints: fails with the current snapshot while
    /// maintenance is active.
    pub fn ensure_writable(&self) -> ApiResult<()> {
        let state = self.state.lock();
        if state.active {
            Err(ApiError::Maintenance(snapshot_of(&state)))
        } else {
            Ok(())
        }
    }

    /// Turn maintenance on. Message and branding fall back to their prior
    /// values when not provided; a positive duration arms a one-shot
    /// expiry timer, replacing any timer already pending.
    pub fn enable(
        &self,
        message: Option<String>,
        logo_url: Option<String>,
        duration_minutes: Option<i64>,
    ) -> MaintenanceSnapshot {
        let snapshot = {
            let mut state = self.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.epoch += 1;
            state.active = true;
            if let Some(message) = message {
                state.message = message;
            }
            if let Some(logo_url) = logo_url {
                state.logo_url = Some(logo_url);
            }
            state.until = None;

            if let Some(minutes) = duration_minutes.filter(|m| *m > 0) {
                state.until = Some(Utc::now() + Duration::minutes(minutes));
                let manager = self.weak_self.clone();
                let epoch = state.epoch;
                state.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(std::time::Duration::from_secs(minutes as u64 * 60))
                        .await;
                    if let Some(manager) = manager.upgrade() {
                        manager.expire(epoch);
                    }
                }));
            }
            snapshot_of(&state)
        };

        match snapshot.until {
            Some(until) => info!("Maintenance enabled until {}", until),
            None => info!("Maintenance enabled"),
        }

        self.hub.broadcast(&ServerEvent::Maintenance(snapshot.clone()), None);
        if self.eviction == EvictionPolicy::Hard {
            self.hub.close_all();
        }
        snapshot
    }

    /// Turn maintenance off and cancel any pending timer.
    pub fn disable(&self) -> MaintenanceSnapshot {
        let snapshot = {
            let mut state = self.state.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.epoch += 1;
            state.active = false;
            state.until = None;
            snapshot_of(&state)
        };

        info!("Maintenance disabled");
        self.hub.broadcast(&ServerEvent::Maintenance(snapshot.clone()), None);
        snapshot
    }

    /// Timer path: disable only if no newer transition has happened since
    /// this timer was armed.
    fn expire(&self, epoch: u64) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.epoch != epoch || !state.active {
                return;
            }
            state.epoch += 1;
            state.active = false;
            state.until = None;
            state.timer = None;
            snapshot_of(&state)
        };

        info!("Maintenance window expired");
        self.hub.broadcast(&ServerEvent::Maintenance(snapshot), None);
    }
}

fn snapshot_of(state: &State) -> MaintenanceSnapshot {
    MaintenanceSnapshot {
        status: state.active,
        message: state.message.clone(),
        logo_url: state.logo_url.clone(),
        until: state.until,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Outbound;
    use std::time::Duration as StdDuration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn manager(eviction: EvictionPolicy) -> (Arc<MaintenanceManager>, Arc<Hub>) {
        let hub = Arc::new(Hub::new());
        (MaintenanceManager::new(hub.clone(), eviction), hub)
    }

    /// Drain one maintenance frame, returning its `status` flag.
    fn next_status(rx: &mut UnboundedReceiver<Outbound>) -> Option<bool> {
        match rx.try_recv().ok()? {
            Outbound::Event(frame) => {
                let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
                assert_eq!(value["type"], "maintenance");
                value["payload"]["status"].as_bool()
            }
            Outbound::Close => panic!("unexpected close frame"),
        }
    }

    #[tokio::test]
    async fn enable_gates_writes_until_disable() {
        let (manager, _hub) = manager(EvictionPolicy::Soft);
        manager.ensure_writable().unwrap();

        manager.enable(Some("brb".to_string()), None, None);
        let err = manager.ensure_writable().unwrap_err();
        match err {
            ApiError::Maintenance(snapshot) => {
                assert!(snapshot.status);
                assert_eq!(snapshot.message, "brb");
                assert!(snapshot.until.is_none());
            }
            other => panic!("expected maintenance error, got {other:?}"),
        }

        manager.disable();
        manager.ensure_writable().unwrap();
    }

    #[tokio::test]
    async fn message_and_branding_survive_when_not_resupplied() {
        let (manager, _hub) = manager(EvictionPolicy::Soft);
        manager.enable(
            Some("first".to_string()),
            Some("https://example.com/logo.png".to_string()),
            None,
        );
        let snapshot = manager.enable(None, None, None);
        assert_eq!(snapshot.message, "first");
        assert_eq!(
            snapshot.logo_url.as_deref(),
            Some("https://example.com/logo.png")
        );
    }

    #[tokio::test]
    async fn every_transition_is_broadcast() {
        let (manager, hub) = manager(EvictionPolicy::Soft);
        let (_member, mut rx) = hub.connect();

        manager.enable(None, None, None);
        manager.disable();

        assert_eq!(next_status(&mut rx), Some(true));
        assert_eq!(next_status(&mut rx), Some(false));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn hard_eviction_clears_the_registry() {
        let (manager, hub) = manager(EvictionPolicy::Hard);
        let (_member, mut rx) = hub.connect();

        manager.enable(None, None, None);
        assert_eq!(hub.count(), 0);

        // The banner still went out before the close.
        assert_eq!(next_status(&mut rx), Some(true));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
    }

    #[tokio::test]
    async fn soft_eviction_leaves_connections_open() {
        let (manager, hub) = manager(EvictionPolicy::Soft);
        let (_member, _rx) = hub.connect();
        manager.enable(None, None, None);
        assert_eq!(hub.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_disables_and_broadcasts() {
        let (manager, hub) = manager(EvictionPolicy::Soft);
        let (_member, mut rx) = hub.connect();

        let snapshot = manager.enable(None, None, Some(5));
        assert!(snapshot.until.is_some());
        assert_eq!(next_status(&mut rx), Some(true));

        tokio::time::sleep(StdDuration::from_secs(5 * 60 + 1)).await;
        tokio::task::yield_now().await;

        assert_eq!(next_status(&mut rx), Some(false));
        manager.ensure_writable().unwrap();
        assert!(manager.snapshot().until.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_the_previous_timer() {
        let (manager, hub) = manager(EvictionPolicy::Soft);
        let (_member, mut rx) = hub.connect();

        manager.enable(None, None, Some(1));
        manager.enable(None, None, Some(10));
        assert_eq!(next_status(&mut rx), Some(true));
        assert_eq!(next_status(&mut rx), Some(true));

        // Past the first deadline: the replaced timer must not fire.
        tokio::time::sleep(StdDuration::from_secs(2 * 60)).await;
        tokio::task::yield_now().await;
        assert!(manager.ensure_writable().is_err());
        assert!(rx.try_recv().is_err());

        // The second deadline still does.
        tokio::time::sleep(StdDuration::from_secs(9 * 60)).await;
        tokio::task::yield_now().await;
        assert_eq!(next_status(&mut rx), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_disable_kills_the_timer() {
        let (manager, hub) = manager(EvictionPolicy::Soft);
        let (_member, mut rx) = hub.connect();

        manager.enable(None, None, Some(1));
        manager.disable();
        assert_eq!(next_status(&mut rx), Some(true));
        assert_eq!(next_status(&mut rx), Some(false));

        tokio::time::sleep(StdDuration::from_secs(5 * 60)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        // A zero or negative duration never arms a timer.
        let snapshot = manager.enable(None, None, Some(0));
        assert!(snapshot.until.is_none());
    }

    #[tokio::test]
    async fn unknown_eviction_policy_defaults_to_hard() {
        assert_eq!(EvictionPolicy::parse("soft"), EvictionPolicy::Soft);
        assert_eq!(EvictionPolicy::parse("HARD"), EvictionPolicy::Hard);
        assert_eq!(EvictionPolicy::parse("bogus"), EvictionPolicy::Hard);
    }
}
