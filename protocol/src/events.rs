//! # Vault Events
//!
//! One fact per successful transition, never one for a failed transition.
//! The state machine decides *what* happened; how it is broadcast is up to
//! whatever [`EventSink`] the environment plugs in.
//!
//! | Kind    | Event type               | Attributes                                  |
//! |---------|--------------------------|---------------------------------------------|
//! | Created | `new-user-vault-created` | owner, road-operator-index, token, balance  |
//! | Updated | `new-user-vault-updated` | owner, road-operator-index, token, balance  |
//! | Deleted | `new-user-vault-deleted` | owner, road-operator-index, token           |

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{
    ATTR_BALANCE, ATTR_OWNER, ATTR_ROAD_OPERATOR_INDEX, ATTR_TOKEN, EVENT_USER_VAULT_CREATED,
    EVENT_USER_VAULT_DELETED, EVENT_USER_VAULT_UPDATED,
};
use crate::vault::{UserVault, VaultKey};

/// Which transition produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEventKind {
    Created,
    Updated,
    Deleted,
}

impl VaultEventKind {
    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            VaultEventKind::Created => EVENT_USER_VAULT_CREATED,
            VaultEventKind::Updated => EVENT_USER_VAULT_UPDATED,
            VaultEventKind::Deleted => EVENT_USER_VAULT_DELETED,
        }
    }
}

/// A fact about a committed vault transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEvent {
    pub kind: VaultEventKind,
    pub owner: String,
    pub road_operator_index: String,
    pub token: String,
    /// Balance after the transition. Absent for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
}

impl VaultEvent {
    pub fn created(vault: &UserVault) -> Self {
        Self::with_balance(VaultEventKind::Created, vault)
    }

    pub fn updated(vault: &UserVault) -> Self {
        Self::with_balance(VaultEventKind::Updated, vault)
    }

    pub fn deleted(key: &VaultKey) -> Self {
        Self {
            kind: VaultEventKind::Deleted,
            owner: key.owner.clone(),
            road_operator_index: key.road_operator_index.clone(),
            token: key.token.clone(),
            balance: None,
        }
    }

    fn with_balance(kind: VaultEventKind, vault: &UserVault) -> Self {
        Self {
            kind,
            owner: vault.owner.clone(),
            road_operator_index: vault.road_operator_index.clone(),
            token: vault.token.clone(),
            balance: Some(vault.balance),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Flat `(key, value)` attribute list in emission order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![
            (ATTR_OWNER, self.owner.clone()),
            (ATTR_ROAD_OPERATOR_INDEX, self.road_operator_index.clone()),
            (ATTR_TOKEN, self.token.clone()),
        ];
        if let Some(balance) = self.balance {
            attrs.push((ATTR_BALANCE, balance.to_string()));
        }
        attrs
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver of vault facts.
pub trait EventSink {
    fn emit(&self, event: VaultEvent);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: VaultEvent) {
        (**self).emit(event)
    }
}

/// Collects events in memory until drained.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<VaultEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().clone()
    }

    /// Take everything emitted so far, leaving the log empty.
    pub fn drain(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: VaultEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vault() -> UserVault {
        UserVault::new(VaultKey::new("alice", "op1", "tkn"), 50)
    }

    #[test]
    fn created_event_carries_balance() {
        let event = VaultEvent::created(&sample_vault());
        assert_eq!(event.event_type(), "new-user-vault-created");
        assert_eq!(
            event.attributes(),
            vec![
                ("owner", "alice".to_string()),
                ("road-operator-index", "op1".to_string()),
                ("token", "tkn".to_string()),
                ("balance", "50".to_string()),
            ]
        );
    }

    #[test]
    fn deleted_event_has_no_balance() {
        let event = VaultEvent::deleted(&sample_vault().key());
        assert_eq!(event.event_type(), "new-user-vault-deleted");
        assert_eq!(event.balance, None);
        assert_eq!(event.attributes().len(), 3);
    }

    #[test]
    fn updated_event_type() {
        let event = VaultEvent::updated(&sample_vault().with_balance(80));
        assert_eq!(event.event_type(), "new-user-vault-updated");
        assert_eq!(event.balance, Some(80));
    }

    #[test]
    fn log_collects_and_drains() {
        let log = EventLog::new();
        log.emit(VaultEvent::created(&sample_vault()));
        log.emit(VaultEvent::deleted(&sample_vault().key()));
        assert_eq!(log.len(), 2);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, VaultEventKind::Created);
        assert!(log.is_empty());
    }

    #[test]
    fn deleted_event_json_omits_balance() {
        let json = serde_json::to_value(VaultEvent::deleted(&sample_vault().key())).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert!(json.get("balance").is_none());
    }
}
