//! Pending withdrawal requests.
//!
//! A request is registered when a member asks to withdraw and is resolved
//! exactly once: fulfilled by an approval or cancelled. Resolved requests stay
//! in the registry for audit until the history is erased, and can never be
//! matched again.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use guildbank_core::{ActorId, RequestId};

use crate::entry::timestamp;
use crate::item::ItemKey;

/// What a request wants to take out of the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "asset", rename_all = "snake_case")]
pub enum WithdrawAsset {
    Mesos {
        amount: i64,
    },
    Item {
        key: ItemKey,
        display_name: String,
        quantity: i64,
    },
}

impl WithdrawAsset {
    /// Sentence fragment used in history lines ("50 mesos", "3 Red Potion(s)").
    pub fn describe(&self) -> String {
        match self {
            WithdrawAsset::Mesos { amount } => format!("{amount} mesos"),
            WithdrawAsset::Item {
                display_name,
                quantity,
                ..
            } => format!("{quantity} {display_name}(s)"),
        }
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting approval.
    Pending,
    /// Approved and paid out.
    Fulfilled {
        by: ActorId,
        #[serde(with = "timestamp")]
        at: NaiveDateTime,
    },
    /// Withdrawn by the requester or dismissed by an administrator.
    Cancelled {
        by: ActorId,
        #[serde(with = "timestamp")]
        at: NaiveDateTime,
    },
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Fulfilled { .. } => "fulfilled",
            RequestStatus::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: RequestId,
    pub requester: ActorId,
    pub requester_name: String,
    #[serde(flatten)]
    pub asset: WithdrawAsset,
    #[serde(with = "timestamp")]
    pub requested_at: NaiveDateTime,
    pub status: RequestStatus,
}

impl PendingRequest {
    pub fn new(
        requester: ActorId,
        requester_name: impl Into<String>,
        asset: WithdrawAsset,
        requested_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: RequestId::new(),
            requester,
            requester_name: requester_name.into(),
            asset,
            requested_at,
            status: RequestStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Requests in registration order (oldest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRegistry {
    requests: Vec<PendingRequest>,
}

impl PendingRegistry {
    pub fn from_requests(requests: Vec<PendingRequest>) -> Self {
        Self { requests }
    }

    pub fn register(&mut self, request: PendingRequest) {
        self.requests.push(request);
    }

    /// Every request, resolved ones included.
    pub fn all(&self) -> &[PendingRequest] {
        &self.requests
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.requests.iter().filter(|r| r.is_pending())
    }

    pub fn get(&self, id: RequestId) -> Option<&PendingRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Position of the most recent *pending* request accepted by `matches`.
    pub fn latest_pending<F>(&self, matches: F) -> Option<usize>
    where
        F: Fn(&PendingRequest) -> bool,
    {
        self.requests
            .iter()
            .rposition(|r| r.is_pending() && matches(r))
    }

    /// Position of the *oldest* pending request accepted by `matches`.
    pub fn oldest_pending<F>(&self, matches: F) -> Option<usize>
    where
        F: Fn(&PendingRequest) -> bool,
    {
        self.requests
            .iter()
            .position(|r| r.is_pending() && matches(r))
    }

    pub fn position(&self, id: RequestId) -> Option<usize> {
        self.requests.iter().position(|r| r.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&PendingRequest> {
        self.requests.get(index)
    }

    /// Resolve the request at `index` and return the updated record.
    ///
    /// Callers obtain `index` from one of the lookup methods on the same
    /// registry, under the same borrow of the ledger.
    pub fn resolve(&mut self, index: usize, status: RequestStatus) -> Option<PendingRequest> {
        let request = self.requests.get_mut(index)?;
        request.status = status;
        Some(request.clone())
    }

    /// Drop every resolved request, keeping pending ones in order.
    /// Returns how many were dropped.
    pub fn prune_resolved(&mut self) -> usize {
        let before = self.requests.len();
        self.requests.retain(PendingRequest::is_pending);
        before - self.requests.len()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
