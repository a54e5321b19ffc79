//! Order status lifecycle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where an order is in the workshop.
///
/// Allowed transitions:
/// ```text
/// pending ──► in-progress ◄──► ready-for-fitting
///                 │    ▲            │
///                 ▼    │            ▼
///             completed ◄───────────┘
///                 │
///                 ▼
///             delivered
///
/// pending, in-progress, ready-for-fitting ──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    ReadyForFitting,
    Completed,
    Delivered,
    Cancelled,
}

/// Legal next statuses, keyed by current status.
const TRANSITIONS: &[(OrderStatus, &[OrderStatus])] = &[
    (
        OrderStatus::Pending,
        &[OrderStatus::InProgress, OrderStatus::Cancelled],
    ),
    (
        OrderStatus::InProgress,
        &[
            OrderStatus::ReadyForFitting,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ],
    ),
    (
        OrderStatus::ReadyForFitting,
        &[
            OrderStatus::InProgress,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ],
    ),
    (
        OrderStatus::Completed,
        &[OrderStatus::Delivered, OrderStatus::InProgress],
    ),
    (OrderStatus::Delivered, &[]),
    (OrderStatus::Cancelled, &[]),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::ReadyForFitting,
        OrderStatus::Completed,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Still being worked on (neither finished nor abandoned).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::InProgress | OrderStatus::ReadyForFitting
        )
    }

    /// Field edits are refused once an order is handed over or cancelled.
    pub fn is_editable(&self) -> bool {
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in-progress",
            OrderStatus::ReadyForFitting => "ready-for-fitting",
            OrderStatus::Completed => "completed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}
