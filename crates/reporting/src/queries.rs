//! Typed report queries and their results.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{Money, OrderStatus, PaymentStatus, Priority};
use serde::{Deserialize, Serialize};

/// Inclusive time window; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Filters for the order listing. Dates bound the order date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub priority: Option<Priority>,
    pub client_id: Option<AggregateId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderListQuery {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusBreakdownQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

/// Every status and priority appears, with zero counts included.
#[derive(Debug, Clone, Serialize)]
pub struct StatusBreakdown {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub by_priority: Vec<PriorityCount>,
}

impl StatusBreakdown {
    pub fn count_for(&self, status: OrderStatus) -> usize {
        self.by_status
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Month,
}

impl Granularity {
    /// Bucket label for a timestamp.
    pub fn bucket(&self, at: DateTime<Utc>) -> String {
        match self {
            Granularity::Day => at.format("%Y-%m-%d").to_string(),
            Granularity::Month => at.format("%Y-%m").to_string(),
        }
    }
}

/// Revenue from completed payments. Dates bound the payment date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueBucket {
    pub period: String,
    pub revenue: Money,
    pub payments: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub granularity: Granularity,
    pub buckets: Vec<RevenueBucket>,
    pub total: Money,
}

/// Dates bound the completion date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionTimeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionTimeReport {
    /// `None` when no order in the window has completed.
    pub average_hours: Option<f64>,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopClientsQuery {
    #[serde(default = "TopClientsQuery::default_limit")]
    pub limit: usize,
}

impl TopClientsQuery {
    fn default_limit() -> usize {
        10
    }
}

impl Default for TopClientsQuery {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub total_orders: usize,

    /// Orders not yet completed and not cancelled.
    pub active_orders: usize,

    /// Sum of completed payments.
    pub total_revenue: Money,

    /// Unpaid remainder over live, non-cancelled orders.
    pub outstanding_balance: Money,
}
