//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::settlement::{compute_subtotal, compute_total};

use super::{OrderError, OrderStatus};

/// Human-readable order number, `ORD-YYYYMM####`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Builds the number for the `sequence`-th order of `period` (`YYYYMM`).
    pub fn new(period: &str, sequence: u32) -> Self {
        Self(format!("ORD-{period}{sequence:04}"))
    }

    /// The `YYYYMM` period an order created at `at` is numbered in.
    pub fn period_of(at: DateTime<Utc>) -> String {
        at.format("%Y%m").to_string()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One garment or service on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Garment or service type ("suit", "alteration", ...).
    pub item_type: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(
        item_type: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity * unit_price`. `None` on overflow.
    pub fn total_price(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Checks that there is at least one item and every item is well formed.
pub(crate) fn validate_items(items: &[LineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity { index });
        }
        if item.unit_price.is_negative() {
            return Err(OrderError::InvalidUnitPrice {
                index,
                price: item.unit_price,
            });
        }
    }
    Ok(())
}

/// Pricing breakdown. Subtotal and total are always derived from the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl Pricing {
    pub fn from_items(
        items: &[LineItem],
        tax: Money,
        discount: Money,
    ) -> Result<Self, OrderError> {
        let subtotal = compute_subtotal(items).ok_or(OrderError::AmountOverflow)?;
        let total = compute_total(subtotal, tax, discount).ok_or(OrderError::AmountOverflow)?;
        Ok(Self {
            subtotal,
            tax,
            discount,
            total,
        })
    }

    pub(crate) fn validate_adjustments(tax: Money, discount: Money) -> Result<(), OrderError> {
        if tax.is_negative() {
            return Err(OrderError::NegativeAmount {
                field: "tax",
                amount: tax,
            });
        }
        if discount.is_negative() {
            return Err(OrderError::NegativeAmount {
                field: "discount",
                amount: discount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub comment: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Input for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: AggregateId,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub priority: Priority,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn new(client_id: AggregateId, items: Vec<LineItem>) -> Self {
        Self {
            client_id,
            items,
            tax: Money::zero(),
            discount: Money::zero(),
            priority: Priority::default(),
            expected_delivery: None,
            notes: None,
        }
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expected_delivery(mut self, at: DateTime<Utc>) -> Self {
        self.expected_delivery = Some(at);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of an order's editable fields. `None` leaves a field as is;
/// `Some(None)` clears `expected_delivery` or `notes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    pub items: Option<Vec<LineItem>>,
    pub tax: Option<Money>,
    pub discount: Option<Money>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub expected_delivery: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::patch::clearable")]
    pub notes: Option<Option<String>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_none()
            && self.tax.is_none()
            && self.discount.is_none()
            && self.priority.is_none()
            && self.expected_delivery.is_none()
            && self.notes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn order_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let period = OrderNumber::period_of(at);
        assert_eq!(period, "202403");
        assert_eq!(OrderNumber::new(&period, 7).as_str(), "ORD-2024030007");
        assert_eq!(OrderNumber::new(&period, 12345).as_str(), "ORD-20240312345");
    }

    #[test]
    fn pricing_from_items() {
        let items = vec![
            LineItem::new("shirt", "Oxford, white", 2, Money::from_cents(6000)),
            LineItem::new("alteration", "Shorten sleeves", 1, Money::from_cents(1500)),
        ];
        let pricing =
            Pricing::from_items(&items, Money::from_cents(1350), Money::from_cents(500)).unwrap();
        assert_eq!(pricing.subtotal, Money::from_cents(13500));
        assert_eq!(pricing.total, Money::from_cents(14350));
    }

    #[test]
    fn pricing_rejects_overflow() {
        let items = vec![LineItem::new("suit", "", 2, Money::from_cents(i64::MAX / 2 + 1))];
        assert!(matches!(
            Pricing::from_items(&items, Money::zero(), Money::zero()),
            Err(OrderError::AmountOverflow)
        ));

        let items = vec![LineItem::new("suit", "", 1, Money::from_cents(i64::MAX))];
        assert!(matches!(
            Pricing::from_items(&items, Money::from_cents(1), Money::zero()),
            Err(OrderError::AmountOverflow)
        ));
    }

    #[test]
    fn item_validation() {
        assert!(matches!(validate_items(&[]), Err(OrderError::NoItems)));
        assert!(matches!(
            validate_items(&[LineItem::new("suit", "", 0, Money::from_cents(100))]),
            Err(OrderError::InvalidQuantity { index: 0 })
        ));
        assert!(matches!(
            validate_items(&[
                LineItem::new("suit", "", 1, Money::zero()),
                LineItem::new("tie", "", 1, Money::from_cents(-1)),
            ]),
            Err(OrderError::InvalidUnitPrice { index: 1, .. })
        ));
    }

    #[test]
    fn empty_patch() {
        assert!(OrderPatch::default().is_empty());
        let patch = OrderPatch {
            priority: Some(Priority::Urgent),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
