//! Pure balance and payment-status arithmetic.
//!
//! These functions are the only place an order's payment status is computed.
//! Every write path that can change an order's total or its payments goes
//! through [`Balance::settle`], so the stored status can never drift from the
//! ledger.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::LineItem;
use crate::payment::{Payment, PaymentState};

/// Order-level payment status, derived from completed payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Partial,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount still owed. Negative when the order is overpaid.
pub fn compute_balance(order_total: Money, total_completed: Money) -> Money {
    order_total - total_completed
}

/// Status from the completed sum alone; never yields `Refunded`.
///
/// `Paid` is checked first, so a zero-total order counts as paid.
pub fn derive_payment_status(order_total: Money, total_completed: Money) -> PaymentStatus {
    if total_completed >= order_total {
        PaymentStatus::Paid
    } else if total_completed.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

/// Full derivation: `Refunded` when nothing completed remains and at least
/// one payment has been refunded, otherwise [`derive_payment_status`].
pub fn settle_payment_status(
    order_total: Money,
    total_completed: Money,
    any_refunded: bool,
) -> PaymentStatus {
    if total_completed.is_zero() && any_refunded {
        PaymentStatus::Refunded
    } else {
        derive_payment_status(order_total, total_completed)
    }
}

/// `max(0, n)`.
pub fn clamp_non_negative<T: PartialOrd + Default>(n: T) -> T {
    let zero = T::default();
    if n < zero { zero } else { n }
}

/// Sum of `quantity * unit_price` over the items. `None` on overflow.
pub fn compute_subtotal<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Option<Money> {
    items
        .into_iter()
        .try_fold(Money::zero(), |acc, item| acc.checked_add(item.total_price()?))
}

/// `subtotal + tax - discount`, floored at zero. `None` on overflow.
pub fn compute_total(subtotal: Money, tax: Money, discount: Money) -> Option<Money> {
    subtotal
        .checked_add(tax)?
        .checked_sub(discount)
        .map(clamp_non_negative)
}

/// An order's settlement against its payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub order_total: Money,

    /// Sum of payments currently in `completed` state.
    pub total_paid: Money,

    pub balance: Money,
    pub payment_status: PaymentStatus,
}

impl Balance {
    /// Settles an order total against its payments.
    pub fn settle<'a>(order_total: Money, payments: impl IntoIterator<Item = &'a Payment>) -> Self {
        let mut total_paid = Money::zero();
        let mut any_refunded = false;
        for payment in payments {
            match payment.state() {
                PaymentState::Completed => total_paid += payment.amount(),
                PaymentState::Refunded => any_refunded = true,
                _ => {}
            }
        }

        Self {
            order_total,
            total_paid,
            balance: compute_balance(order_total, total_paid),
            payment_status: settle_payment_status(order_total, total_paid, any_refunded),
        }
    }
}
