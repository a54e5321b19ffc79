//! Read model views fed by the committed event stream.

mod clients;
mod orders;
mod payments;

pub use clients::{ClientSummary, ClientsView};
pub use orders::{OrderSummary, OrdersView};
pub use payments::{PaymentSummary, PaymentsView};
