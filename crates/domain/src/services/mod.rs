//! Application services over the aggregates.

mod clients;
mod ledger;
mod orders;

pub use clients::ClientStatistics;
pub use ledger::PaymentLedger;
pub use orders::OrderManager;

use event_store::EventStore;

use crate::repository::Repository;

/// The three services wired to one store and one set of stream locks.
pub struct BackOffice<S> {
    pub clients: ClientStatistics<S>,
    pub orders: OrderManager<S>,
    pub payments: PaymentLedger<S>,
}

impl<S: Clone> Clone for BackOffice<S> {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            orders: self.orders.clone(),
            payments: self.payments.clone(),
        }
    }
}

impl<S: EventStore + Clone> BackOffice<S> {
    pub fn new(store: S) -> Self {
        let repo = Repository::new(store);
        Self {
            clients: ClientStatistics::new(repo.clone()),
            orders: OrderManager::new(repo.clone()),
            payments: PaymentLedger::new(repo),
        }
    }
}
