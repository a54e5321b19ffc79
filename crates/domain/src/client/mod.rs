//! Client aggregate and order rollups.

mod aggregate;
mod events;

pub use aggregate::{Client, ClientDetails, ClientDetailsPatch};
pub use events::{
    ClientDeletedData, ClientEvent, ClientOrderRecordedData, ClientOrderRemovedData,
    ClientOrderRepricedData, ClientRegisteredData, ClientUpdatedData,
};

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Client does not exist")]
    NotRegistered,

    #[error("Client already registered")]
    AlreadyRegistered,

    #[error("Client has been deleted")]
    Deleted,

    #[error("Client name is required")]
    NameRequired,

    #[error("Client still has {count} order(s)")]
    HasOrders { count: usize },

    #[error("Client total spent would overflow")]
    TotalSpentOverflow,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotRegistered | ClientError::Deleted => ErrorKind::NotFound,
            ClientError::AlreadyRegistered | ClientError::HasOrders { .. } => ErrorKind::Conflict,
            ClientError::NameRequired => ErrorKind::InvalidState,
            ClientError::TotalSpentOverflow => ErrorKind::InvalidAmount,
        }
    }
}
