//! Serde support for clearable patch fields.
//!
//! A clearable field is an `Option<Option<T>>`: absent leaves the stored
//! value alone, `null` clears it and anything else replaces it.

use serde::{Deserialize, Deserializer};

pub(crate) fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
