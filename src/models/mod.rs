//! Domain model module declarations.

use serde::{Deserialize, Deserializer};

pub mod location;
pub mod message;
pub mod session;

/// Deserialize an explicit JSON `null` as the type's default value.
///
/// Mobile clients send `null` for fields they have not populated yet.
pub(crate) fn deserialize_null_as_default<'de, D, T>(
    deserializer: D,
) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
