//! Newtype IDs for type-safe entity references.
//!
//! Local IDs are store-assigned `i32` serials. External IDs are the `i64`
//! identifiers WooCommerce assigns to orders, customers and products; they
//! are the upsert keys and never mix with local IDs.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` (or the given integer type) with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `get()`
/// - `From` implementations in both directions
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use simply_orders_core::define_id;
/// define_id!(UserId);
/// define_id!(RemoteId, i64);
///
/// let user_id = UserId::new(1);
/// let remote_id = RemoteId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: UserId = remote_id;
/// assert_eq!(user_id.get(), 1);
/// assert_eq!(remote_id.get(), 1_i64);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        $crate::define_id!($name, i32);
    };
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Create a new ID from its raw value.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Get the underlying raw value.
            #[must_use]
            pub const fn get(&self) -> $inner {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <$inner as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$inner as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Local (store-assigned) IDs
define_id!(UserId);
define_id!(OrderId);
define_id!(OrderItemId);

// WooCommerce IDs
define_id!(ExternalOrderId, i64);
define_id!(ExternalCustomerId, i64);
define_id!(ExternalProductId, i64);

impl ExternalCustomerId {
    /// WooCommerce reports guest checkouts with customer id `0`.
    ///
    /// Returns `None` for guests so that only real customer accounts become
    /// upsert keys.
    #[must_use]
    pub const fn from_platform(raw: i64) -> Option<Self> {
        if raw > 0 { Some(Self(raw)) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_customer_id_is_none() {
        assert_eq!(ExternalCustomerId::from_platform(0), None);
        assert_eq!(ExternalCustomerId::from_platform(-1), None);
        assert_eq!(
            ExternalCustomerId::from_platform(42),
            Some(ExternalCustomerId::new(42))
        );
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = ExternalOrderId::new(727);
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("727"));
    }
}
