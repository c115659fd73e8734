//! Typed row identifiers.
//!
//! Every table in the `shop` and `admin` schemas uses a `SERIAL` primary
//! key. Wrapping each one in its own newtype keeps a `ProductId` from being
//! passed where a `VariantId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use jouwwinkel_core::define_id;
/// define_id!(BasketId);
/// define_id!(ParcelId);
///
/// let basket = BasketId::new(7);
/// assert_eq!(basket.as_i32(), 7);
/// assert_eq!(ParcelId::from(3).to_string(), "3");
///
/// // Different types, so this won't compile:
/// // let _: BasketId = ParcelId::new(1);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Storefront customers
define_id!(CustomerId);
define_id!(CredentialId);

// Catalog
define_id!(CategoryId);
define_id!(ProductId);
define_id!(VariantOptionId);
define_id!(VariantId);
define_id!(ComboId);

// Orders and promotions
define_id!(CouponId);
define_id!(OrderId);
define_id!(OrderLineId);
define_id!(ShippingPartnerId);
define_id!(ReviewId);

// Back-office
define_id!(AdminUserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_parse_from_path_segments() {
        let id: ProductId = serde_json::from_str("42").unwrap_or(ProductId::new(0));
        assert_eq!(id, ProductId::new(42));
    }

    #[test]
    fn test_id_display_and_conversion() {
        let id = OrderId::from(17);
        assert_eq!(id.to_string(), "17");
        assert_eq!(i32::from(id), 17);
    }
}
