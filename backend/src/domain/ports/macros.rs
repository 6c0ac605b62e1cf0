//! Helper macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ShardPortError {
            Offline => "shard offline",
            Query { message: String } => "query failed: {message}",
            Unreachable { shard: usize } => "shard {shard} unreachable",
            Rejected { message: String, shard: usize } => "shard {shard} rejected: {message}",
        }
    }

    #[test]
    fn unit_variants_get_plain_constructors() {
        assert_eq!(ShardPortError::offline(), ShardPortError::Offline);
        assert_eq!(ShardPortError::offline().to_string(), "shard offline");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ShardPortError::query("syntax error");
        assert_eq!(err.to_string(), "query failed: syntax error");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ShardPortError::unreachable(2_usize);
        assert_eq!(err.to_string(), "shard 2 unreachable");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ShardPortError::rejected("read only", 1_usize);
        assert_eq!(err.to_string(), "shard 1 rejected: read only");
    }
}
