// SPDX-License-Identifier: MIT

/// Generates the `From` conversions between the layer errors.
///
/// `top` lists which variant of the top error wraps each layer error,
/// `str_into` the types that turn a `&'static str` into their `Other`
/// variant (the top error always does), and `sub` the lower layer errors a
/// layer error wraps directly.
#[macro_export]
macro_rules! fs_error_wiring {
    (
        top => $top:ty {
            $($layer:ty : $wrap:ident),+ $(,)?
        },
        str_into => [ $($with_other:ty),* $(,)? ],
        sub => {
            $($inner:ty => [ $($outer:ident::$outer_wrap:ident),+ ] ),* $(,)?
        } $(,)?
    ) => {
        $( $crate::fs_error_wiring!(@from $layer => $top, $wrap); )+
        $( $crate::fs_error_wiring!(@str $with_other); )*
        $crate::fs_error_wiring!(@str $top);
        $($( $crate::fs_error_wiring!(@from $inner => $outer, $outer_wrap); )+)*
    };

    (@from $src:ty => $dst:ty, $variant:ident) => {
        impl From<$src> for $dst {
            #[inline]
            fn from(e: $src) -> Self {
                <$dst>::$variant(e)
            }
        }
    };

    (@str $dst:ty) => {
        impl From<&'static str> for $dst {
            #[inline]
            fn from(msg: &'static str) -> Self {
                <$dst>::Other(msg)
            }
        }
    };
}

/// Returns `Err($err.into())` unless `$cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}
