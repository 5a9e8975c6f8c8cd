#![allow(unused_imports, unused_macros)]

#[cfg(feature = "tracing")]
pub(crate) use tracing::debug;
#[cfg(feature = "tracing")]
pub(crate) use tracing::error;
#[cfg(feature = "tracing")]
pub(crate) use tracing::info;
#[cfg(feature = "tracing")]
pub(crate) use tracing::instrument;
#[cfg(feature = "tracing")]
pub(crate) use tracing::trace;
#[cfg(feature = "tracing")]
pub(crate) use tracing::warn;


/// Expand to nothing while still type checking the format arguments.
#[cfg(not(feature = "tracing"))]
macro_rules! noop {
    ($($args:tt)*) => {{
        if false {
            let _args = format_args!($($args)*);
        }
    }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($args:tt)*) => {
        $crate::log::noop!($($args)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! error {
    ($($args:tt)*) => {
        $crate::log::noop!($($args)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($args:tt)*) => {
        $crate::log::noop!($($args)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($args:tt)*) => {
        $crate::log::noop!($($args)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_ {
    ($($args:tt)*) => {
        $crate::log::noop!($($args)*)
    };
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use error;
#[cfg(not(feature = "tracing"))]
pub(crate) use info;
#[cfg(not(feature = "tracing"))]
pub(crate) use noop;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use warn_ as warn;
