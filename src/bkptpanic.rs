/// Fatal error: panics in debug builds, parks the core on a breakpoint otherwise.
#[doc(hidden)]
#[macro_export]
macro_rules! bk_panic {
    ($($arg:tt)*) => ({
        if cfg!(debug_assertions) {
            panic!($($arg)*);
        }
        else {
            loop {
                cortex_m::asm::bkpt();
            }
        }
    });
}

/// Fatal contract check, see `bk_panic!`.
#[doc(hidden)]
#[macro_export]
macro_rules! bk_assert {
    ($cond:expr) => ({
        if !$cond {
            $crate::bk_panic!(concat!("contract violated: ", stringify!($cond)));
        }
    });
    ($cond:expr, $($arg:tt)+) => ({
        if !$cond {
            $crate::bk_panic!($($arg)+);
        }
    });
}

pub(crate) trait BKUnwrap<T>
{
    fn bk_unwrap(self) -> T;
}

impl<T> BKUnwrap<T> for Option<T>
{
    fn bk_unwrap(self) -> T
    {
        match self {
            Some(v) => v,
            None => bk_panic!("Unwrapping on `None`")
        }
    }
}

impl<T, E: core::fmt::Display> BKUnwrap<T> for Result<T, E>
{
    fn bk_unwrap(self) -> T
    {
        match self {
            Ok(v) => v,
            Err(e) => bk_panic!("Unwrapping on `Err`: {}", e)
        }
    }
}
