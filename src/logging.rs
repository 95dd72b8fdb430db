// Log macros used throughout the crate.
// Routed to `defmt` when that feature is on, to the `log` facade otherwise, and compiled out with neither.

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
pub(crate) use defmt::{debug, trace, warn};

#[cfg(all(feature = "log", not(feature = "defmt")))]
#[allow(unused_imports)]
pub(crate) use log::{debug, trace, warn};

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! discard
{
    ($fmt:expr $(, $arg:expr)*) => {
        {
            $( let _ = &$arg; )*
        }
    };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[allow(unused_imports)]
pub(crate) use discard as debug;

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[allow(unused_imports)]
pub(crate) use discard as trace;

#[cfg(not(any(feature = "log", feature = "defmt")))]
#[allow(unused_imports)]
pub(crate) use discard as warn;

#[cfg(all(test, not(feature = "defmt")))]
mod tests
{
    use super::{debug, trace, warn};

    #[test]
    fn macros_take_format_arguments()
    {
        let id = 3u8;

        trace!("timer {}", id);
        debug!("timer {} registered", id);
        warn!("timer {}: {}", id, "invalid timer id");
    }
}
