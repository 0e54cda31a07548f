/// Describes an error during the parsing or resolution of a timestamp.
#[derive(Debug)]
pub enum Error {
    /// The input cannot be interpreted as a date/time.
    Format(String),
    /// The resolved local wall-clock time is ambiguous or does not exist
    /// in the target time zone.
    AmbiguousTimezone(String),
    /// A `tz_offsets` entry is neither a zone, a POSIX TZ string, nor a
    /// fixed offset.
    TzMapping(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Format(emsg) => write!(f, "invalid timestamp format: {emsg}"),
            Error::AmbiguousTimezone(emsg) => write!(f, "ambiguous timezone: {emsg}"),
            Error::TzMapping(emsg) => write!(f, "invalid timezone mapping: {emsg}"),
        }
    }
}
