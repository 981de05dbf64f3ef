// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// Error kind.
///
/// A small, closed classification of what went wrong, independent of the
/// message or cause attached to a particular `Error` value.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("I/O error")]
    Io,
    #[error("parse error")]
    Parse,
    #[error("usage error")]
    Usage,
    #[error("internal error")]
    Internal,
}

/// An error carrying a [`ErrorKind`], an optional contextual message, and an
/// optional underlying cause.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    msg: Option<Box<str>>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns a type whose `Display` impl prints this error followed by
    /// `caused by: ...` for each link in the cause chain.
    pub fn chain(&self) -> Chain<'_> {
        Chain(self)
    }

    /// Constructs an error from a kind and a message, with no underlying cause.
    pub fn msg(kind: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            kind,
            msg: Some(msg.into().into_boxed_str()),
            source: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            kind,
            msg: None,
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.msg {
            None => fmt::Display::fmt(&self.kind, f),
            Some(m) => write!(f, "{}: {}", self.kind, m),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub struct Chain<'a>(&'a Error);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cause = std::error::Error::source(self.0);
        while let Some(c) = cause {
            write!(f, "\ncaused by: {c}")?;
            cause = c.source();
        }
        Ok(())
    }
}

/// Extension methods for `Result`.
pub trait ResultExt<T> {
    /// Annotates an error with the given kind, turning it into an
    /// [`Error`] with `self` preserved as the cause.
    ///
    /// ```
    /// use ridestats_base::{ErrorKind, ResultExt};
    /// use std::io::Read;
    /// let mut buf = [0u8; 1];
    /// let r = std::io::Cursor::new("").read_exact(&mut buf[..]).err_kind(ErrorKind::Internal);
    /// assert_eq!(r.unwrap_err().kind(), ErrorKind::Internal);
    /// ```
    fn err_kind(self, k: ErrorKind) -> Result<T, Error>;

    /// Like [`ResultExt::err_kind`], but also attaches a contextual message.
    fn context(self, k: ErrorKind, msg: impl Into<String>) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn err_kind(self, k: ErrorKind) -> Result<T, Error> {
        self.map_err(|e| Error {
            kind: k,
            msg: None,
            source: Some(Box::new(e)),
        })
    }

    fn context(self, k: ErrorKind, msg: impl Into<String>) -> Result<T, Error> {
        self.map_err(|e| Error {
            kind: k,
            msg: Some(msg.into().into_boxed_str()),
            source: Some(Box::new(e)),
        })
    }
}

/// Like `anyhow::bail!`, but the first argument specifies a type as an [`ErrorKind`].
///
/// ```
/// use ridestats_base::bail_t;
/// let e = || -> Result<(), ridestats_base::Error> {
///     bail_t!(Usage, "unknown user: {}", "slamb");
/// }().unwrap_err();
/// assert_eq!(e.kind(), ridestats_base::ErrorKind::Usage);
/// assert_eq!(e.to_string(), "usage error: unknown user: slamb");
/// ```
#[macro_export]
macro_rules! bail_t {
    ($t:ident, $e:expr) => {
        return Err($crate::format_err_t!($t, $e));
    };
    ($t:ident, $fmt:expr, $($arg:tt)+) => {
        return Err($crate::format_err_t!($t, $fmt, $($arg)+));
    };
}

/// Like `anyhow::format_err!`, but the first argument specifies a type as an [`ErrorKind`].
///
/// ```
/// use ridestats_base::format_err_t;
/// let e = format_err_t!(Usage, "unknown user: {}", "slamb");
/// assert_eq!(e.kind(), ridestats_base::ErrorKind::Usage);
/// assert_eq!(e.to_string(), "usage error: unknown user: slamb");
/// ```
#[macro_export]
macro_rules! format_err_t {
    ($t:ident, $e:expr) => {
        $crate::Error::msg($crate::ErrorKind::$t, $e)
    };
    ($t:ident, $fmt:expr, $($arg:tt)+) => {
        $crate::Error::msg($crate::ErrorKind::$t, format!($fmt, $($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_prints_causes() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let e: Error = Err::<(), _>(io_err)
            .context(ErrorKind::Io, "can't open input csv file")
            .unwrap_err();
        let chain = e.chain().to_string();
        assert!(chain.starts_with("I/O error: can't open input csv file"));
        assert!(chain.contains("caused by: no such file"));
    }

    #[test]
    fn bail_t_sets_kind_and_message() {
        let e = (|| -> Result<(), Error> {
            bail_t!(Parse, "bad field {}", "lat");
        })()
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Parse);
        assert_eq!(e.to_string(), "parse error: bad field lat");
    }
}
