use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

#[cfg(feature = "backtrace")]
use std::backtrace::Backtrace;

pub type Result<T> = std::result::Result<T, PgmError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    ModelInvalid,
    NumericFailure,
    LifecycleViolation,
    DataError,
    Unsupported,
    Multiple,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

/// The error taxonomy described by the propagation policy: numeric failures abort the
/// whole iteration (particles share a schedule and would otherwise silently diverge),
/// lifecycle violations leave state untouched, data errors reject before any partial
/// write, and model errors are raised at build time before a sampler exists.
#[derive(Debug)]
pub enum PgmError {
    /// Cycles, dimension mismatch, undefined variable, duplicate definition,
    /// lower > upper in a truncation, or a non-observed parent of an observed node.
    ModelInvalid { message: ErrString },

    /// A non-PSD Cholesky target, a log-density of NaN or −∞ where a finite value was
    /// required, or a prior/likelihood/posterior combination that is mutually
    /// incompatible.
    NumericFailure { message: ErrString },

    /// An operation was invoked in a state that does not support it, e.g. `run_backward`
    /// before the forward pass reaches its end, or `change_data` mid-iteration.
    LifecycleViolation { message: ErrString },

    /// A variable name was not declared, an index was out of range, or a supplied value's
    /// dimension did not match the node it targets.
    DataError { message: ErrString },

    /// A distribution or function name is not registered, a requested truncation is not
    /// supported on a conjugate pattern, or a finite sampler was requested for an
    /// unbounded node.
    Unsupported { message: ErrString },

    Multiple(MultiDisplay),

    Context {
        context: ErrorContext,
        source: Box<PgmError>,
        #[cfg(feature = "backtrace")]
        backtrace: Backtrace,
    },
}

impl PgmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ModelInvalid { .. } => ErrorCode::ModelInvalid,
            Self::NumericFailure { .. } => ErrorCode::NumericFailure,
            Self::LifecycleViolation { .. } => ErrorCode::LifecycleViolation,
            Self::DataError { .. } => ErrorCode::DataError,
            Self::Unsupported { .. } => ErrorCode::Unsupported,
            Self::Multiple(_) => ErrorCode::Multiple,
            Self::Context { .. } => ErrorCode::Context,
        }
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        PgmError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
            #[cfg(feature = "backtrace")]
            backtrace: Backtrace::capture(),
        }
    }
}

impl Display for PgmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelInvalid { message } => write!(f, "invalid model: {}", message),
            Self::NumericFailure { message } => write!(f, "numeric failure: {}", message),
            Self::LifecycleViolation { message } => write!(f, "lifecycle violation: {}", message),
            Self::DataError { message } => write!(f, "data error: {}", message),
            Self::Unsupported { message } => write!(f, "unsupported: {}", message),
            Self::Multiple(m) => write!(f, "multiple errors:\n{}", m),
            Self::Context {
                context, source, ..
            } => write!(f, "{}\nCaused by: {}", context, source),
        }
    }
}

impl std::error::Error for PgmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}
impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}
impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl std::error::Error for ErrorContext {}

#[derive(Debug)]
pub struct MultiDisplay(Vec<PgmError>);
impl Display for MultiDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {} (code: {:?})", i, e, e.code())?;
        }
        Ok(())
    }
}
impl From<Vec<PgmError>> for MultiDisplay {
    fn from(v: Vec<PgmError>) -> Self {
        Self(v)
    }
}

pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<PgmError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

pub trait IntoPgmError<T> {
    fn into_pgm_error(self) -> Result<T>;
}
impl<T, E: Into<PgmError>> IntoPgmError<T> for std::result::Result<T, E> {
    fn into_pgm_error(self) -> Result<T> {
        self.map_err(Into::into)
    }
}

#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! pgm_err {
    (ModelInvalid: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::PgmError::ModelInvalid { message: format!($fmt, $($arg),*).into() })
    };
    (NumericFailure: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::PgmError::NumericFailure { message: format!($fmt, $($arg),*).into() })
    };
    (LifecycleViolation: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::PgmError::LifecycleViolation { message: format!($fmt, $($arg),*).into() })
    };
    (DataError: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::PgmError::DataError { message: format!($fmt, $($arg),*).into() })
    };
    (Unsupported: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::PgmError::Unsupported { message: format!($fmt, $($arg),*).into() })
    };
    ($variant:ident: $msg:expr $(,)?) => {{
        $crate::__private::must_use($crate::PgmError::ModelInvalid { message: $msg.into() })
    }};
}

#[macro_export]
macro_rules! pgm_bail {
    ($($tt:tt)+) => { return Err($crate::pgm_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::pgm_bail!($($tt)+); }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_maps_to_variant() {
        let e = pgm_err!(ModelInvalid: "cycle through {}", "x");
        assert_eq!(e.code(), ErrorCode::ModelInvalid);
        assert_eq!(e.to_string(), "invalid model: cycle through x");
    }

    #[test]
    fn context_wraps_and_displays_source() {
        let e = pgm_err!(NumericFailure: "cholesky target not PSD").with_context("building sampler for node x3");
        let rendered = e.to_string();
        assert!(rendered.contains("building sampler for node x3"));
        assert!(rendered.contains("cholesky target not PSD"));
    }

    #[test]
    fn ensure_macro_bails_with_data_error() {
        fn check(ok: bool) -> Result<()> {
            ensure!(ok, DataError: "index out of range");
            Ok(())
        }
        assert!(check(true).is_ok());
        let err = check(false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DataError);
    }
}
