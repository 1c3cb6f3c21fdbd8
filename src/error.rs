//! The status model (component C2): a fatal error kind, a set of
//! informational bits, and a list of mechanism-specific minor errors,
//! composed rather than flattened into a single string.

use std::fmt;

/// Fatal error kinds. Stable, closed set -- mirrors the GSSAPI major-status
/// taxonomy (RFC 2744 §3.9.1) restricted to what this engine can raise.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unsupported or unrecognized mechanism")]
    BadMech,
    #[error("invalid name provided")]
    BadName,
    #[error("unsupported name type")]
    BadNameType,
    #[error("invalid channel bindings")]
    BadBindings,
    #[error("invalid status code")]
    BadStatus,
    #[error("token had an invalid MIC")]
    BadMic,
    #[error("no valid credentials available")]
    NoCred,
    #[error("no valid security context")]
    NoContext,
    #[error("defective token detected: {0}")]
    DefectiveToken(String),
    #[error("defective credential detected")]
    DefectiveCredential,
    #[error("credentials have expired")]
    CredentialsExpired,
    #[error("security context has expired")]
    ContextExpired,
    #[error("generic failure: {0}")]
    Failure(String),
    #[error("unsupported quality of protection")]
    BadQop,
    #[error("operation unauthorized")]
    Unauthorized,
    #[error("operation unavailable")]
    Unavailable,
    #[error("duplicate credential element requested")]
    DuplicateElement,
    #[error("name is not a mechanism name")]
    NameNotMn,
    #[error("unrecognized mechanism attribute")]
    BadMechAttr,
}

/// `BadMic` is also known as `BadSig` in older GSSAPI text; keep both names
/// reachable without a second enum variant.
pub const BAD_SIG: ErrorKind = ErrorKind::BadMic;

bitflags::bitflags! {
    /// Independently-settable informational bits (RFC 2744 §3.9.2), layered
    /// on top of a (possibly absent) fatal error.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InfoFlags: u8 {
        const CONTINUE_NEEDED = 0x01;
        const DUPLICATE_TOKEN = 0x02;
        const OLD_TOKEN       = 0x04;
        const UNSEQ_TOKEN     = 0x08;
        const GAP_TOKEN       = 0x10;
    }
}

impl fmt::Display for InfoFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(InfoFlags::CONTINUE_NEEDED) {
            names.push("continue-needed");
        }
        if self.contains(InfoFlags::DUPLICATE_TOKEN) {
            names.push("duplicate-token");
        }
        if self.contains(InfoFlags::OLD_TOKEN) {
            names.push("old-token");
        }
        if self.contains(InfoFlags::UNSEQ_TOKEN) {
            names.push("unseq-token");
        }
        if self.contains(InfoFlags::GAP_TOKEN) {
            names.push("gap-token");
        }
        write!(f, "{}", names.join("|"))
    }
}

/// An opaque, mechanism-specific minor error attached to a fatal error.
/// The engine never branches on these; they exist for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechMinorError {
    pub code: u32,
    pub description: String,
}

impl fmt::Display for MechMinorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (minor={:#x})", self.description, self.code)
    }
}

/// The composed status: a fatal kind, any info bits that apply alongside it,
/// and the mechanism-minor list attached by the Kerberos adapter.
#[derive(Debug, Clone)]
pub struct GssError {
    pub kind: ErrorKind,
    pub info: InfoFlags,
    pub minors: Vec<MechMinorError>,
    /// An outbound KRB-ERROR token the acceptor built while failing (RFC
    /// 4120 §5.9.1): present when AP-REQ verification failed in a way that
    /// has a defined wire error to send back (e.g. clock skew, cname
    /// mismatch). The caller is responsible for actually sending it.
    pub krb_error_token: Option<Vec<u8>>,
}

impl GssError {
    pub fn new(kind: ErrorKind) -> Self {
        GssError {
            kind,
            info: InfoFlags::empty(),
            minors: Vec::new(),
            krb_error_token: None,
        }
    }

    pub fn with_info(mut self, info: InfoFlags) -> Self {
        self.info |= info;
        self
    }

    pub fn with_minor(mut self, minor: MechMinorError) -> Self {
        self.minors.push(minor);
        self
    }

    pub fn with_krb_error_token(mut self, token: Vec<u8>) -> Self {
        self.krb_error_token = Some(token);
        self
    }
}

impl fmt::Display for GssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.info.is_empty() {
            write!(f, "; {}", self.info)?;
        }
        for minor in &self.minors {
            write!(f, "; {}", minor)?;
        }
        Ok(())
    }
}

impl std::error::Error for GssError {}

impl From<ErrorKind> for GssError {
    fn from(kind: ErrorKind) -> Self {
        GssError::new(kind)
    }
}

impl From<std::io::Error> for GssError {
    fn from(e: std::io::Error) -> Self {
        GssError::new(ErrorKind::DefectiveToken(e.to_string()))
    }
}

impl From<binrw::Error> for GssError {
    fn from(e: binrw::Error) -> Self {
        GssError::new(ErrorKind::DefectiveToken(e.to_string()))
    }
}

impl From<der::Error> for GssError {
    fn from(e: der::Error) -> Self {
        GssError::new(ErrorKind::DefectiveToken(e.to_string()))
    }
}

/// A success that still carries `ContinueNeeded`: the establishment loop
/// needs the caller to send an outbound token and expect more input.
#[derive(Debug, Clone)]
pub struct Continuation<T> {
    pub value: T,
    pub continue_needed: bool,
}

pub type Result<T> = std::result::Result<T, GssError>;
