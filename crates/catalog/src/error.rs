use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use icu_locid::ParserError as LocaleParserError;
use thiserror::Error;

/// Reason a catalog could not be loaded.
/// （語系目錄載入失敗的原因。）
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("no catalog files were given")]
    NoInputs,
    #[error("failed to read catalog: {0}")]
    Read(#[source] io::Error),
    #[error("malformed XML: {0}")]
    Xml(#[source] quick_xml::Error),
    #[error("missing required <{element}> in <{parent}>")]
    MissingElement {
        element: &'static str,
        parent: &'static str,
    },
    #[error("missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        attribute: &'static str,
        element: &'static str,
    },
    #[error("unexpected <{element}> inside <{parent}>")]
    UnexpectedElement {
        element: String,
        parent: &'static str,
    },
    #[error("unexpected text inside <{0}>")]
    UnexpectedText(&'static str),
    #[error("document ended inside <{0}>")]
    UnexpectedEof(&'static str),
    #[error("unknown translation type '{0}'")]
    InvalidStatus(String),
    #[error("invalid <byte> value '{0}'")]
    InvalidByte(String),
    #[error("duplicate message: source text and disambiguation already defined in this context")]
    DuplicateMessage,
    #[error("numerus message has {found} plural form(s) but locale '{locale}' requires {expected}")]
    PluralFormCount {
        locale: String,
        expected: usize,
        found: usize,
    },
    #[error("locale identifier '{locale}' is invalid: {error}")]
    InvalidLocale {
        locale: String,
        #[source]
        error: LocaleParserError,
    },
    #[error("no plural rule is registered for locale '{0}'")]
    UnsupportedLocale(String),
    #[error("catalog language '{found}' conflicts with '{expected}'")]
    LocaleConflict { expected: String, found: String },
}

/// Fatal load failure with the location of the offending entry.
///
/// Carries the file, line, context name and message source text when they
/// are known at the point of failure.
#[derive(Debug)]
pub struct ParseError {
    path: Option<PathBuf>,
    line: Option<usize>,
    context: Option<String>,
    message: Option<String>,
    kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            path: None,
            line: None,
            context: None,
            message: None,
            kind,
        }
    }

    pub(crate) fn read(path: &Path, error: io::Error) -> Self {
        Self::new(ParseErrorKind::Read(error)).with_path(path)
    }

    /// Attaches the input path unless one is already recorded.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    pub(crate) fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    pub(crate) fn in_context(mut self, name: Option<&str>) -> Self {
        if self.context.is_none() {
            self.context = name.map(str::to_string);
        }
        self
    }

    pub(crate) fn for_message(mut self, source: Option<&str>) -> Self {
        if self.message.is_none() {
            self.message = source.map(str::to_string);
        }
        self
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{line}: ", path.display())?,
            (Some(path), None) => write!(f, "{}: ", path.display())?,
            (None, Some(line)) => write!(f, "line {line}: ")?,
            (None, None) => {}
        }
        if let Some(context) = &self.context {
            write!(f, "context '{context}': ")?;
        }
        if let Some(message) = &self.message {
            write!(f, "message '{message}': ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_file_line_context_and_message() {
        let error = ParseError::new(ParseErrorKind::DuplicateMessage)
            .at_line(12)
            .for_message(Some("OK"))
            .in_context(Some("QMessageBox"))
            .with_path("qt_da.ts");
        assert_eq!(
            error.to_string(),
            "qt_da.ts:12: context 'QMessageBox': message 'OK': duplicate message: source text and disambiguation already defined in this context"
        );
    }

    #[test]
    fn underlying_error_is_exposed_as_source() {
        use std::error::Error as _;

        let missing = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let error = ParseError::read(Path::new("qt_da.ts"), missing);
        let source = error.source().expect("io source");
        assert_eq!(source.to_string(), "no such file");
        assert!(source.downcast_ref::<io::Error>().is_some());

        assert!(ParseError::new(ParseErrorKind::DuplicateMessage).source().is_none());
    }

    #[test]
    fn innermost_location_wins() {
        let error = ParseError::new(ParseErrorKind::NoInputs)
            .at_line(3)
            .at_line(9)
            .in_context(Some("Inner"))
            .in_context(Some("Outer"));
        assert_eq!(error.line(), Some(3));
        assert_eq!(error.context(), Some("Inner"));
    }
}
