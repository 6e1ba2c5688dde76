//! Reporte de errores ubicados.
//!
//! Cada diagnóstico tiene la forma `archivo:línea:columna: tipo: mensaje`,
//! seguido de la línea de código fuente en cuestión y un marcador `^`
//! bajo el rango ofensivo.

use crate::{
    lex::LexerError,
    parse::ParseError,
    source::{Located, Location},
};

use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error que puede citarse contra el código fuente.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
    fn kind(&self) -> &'static str;
}

/// Colección de errores lista para mostrarse.
#[derive(Default)]
pub struct Diagnostics {
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn push<E: 'static + LocatedError>(&mut self, error: E) {
        self.errors.push(Box::new(error));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics { errors }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            let location = error.location();
            writeln!(fmt, "{}: {}: {}", location, error.kind(), error.source())?;

            let line = location.line();
            let digits = line.to_string().chars().count();

            location
                .with_line(line, |text| {
                    writeln!(fmt, "{:>digits$} | {}", line, text, digits = digits)?;

                    // El marcador cubre el token, o al menos un carácter
                    let skip = location.column() as usize;
                    let end = if location.end().line() == line {
                        location.end().column() as usize
                    } else {
                        text.chars().count()
                    };

                    let highlight = end.saturating_sub(skip).max(1);
                    writeln!(
                        fmt,
                        "{:digits$} | {:skip$}{:^<highlight$}",
                        "",
                        "",
                        "",
                        digits = digits,
                        skip = skip,
                        highlight = highlight
                    )
                })
                .transpose()?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Compilation failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl sealed::Sealed for Located<ParseError> {}

impl LocatedError for Located<ParseError> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }

    fn kind(&self) -> &'static str {
        self.as_ref().kind()
    }
}

impl sealed::Sealed for Located<LexerError> {}

impl LocatedError for Located<LexerError> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }

    fn kind(&self) -> &'static str {
        "lexical error"
    }
}
