//! Formateo de texto emitido.
//!
//! Los formateadores forman una cadena: se intenta cada uno en orden y el
//! primero que tenga éxito determina la salida. Si todos fallan, el texto
//! original se conserva y el error del último se reporta.

use std::{
    io::Write,
    process::{Command, ExitStatus, Stdio},
    string::FromUtf8Error,
};

use log::warn;
use thiserror::Error;

/// Un error de formateo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FormatError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// El formateador externo inició su ejecución, pero falló.
    #[error("`{0}` exited with status {1}")]
    Failed(String, ExitStatus),

    #[error("Formatter output is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),

    /// Llaves, corchetes o paréntesis desbalanceados.
    #[error("Unbalanced `{0}` at line {1}")]
    Unbalanced(char, usize),
}

/// Un formateador.
pub trait Format {
    fn name(&self) -> &str;

    fn format(&self, text: &str) -> Result<String, FormatError>;
}

/// Cadena predeterminada: normalización de imports, luego formato plano.
pub fn default_chain() -> Vec<Box<dyn Format>> {
    vec![Box::new(ImportNormalizer), Box::new(Plain)]
}

/// Aplica la cadena hasta el primer éxito.
///
/// Una cadena vacía deja el texto intacto.
pub fn apply(chain: &[Box<dyn Format>], text: &str) -> Result<String, FormatError> {
    let mut last = None;
    for formatter in chain {
        match formatter.format(text) {
            Ok(formatted) => return Ok(formatted),
            Err(error) => {
                warn!("Formatter {} failed: {}", formatter.name(), error);
                last = Some(error);
            }
        }
    }

    match last {
        Some(error) => Err(error),
        None => Ok(text.to_owned()),
    }
}

/// Formateador externo.
///
/// El texto se escribe al stdin de un proceso y su stdout reemplaza al
/// texto original, como lo hacen `gofmt` y `goimports`.
pub struct External {
    program: String,
    args: Vec<String>,
}

impl External {
    pub fn new<S: Into<String>>(program: S) -> Self {
        External {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Construye a partir de una línea de comando separada por espacios.
    pub fn from_command(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace();
        let external = External::new(words.next()?);

        Some(words.fold(external, External::arg))
    }
}

impl Format for External {
    fn name(&self) -> &str {
        &self.program
    }

    fn format(&self, text: &str) -> Result<String, FormatError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // stdin se cierra al salir del bloque, lo que termina la entrada
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(FormatError::Failed(self.program.clone(), output.status));
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

/// Ordena y elimina duplicados del bloque `import ( ... )`, y luego
/// aplica [`Plain`].
pub struct ImportNormalizer;

impl Format for ImportNormalizer {
    fn name(&self) -> &str {
        "import normalizer"
    }

    fn format(&self, text: &str) -> Result<String, FormatError> {
        let mut output = Vec::new();
        let mut imports: Option<Vec<&str>> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(specs) = imports.as_mut() {
                if trimmed == ")" {
                    specs.sort_unstable();
                    specs.dedup();

                    output.push(String::from("import ("));
                    output.extend(specs.iter().map(|spec| format!("\t{}", spec)));
                    output.push(String::from(")"));

                    imports = None;
                } else if !trimmed.is_empty() {
                    specs.push(trimmed);
                }
            } else if trimmed == "import (" {
                imports = Some(Vec::new());
            } else {
                output.push(line.to_owned());
            }
        }

        // Un bloque sin cerrar se deja para que Plain lo rechace
        if let Some(specs) = imports {
            output.push(String::from("import ("));
            output.extend(specs.iter().map(|spec| spec.to_string()));
        }

        let mut joined = output.join("\n");
        joined.push('\n');

        Plain.format(&joined)
    }
}

/// Formateador interno sin dependencias externas.
///
/// Resangra con tabuladores según el balance de `{`, `(` y `[` fuera de
/// literales y comentarios, alinea `case`/`default` con su `switch`,
/// colapsa líneas en blanco consecutivas y falla si el texto no balancea.
pub struct Plain;

impl Format for Plain {
    fn name(&self) -> &str {
        "plain"
    }

    fn format(&self, text: &str) -> Result<String, FormatError> {
        let mut output = String::with_capacity(text.len());
        let mut stack: Vec<char> = Vec::new();
        let mut blank = false;

        for (number, line) in text.lines().enumerate() {
            let number = number + 1;
            let line = line.trim();

            if line.is_empty() {
                blank = !output.is_empty();
                continue;
            }

            if blank {
                output.push('\n');
                blank = false;
            }

            let before = stack.len();
            let leading = scan(line, number, &mut stack)?;

            let mut depth = before.saturating_sub(leading);
            if line.starts_with("case ") || line.starts_with("default:") {
                depth = depth.saturating_sub(1);
            }

            for _ in 0..depth {
                output.push('\t');
            }

            output.push_str(line);
            output.push('\n');
        }

        match stack.last() {
            Some(&open) => Err(FormatError::Unbalanced(open, text.lines().count())),
            None => Ok(output),
        }
    }
}

/// Actualiza la pila de delimitadores abiertos con una línea y retorna
/// cuántos cierres aparecen al inicio de ella.
fn scan(line: &str, number: usize, stack: &mut Vec<char>) -> Result<usize, FormatError> {
    let mut chars = line.chars().peekable();
    let mut leading = 0;
    let mut lead = true;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => break,

            '"' | '\'' | '`' => {
                lead = false;
                let mut escaped = false;
                for inner in chars.by_ref() {
                    match inner {
                        _ if escaped => escaped = false,
                        '\\' if c != '`' => escaped = true,
                        _ if inner == c => break,
                        _ => (),
                    }
                }
            }

            '{' | '(' | '[' => {
                lead = false;
                stack.push(c);
            }

            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => '{',
                    ')' => '(',
                    _ => '[',
                };

                match stack.pop() {
                    Some(open) if open == expected => (),
                    _ => return Err(FormatError::Unbalanced(c, number)),
                }

                if lead {
                    leading += 1;
                }
            }

            c if c.is_whitespace() => (),
            _ => lead = false,
        }
    }

    Ok(leading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reindents() {
        let text = "func f() {\nswitch x {\ncase 1:\nreturn \"}\"\n}\n\n\n\nreturn\n}\n";
        let formatted = Plain.format(text).unwrap();

        assert_eq!(
            formatted,
            "func f() {\n\tswitch x {\n\tcase 1:\n\t\treturn \"}\"\n\t}\n\n\treturn\n}\n"
        );
    }

    #[test]
    fn plain_handles_closing_and_opening_on_one_line() {
        let text = "if a {\nx()\n} else {\ny()\n}\nvar v = [...]string{\"a\", \"b\"}\n";
        let formatted = Plain.format(text).unwrap();

        assert_eq!(
            formatted,
            "if a {\n\tx()\n} else {\n\ty()\n}\nvar v = [...]string{\"a\", \"b\"}\n"
        );
    }

    #[test]
    fn plain_rejects_unbalanced_text() {
        assert!(matches!(
            Plain.format("func f() {\n"),
            Err(FormatError::Unbalanced('{', 1))
        ));

        assert!(matches!(
            Plain.format("x)\n"),
            Err(FormatError::Unbalanced(')', 1))
        ));
    }

    #[test]
    fn imports_are_sorted_and_deduplicated() {
        let text = "package p\n\nimport (\n\t\"strconv\"\n\t\"idl/runtime\"\n\t\"strconv\"\n)\n";
        let formatted = ImportNormalizer.format(text).unwrap();

        assert_eq!(
            formatted,
            "package p\n\nimport (\n\t\"idl/runtime\"\n\t\"strconv\"\n)\n"
        );
    }

    #[test]
    fn chain_falls_through_to_next_formatter() {
        let chain: Vec<Box<dyn Format>> = vec![
            Box::new(External::new("idlc-formatter-that-does-not-exist")),
            Box::new(Plain),
        ];

        assert_eq!(apply(&chain, "a {\nb\n}\n").unwrap(), "a {\n\tb\n}\n");
    }

    #[test]
    fn chain_reports_last_failure() {
        let chain: Vec<Box<dyn Format>> = vec![Box::new(Plain)];
        assert!(apply(&chain, "a {\n").is_err());
        assert_eq!(apply(&[], "raw {").unwrap(), "raw {");
    }

    #[test]
    fn external_from_command() {
        let external = External::from_command("gofmt -s").unwrap();
        assert_eq!(external.name(), "gofmt");
        assert_eq!(external.args, vec!["-s"]);
        assert!(External::from_command("   ").is_none());
    }
}
