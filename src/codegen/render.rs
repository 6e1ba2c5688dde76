//! Etapa de escritura a texto.
//!
//! Un [`Render`] convierte la descripción estructurada de un artefacto en
//! texto fuente. La traducción semántica ya ocurrió en [`super::go`]; aquí
//! solo se decide la forma.

use std::fmt::{self, Write};

use super::artifact::{Arm, Artifact, Decl, Func, Signature, Stmt};

/// Escritor de artefactos.
pub trait Render {
    /// Extensión de los archivos emitidos, sin punto.
    fn extension(&self) -> &'static str;

    fn render(&self, artifact: &Artifact) -> Result<String, fmt::Error>;
}

/// Escritor de código Go, sangrado con tabuladores.
pub struct Go;

impl Render for Go {
    fn extension(&self) -> &'static str {
        "go"
    }

    fn render(&self, artifact: &Artifact) -> Result<String, fmt::Error> {
        let mut output = String::new();

        emit!(output, 0, "// {}", artifact.header)?;
        writeln!(output)?;
        emit!(output, 0, "package {}", artifact.package)?;

        if !artifact.imports.is_empty() {
            writeln!(output)?;
            emit!(output, 0, "import (")?;
            for spec in &artifact.imports {
                emit!(output, 1, "{}", spec)?;
            }

            emit!(output, 0, ")")?;
        }

        // Un comentario queda pegado a la declaración que le sigue
        let mut attached = false;
        for decl in &artifact.decls {
            if !attached {
                writeln!(output)?;
            }

            attached = matches!(decl, Decl::Comment(_));
            write_decl(&mut output, decl)?;
        }

        Ok(output)
    }
}

fn write_decl(output: &mut String, decl: &Decl) -> fmt::Result {
    match decl {
        Decl::Comment(text) => {
            for line in text.lines() {
                emit!(output, 0, "// {}", line)?;
            }

            Ok(())
        }

        Decl::Struct { name, fields } if fields.is_empty() => {
            emit!(output, 0, "type {} struct{{}}", name)
        }

        Decl::Struct { name, fields } => {
            emit!(output, 0, "type {} struct {{", name)?;
            for (field, typ) in fields {
                if field.is_empty() {
                    emit!(output, 1, "{}", typ)?;
                } else {
                    emit!(output, 1, "{} {}", field, typ)?;
                }
            }

            emit!(output, 0, "}}")
        }

        Decl::Alias { name, target } => emit!(output, 0, "type {} = {}", name, target),
        Decl::Defined { name, underlying } => emit!(output, 0, "type {} {}", name, underlying),

        Decl::Consts(consts) => {
            emit!(output, 0, "const (")?;
            for constant in consts {
                match &constant.typ {
                    Some(typ) => emit!(output, 1, "{} {} = {}", constant.name, typ, constant.value)?,
                    None => emit!(output, 1, "{} = {}", constant.name, constant.value)?,
                }
            }

            emit!(output, 0, ")")
        }

        Decl::Var { name, typ, value } => {
            write!(output, "var {}", name)?;
            if let Some(typ) = typ {
                write!(output, " {}", typ)?;
            }

            if let Some(value) = value {
                write!(output, " = {}", value)?;
            }

            writeln!(output)
        }

        Decl::Interface {
            name,
            embeds,
            methods,
        } => {
            emit!(output, 0, "type {} interface {{", name)?;
            for embed in embeds {
                emit!(output, 1, "{}", embed)?;
            }

            for method in methods {
                emit!(output, 1, "{}", signature(method))?;
            }

            emit!(output, 0, "}}")
        }

        Decl::Func(func) => write_func(output, func),
    }
}

fn write_func(output: &mut String, func: &Func) -> fmt::Result {
    output.push_str("func ");

    match &func.receiver {
        Some(receiver) if receiver.name.is_empty() => write!(output, "({}) ", receiver.typ)?,
        Some(receiver) => write!(output, "({} {}) ", receiver.name, receiver.typ)?,
        None => (),
    }

    emit!(output, 0, "{} {{", signature(&func.signature))?;
    write_block(output, &func.body, 1)?;
    emit!(output, 0, "}}")
}

fn write_block(output: &mut String, body: &[Stmt], indent: usize) -> fmt::Result {
    for stmt in body {
        match stmt {
            Stmt::Line(line) => emit!(output, indent, "{}", line)?,

            Stmt::Block { head, body } => {
                emit!(output, indent, "{} {{", head)?;
                write_block(output, body, indent + 1)?;
                emit!(output, indent, "}}")?;
            }

            Stmt::Switch { subject, arms } => {
                emit!(output, indent, "switch {} {{", subject)?;
                for Arm { labels, body } in arms {
                    if labels.is_empty() {
                        emit!(output, indent, "default:")?;
                    } else {
                        emit!(output, indent, "case {}:", labels.join(", "))?;
                    }

                    write_block(output, body, indent + 1)?;
                }

                emit!(output, indent, "}}")?;
            }
        }
    }

    Ok(())
}

/// `Nombre(a A, b B) (R, error)`
fn signature(signature: &Signature) -> String {
    let params: Vec<_> = signature
        .params
        .iter()
        .map(|(name, typ)| format!("{} {}", name, typ))
        .collect();

    let results = match signature.results.as_slice() {
        [] => String::new(),
        [single] => format!(" {}", single),
        many => format!(" ({})", many.join(", ")),
    };

    format!("{}({}){}", signature.name, params.join(", "), results)
}
