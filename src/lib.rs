//! Compilador de IDL.
//!
//! # Front end
//! Cada especificación deriva de un archivo raíz de código fuente, junto
//! con los archivos que este incluya. El texto se somete primero a análisis
//! léxico en [`lex`], de lo cual se obtiene un flujo de tokens. El flujo de
//! tokens se procesa por análisis sintáctico en [`parse`], que además
//! atiende directivas `#include` y `#pragma` y registra cada declaración
//! directamente en el modelo semántico descrito en [`model`]. Un error en
//! cualquiera de estas fases es fatal y se reporta por medio de [`error`].
//!
//! # Back end
//! El modelo semántico se traduce en [`codegen`] a un artefacto de texto
//! por tipo declarado, agrupados por módulo. La escritura y el formateo
//! son etapas separadas; el formateo puede delegarse a un proceso externo.

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod lex;
pub mod model;
pub mod parse;
pub mod source;
