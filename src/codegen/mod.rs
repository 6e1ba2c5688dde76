//! Generación de artefactos.
//!
//! El generador recorre el árbol de módulos en profundidad. Cada módulo,
//! salvo la raíz, se emite en un subdirectorio con su nombre en minúsculas,
//! y cada tipo declarado produce un archivo. El texto pasa por tres
//! etapas: traducción a registros en [`go`], escritura en [`render`] y
//! formateo en [`format`].

use std::{
    collections::HashSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use bitflags::bitflags;
use log::{debug, warn};
use thiserror::Error;

use crate::model::Module;

use self::{
    format::{Format, FormatError},
    render::Render,
};

pub mod artifact;
pub mod format;
pub mod go;
pub mod render;

bitflags! {
    /// Opciones de generación.
    #[derive(Default)]
    pub struct GenerateFlags: u32 {
        /// Aborta en el primer artefacto que falle.
        const FAIL_FAST   = 0x01;

        /// No emite tipos anidados dentro de interfaces.
        const SKIP_NESTED = 0x02;

        /// Escribe el texto tal como se emitió, sin formatear.
        const NO_FORMAT   = 0x04;
    }
}

/// Parámetros del generador.
pub struct Options {
    /// Paquete destino de todos los artefactos.
    pub package: String,

    /// Imports adicionales, sin comillas.
    pub dependencies: Vec<String>,

    pub flags: GenerateFlags,

    /// Cadena de formateadores, intentados en orden.
    pub formatters: Vec<Box<dyn Format>>,
}

impl Options {
    pub fn new<S: Into<String>>(package: S) -> Self {
        Options {
            package: package.into(),
            dependencies: Vec::new(),
            flags: GenerateFlags::empty(),
            formatters: format::default_chain(),
        }
    }
}

/// Resultado de una generación completa.
#[derive(Debug, Default)]
pub struct Report {
    /// Archivos escritos, incluidos los que no pudieron formatearse.
    pub written: Vec<PathBuf>,

    /// Archivos cuyo texto quedó sin formatear.
    pub failed: Vec<(PathBuf, FormatError)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Un error que detiene la generación.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to format {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("Two artifacts would be written to {}", path.display())]
    Collision { path: PathBuf },

    #[error("Failed to render artifact")]
    Render(#[from] fmt::Error),
}

/// Genera todos los artefactos de `root` bajo `output`.
pub fn generate(root: &Module, output: &Path, options: &Options) -> Result<Report, GenerateError> {
    let mut report = Report::default();
    walk(root, output, root.prefix(), options, &mut report)?;

    Ok(report)
}

fn walk(
    module: &Module,
    directory: &Path,
    prefix: &str,
    options: &Options,
    report: &mut Report,
) -> Result<(), GenerateError> {
    let prefix = if module.prefix().is_empty() {
        prefix
    } else {
        module.prefix()
    };

    let renderer = render::Go;
    let artifacts = go::artifacts(module, prefix, options);

    // Nombres de archivo únicos por directorio, verificados antes de escribir
    let mut files = HashSet::new();
    for artifact in &artifacts {
        if !files.insert(artifact.file.as_str()) {
            let path = directory.join(format!("{}.{}", artifact.file, renderer.extension()));
            return Err(GenerateError::Collision { path });
        }
    }

    if !artifacts.is_empty() {
        fs::create_dir_all(directory).map_err(|source| GenerateError::Io {
            path: directory.to_owned(),
            source,
        })?;
    }

    for artifact in &artifacts {
        let path = directory.join(format!("{}.{}", artifact.file, renderer.extension()));
        let text = renderer.render(artifact)?;

        let (text, failure) = if options.flags.contains(GenerateFlags::NO_FORMAT) {
            (text, None)
        } else {
            match format::apply(&options.formatters, &text) {
                Ok(formatted) => (formatted, None),
                Err(error) => (text, Some(error)),
            }
        };

        fs::write(&path, &text).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote {}", path.display());
        report.written.push(path.clone());

        if let Some(error) = failure {
            if options.flags.contains(GenerateFlags::FAIL_FAST) {
                return Err(GenerateError::Format {
                    path,
                    source: error,
                });
            }

            warn!("Left {} unformatted: {}", path.display(), error);
            report.failed.push((path, error));
        }
    }

    for submodule in module.submodules() {
        let directory = directory.join(submodule.name().to_lowercase());
        walk(submodule, &directory, prefix, options, report)?;
    }

    Ok(())
}
