//! Descripción estructurada de un artefacto.
//!
//! Un [`Artifact`] describe qué declara un archivo de salida sin decidir
//! cómo se escribe. La traducción a texto ocurre después, en
//! [`super::render`].

/// Un archivo de salida.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Nombre de archivo, sin extensión.
    pub file: String,
    pub package: String,
    /// Comentario de encabezado, sin marcador de comentario.
    pub header: String,
    /// Especificaciones de import, ya entrecomilladas.
    pub imports: Vec<String>,
    pub decls: Vec<Decl>,
}

impl Artifact {
    pub fn new<F, P, H>(file: F, package: P, header: H) -> Self
    where
        F: Into<String>,
        P: Into<String>,
        H: Into<String>,
    {
        Artifact {
            file: file.into(),
            package: package.into(),
            header: header.into(),
            imports: Vec::new(),
            decls: Vec::new(),
        }
    }

    /// Agrega un import, sin duplicados.
    pub fn import<S: Into<String>>(&mut self, spec: S) {
        let spec = spec.into();
        if !self.imports.contains(&spec) {
            self.imports.push(spec);
        }
    }

    pub fn push(&mut self, decl: Decl) {
        self.decls.push(decl);
    }

    /// Funciones declaradas, métodos incluidos.
    pub fn funcs(&self) -> impl Iterator<Item = &Func> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Func(func) => Some(func),
            _ => None,
        })
    }
}

/// Declaraciones de nivel superior.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Comentario de documentación, pegado a la siguiente declaración.
    Comment(String),

    /// `type Nombre struct { ... }`. Un campo de nombre vacío se incrusta.
    Struct {
        name: String,
        fields: Vec<(String, String)>,
    },

    /// `type Nombre = Destino`
    Alias { name: String, target: String },

    /// `type Nombre Subyacente`
    Defined { name: String, underlying: String },

    /// Bloque `const ( ... )`.
    Consts(Vec<Const>),

    /// `var nombre [tipo] [= valor]`
    Var {
        name: String,
        typ: Option<String>,
        value: Option<String>,
    },

    /// `type Nombre interface { ... }`
    Interface {
        name: String,
        embeds: Vec<String>,
        methods: Vec<Signature>,
    },

    Func(Func),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub name: String,
    pub typ: Option<String>,
    pub value: String,
}

/// Nombre, parámetros y resultados de una función.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub results: Vec<String>,
}

impl Signature {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Signature {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn param<N: Into<String>, T: Into<String>>(mut self, name: N, typ: T) -> Self {
        self.params.push((name.into(), typ.into()));
        self
    }

    pub fn result<T: Into<String>>(mut self, typ: T) -> Self {
        self.results.push(typ.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    /// Vacío para un receptor anónimo.
    pub name: String,
    pub typ: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub receiver: Option<Receiver>,
    pub signature: Signature,
    pub body: Vec<Stmt>,
}

impl Func {
    pub fn new(signature: Signature, body: Vec<Stmt>) -> Self {
        Func {
            receiver: None,
            signature,
            body,
        }
    }

    pub fn method<N, T>(name: N, typ: T, signature: Signature, body: Vec<Stmt>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Func {
            receiver: Some(Receiver {
                name: name.into(),
                typ: typ.into(),
            }),
            signature,
            body,
        }
    }
}

/// Sentencias dentro del cuerpo de una función.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Line(String),

    /// `cabecera { ... }`
    Block { head: String, body: Vec<Stmt> },

    /// `switch sujeto { ... }`
    Switch { subject: String, arms: Vec<Arm> },
}

impl Stmt {
    pub fn line<S: Into<String>>(line: S) -> Self {
        Stmt::Line(line.into())
    }

    pub fn block<S: Into<String>>(head: S, body: Vec<Stmt>) -> Self {
        Stmt::Block {
            head: head.into(),
            body,
        }
    }
}

/// Brazo de `switch`. Sin etiquetas es el brazo `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub labels: Vec<String>,
    pub body: Vec<Stmt>,
}
