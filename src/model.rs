//! Modelo semántico.
//!
//! El parser construye un árbol de [`Module`] cuya raíz es implícita y
//! anónima. Cada módulo es dueño de sus tipos y submódulos; la relación
//! inversa (hijo a padre) se representa solamente como la ruta de nombres
//! `scope`, útil para calificar nombres sin formar ciclos de referencias.
//!
//! Fuera de los identificadores de repositorio, que los pragmas pueden
//! estampar después de declarar un tipo, el modelo no se modifica una vez
//! que el parser termina.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

/// Un espacio de nombres.
#[derive(Debug, Default, Clone)]
pub struct Module {
    name: String,
    scope: Vec<String>,
    prefix: String,
    types: TypeMap,
    constants: Vec<Constant>,
    submodules: HashMap<String, Module>,
    order: Vec<String>,
}

impl Module {
    /// Crea un módulo raíz vacío.
    pub fn root() -> Self {
        Module::default()
    }

    /// Nombre del módulo, vacío para la raíz.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Ruta de nombres desde la raíz, incluyendo a este módulo.
    pub fn path(&self) -> Vec<&str> {
        self.scope
            .iter()
            .map(String::as_str)
            .chain((!self.is_root()).then(|| self.name.as_str()))
            .collect()
    }

    /// Nombre calificado con `::`, sin prefijo `::` inicial.
    pub fn qualified_name(&self) -> String {
        self.path().join("::")
    }

    /// Califica un nombre declarado en este módulo.
    pub fn qualify(&self, name: &str) -> String {
        if self.is_root() {
            name.to_owned()
        } else {
            format!("{}::{}", self.qualified_name(), name)
        }
    }

    /// Prefijo de identificadores de repositorio (`#pragma prefix`).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: String) {
        self.prefix = prefix;
    }

    /// Tipos declarados directamente en este módulo.
    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeMap {
        &mut self.types
    }

    /// Busca un tipo declarado directamente en este módulo.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    /// Registra un tipo. Un tipo homónimo previo es reemplazado.
    pub fn add_type(&mut self, typ: Type) {
        self.types.insert(typ);
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn add_constant(&mut self, constant: Constant) {
        self.constants.push(constant);
    }

    /// Abre un submódulo, creándolo si no existe todavía.
    ///
    /// Reabrir un módulo existente permite fusionar varios bloques
    /// `module A { ... };` en un solo nodo.
    pub fn open_submodule(&mut self, name: &str) -> &mut Module {
        if !self.submodules.contains_key(name) {
            self.order.push(name.to_owned());
        }

        let scope = self.path().into_iter().map(str::to_owned).collect();
        self.submodules
            .entry(name.to_owned())
            .or_insert_with(|| Module {
                name: name.to_owned(),
                scope,
                ..Default::default()
            })
    }

    /// Abre una ruta completa de submódulos a partir de este módulo.
    pub fn open_path<S: AsRef<str>>(&mut self, path: &[S]) -> &mut Module {
        let mut module = self;
        for name in path {
            module = module.open_submodule(name.as_ref());
        }

        module
    }

    /// Submódulo directo por nombre.
    pub fn submodule(&self, name: &str) -> Option<&Module> {
        self.submodules.get(name)
    }

    /// Submódulos directos en orden de primera declaración.
    pub fn submodules(&self) -> impl Iterator<Item = &Module> {
        self.order
            .iter()
            .filter_map(move |name| self.submodules.get(name))
    }

    /// Desciende por una ruta de submódulos existentes.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Module> {
        let mut module = self;
        for name in path {
            module = module.submodules.get(name.as_ref())?;
        }

        Some(module)
    }

    pub fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Module> {
        let mut module = self;
        for name in path {
            module = module.submodules.get_mut(name.as_ref())?;
        }

        Some(module)
    }

    /// Localiza un tipo por ruta relativa `A::B::Nombre`.
    ///
    /// El penúltimo componente puede ser también una interfaz, en cuyo
    /// caso se busca entre sus tipos anidados.
    pub fn find_type_mut(&mut self, path: &[&str]) -> Option<&mut Type> {
        let (name, modules) = path.split_last()?;
        if self.find(modules).map_or(false, |module| module.lookup(name).is_some()) {
            return self.find_mut(modules)?.types.get_mut(name);
        }

        let (interface, outer) = modules.split_last()?;
        match self.find_mut(outer)?.types.get_mut(interface)?.kind_mut() {
            TypeKind::Interface(interface) => interface.nested.get_mut(name),
            _ => None,
        }
    }

    /// Vista profunda de todos los tipos, con su nombre calificado.
    ///
    /// Incluye los tipos anidados en interfaces, calificados a través
    /// de la interfaz que los declara.
    pub fn all_types(&self) -> Vec<(String, &Type)> {
        let mut all = Vec::new();
        self.collect_types(&mut all);
        all
    }

    fn collect_types<'a>(&'a self, all: &mut Vec<(String, &'a Type)>) {
        for typ in self.types.iter() {
            let qualified = self.qualify(typ.name());
            if let TypeKind::Interface(interface) = typ.kind() {
                for nested in interface.nested.iter() {
                    all.push((format!("{}::{}", qualified, nested.name()), nested));
                }
            }

            all.push((qualified, typ));
        }

        for submodule in self.submodules() {
            submodule.collect_types(all);
        }
    }
}

/// Tabla de tipos que preserva el orden de declaración.
#[derive(Debug, Default, Clone)]
pub struct TypeMap {
    types: HashMap<String, Type>,
    order: Vec<String>,
}

impl TypeMap {
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Type> {
        self.types.get_mut(name)
    }

    /// Inserta por nombre. Un reemplazo conserva la posición original.
    pub fn insert(&mut self, typ: Type) {
        let name = typ.name().to_owned();
        if self.types.insert(name.clone(), typ).is_none() {
            self.order.push(name);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Itera en orden de declaración.
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.order.iter().filter_map(move |name| self.types.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Un tipo declarado o referido, con su identificador de repositorio.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    kind: TypeKind,
    repository_id: String,
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type {
            kind,
            repository_id: String::new(),
        }
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut TypeKind {
        &mut self.kind
    }

    /// Identificador de repositorio, vacío si ningún pragma lo definió.
    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn set_repository_id(&mut self, id: String) {
        self.repository_id = id;
    }

    /// Nombre del tipo.
    ///
    /// Para tipos declarados es el nombre de la declaración; para los
    /// demás es su forma en IDL.
    pub fn name(&self) -> &str {
        match &self.kind {
            TypeKind::Simple(primitive) => primitive.spelling(),
            TypeKind::Sequence(_) => "sequence",
            TypeKind::Struct(Struct { name, .. })
            | TypeKind::Enum(Enum { name, .. })
            | TypeKind::TypeDef(TypeDef { name, .. })
            | TypeKind::Union(Union { name, .. })
            | TypeKind::Interface(Interface { name, .. }) => name.as_str(),
            TypeKind::Scoped(scoped) => scoped.name(),
        }
    }
}

impl From<TypeKind> for Type {
    fn from(kind: TypeKind) -> Self {
        Type::new(kind)
    }
}

impl From<Primitive> for Type {
    fn from(primitive: Primitive) -> Self {
        Type::new(TypeKind::Simple(primitive))
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Simple(primitive) => fmt.write_str(primitive.spelling()),
            TypeKind::Sequence(Sequence { element, bound }) if *bound < 0 => {
                write!(fmt, "sequence<{}>", element)
            }

            TypeKind::Sequence(Sequence { element, bound }) => {
                write!(fmt, "sequence<{}, {}>", element, bound)
            }

            TypeKind::Scoped(scoped) => write!(fmt, "{}", scoped),
            _ => fmt.write_str(self.name()),
        }
    }
}

/// Conjunto cerrado de variantes de tipo.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Simple(Primitive),
    Sequence(Sequence),
    Struct(Struct),
    Enum(Enum),
    TypeDef(TypeDef),
    Union(Union),
    Interface(Interface),
    Scoped(Scoped),
}

impl TypeKind {
    /// Palabra con la que se describe la variante en listados.
    pub fn describe(&self) -> &'static str {
        match self {
            TypeKind::Simple(_) => "primitive",
            TypeKind::Sequence(_) => "sequence",
            TypeKind::Struct(Struct {
                exception: true, ..
            }) => "exception",
            TypeKind::Struct(_) => "struct",
            TypeKind::Enum(_) => "enum",
            TypeKind::TypeDef(_) => "typedef",
            TypeKind::Union(_) => "union",
            TypeKind::Interface(_) => "interface",
            TypeKind::Scoped(_) => "scoped",
        }
    }
}

/// Tipos primitivos.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int8,
    UInt8,
    Short,
    UShort,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    Boolean,
    Char,
    WChar,
    Octet,
    String,
    WString,
    Any,
    Void,
}

impl Primitive {
    /// Forma canónica en IDL.
    pub fn spelling(self) -> &'static str {
        use Primitive::*;

        match self {
            Int8 => "int8",
            UInt8 => "uint8",
            Short => "short",
            UShort => "unsigned short",
            Long => "long",
            ULong => "unsigned long",
            LongLong => "long long",
            ULongLong => "unsigned long long",
            Float => "float",
            Double => "double",
            Boolean => "boolean",
            Char => "char",
            WChar => "wchar",
            Octet => "octet",
            String => "string",
            WString => "wstring",
            Any => "any",
            Void => "void",
        }
    }
}

/// `sequence<T>` o `sequence<T, N>`. Un límite de -1 indica sin límite.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub element: Box<Type>,
    pub bound: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Field>,
    pub exception: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub of: Type,
}

/// Enumeración. El ordinal de cada elemento es su índice.
#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub target: Box<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub name: String,
    pub discriminant: Box<Type>,
    pub cases: Vec<UnionCase>,
}

/// Caso de unión. La etiqueta literal `default` captura todo valor
/// que ningún otro caso reclame.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionCase {
    pub labels: Vec<String>,
    pub name: String,
    pub of: Type,
}

impl UnionCase {
    pub fn is_default(&self) -> bool {
        self.labels.iter().any(|label| label == "default")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub parents: Vec<String>,
    pub operations: Vec<Operation>,
    pub attributes: Vec<Attribute>,
    pub nested: TypeMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub returns: Type,
    pub parameters: Vec<Parameter>,
    pub raises: Vec<String>,
    pub oneway: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub of: Type,
    pub direction: Direction,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub of: Type,
    pub readonly: bool,
}

/// Referencia no resuelta `A::B::C`. Resolverla le corresponde al consumidor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoped {
    pub path: Vec<String>,
    pub absolute: bool,
}

impl Scoped {
    /// Último componente de la ruta.
    pub fn name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

impl Display for Scoped {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            fmt.write_str("::")?;
        }

        fmt.write_str(&self.path.join("::"))
    }
}

/// `const T Name = valor;`, con el valor conservado como texto.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub of: Type,
    pub value: String,
}

// TypeMap participa de `PartialEq` por medio de `Interface`
impl PartialEq for TypeMap {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.types == other.types
    }
}
