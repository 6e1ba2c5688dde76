//! Análisis sintáctico.
//!
//! Parser de descenso recursivo con un único token de lookahead. El
//! parser construye directamente el modelo semántico descrito en
//! [`crate::model`]: no existe un AST intermedio.
//!
//! # Preprocesador
//! Las líneas `#...` llegan como tokens opacos y se interpretan aquí:
//! - `#include <ruta>` y `#include "ruta"` abren un parser hijo que
//!   comparte la sesión ([`Session`]), el árbol de módulos y el módulo
//!   actual con su padre, de modo que las declaraciones incluidas caen
//!   directamente en el ámbito del includer.
//! - `#pragma ID Ruta::Nombre "id"` estampa un identificador de
//!   repositorio sobre un tipo ya declarado.
//! - `#pragma prefix "valor"` fija el prefijo del módulo actual.
//! - Cualquier otro pragma o directiva se ignora.
//!
//! # Errores
//! Todo error es fatal y ubicado. No existe recuperación ni resultado
//! parcial.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead, BufReader},
    mem,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    lex::{Keyword, Lexer, LexerError, Token},
    model::{
        Attribute, Constant, Direction, Enum, Field, Interface, Module, Operation, Parameter,
        Primitive, Scoped, Sequence, Struct, Type, TypeDef, TypeKind, TypeMap, Union, UnionCase,
    },
    source::{self, InputStream, Located, Location},
};

/// Error de análisis sintáctico o de preprocesador.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Lexical(#[from] LexerError),

    #[error("Expected {0}, found {1}")]
    UnexpectedToken(Token, Token),

    #[error("Expected {0}, found {1}")]
    Expected(&'static str, Token),

    #[error("Duplicate enumerator `{0}`")]
    DuplicateEnumerator(String),

    #[error("Invalid bound `{0}`")]
    InvalidBound(String),

    #[error("Malformed include directive `{0}`")]
    MalformedInclude(String),

    #[error("Malformed pragma `{0}`")]
    MalformedPragma(String),

    #[error("Cannot resolve include `{0}`")]
    IncludeNotFound(String),

    #[error("Failed to read include `{0}`")]
    IncludeIo(String, #[source] io::Error),
}

impl ParseError {
    /// Clasificación para diagnósticos.
    pub fn kind(&self) -> &'static str {
        use ParseError::*;

        match self {
            Lexical(_) => "lexical error",
            MalformedInclude(_) | IncludeNotFound(_) | IncludeIo(..) => "include error",
            _ => "syntax error",
        }
    }
}

/// Gancho de resolución de includes.
///
/// Un resolvedor puede declinar una ruta con `Ok(None)`, en cuyo caso la
/// búsqueda continúa en el directorio del archivo que incluye y luego en
/// los directorios de búsqueda. Sin resolvedor, todo include falla.
pub trait Resolve {
    fn resolve(&mut self, path: &str) -> io::Result<Option<Box<dyn BufRead>>>;
}

impl<F> Resolve for F
where
    F: FnMut(&str) -> io::Result<Option<Box<dyn BufRead>>>,
{
    fn resolve(&mut self, path: &str) -> io::Result<Option<Box<dyn BufRead>>> {
        self(path)
    }
}

/// Resolvedor sobre el sistema de archivos, relativo al directorio de
/// trabajo. Declina las rutas que no existen.
pub fn open_file(path: &str) -> io::Result<Option<Box<dyn BufRead>>> {
    match File::open(path) {
        Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Sesión de includes.
///
/// La sesión pertenece a la invocación más externa y se presta a cada
/// parser hijo. El conjunto de includes ya procesados se indexa por el
/// texto literal de la directiva, no por ruta canónica: dos grafías
/// distintas del mismo archivo se procesan dos veces.
#[derive(Default)]
pub struct Session {
    included: HashSet<String>,
    resolver: Option<Box<dyn Resolve>>,
    include_dirs: Vec<PathBuf>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// Instala un resolvedor, consultado antes que los directorios.
    pub fn with_resolver<R: Resolve + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Agrega un directorio de búsqueda, en orden. Solo se consulta
    /// cuando hay un resolvedor instalado y este declina la ruta.
    pub fn include_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Includes procesados hasta el momento.
    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.included.iter().map(String::as_str)
    }

    /// Abre un include. Orden: resolvedor, directorio del archivo que
    /// incluye, directorios de búsqueda.
    fn open(&mut self, path: &str, from: &Path) -> io::Result<Option<(Box<dyn BufRead>, String)>> {
        let resolver = match &mut self.resolver {
            Some(resolver) => resolver,
            None => return Ok(None),
        };

        if let Some(reader) = resolver.resolve(path)? {
            return Ok(Some((reader, path.to_owned())));
        }

        let sibling = from.parent().map(|dir| dir.join(path));
        let candidates = sibling
            .into_iter()
            .chain(self.include_dirs.iter().map(|dir| dir.join(path)));

        for candidate in candidates {
            if candidate.is_file() {
                let file = File::open(&candidate)?;
                let name = candidate.display().to_string();
                return Ok(Some((Box::new(BufReader::new(file)), name)));
            }
        }

        Ok(None)
    }
}

/// Analiza un archivo sin resolvedor de includes: todo `#include` falla.
pub fn parse<R: BufRead>(reader: R, filename: &str) -> Result<Module, Located<ParseError>> {
    parse_with(reader, filename, &mut Session::new())
}

/// Analiza un archivo dentro de una sesión de includes.
pub fn parse_with<R: BufRead>(
    reader: R,
    filename: &str,
    session: &mut Session,
) -> Result<Module, Located<ParseError>> {
    let mut root = Module::root();

    let (start, stream) = source::consume(reader, filename);
    Parser::new(
        start,
        Box::new(stream),
        PathBuf::from(filename),
        session,
        &mut root,
        Vec::new(),
    )?
    .specification()?;

    Ok(root)
}

struct Parser<'a> {
    lexer: Lexer<Box<dyn InputStream + 'a>>,
    token: Located<Token>,
    file: PathBuf,
    session: &'a mut Session,
    root: &'a mut Module,
    scope: Vec<String>,
}

type Parse<T> = Result<T, Located<ParseError>>;

impl<'a> Parser<'a> {
    fn new(
        start: Location,
        stream: Box<dyn InputStream + 'a>,
        file: PathBuf,
        session: &'a mut Session,
        root: &'a mut Module,
        scope: Vec<String>,
    ) -> Parse<Self> {
        let mut lexer = Lexer::new(start, stream);
        let token = lexer.next_token().map_err(lexical)?;

        Ok(Parser {
            lexer,
            token,
            file,
            session,
            root,
            scope,
        })
    }

    fn specification(&mut self) -> Parse<()> {
        while *self.peek() != Token::Eof {
            self.definition()?;
        }

        Ok(())
    }

    fn definition(&mut self) -> Parse<()> {
        match self.peek() {
            Token::Directive(_) => self.directive(),
            Token::Keyword(Keyword::Module) => self.module(),
            Token::Keyword(Keyword::Interface) => self.interface(),
            Token::Keyword(Keyword::Const) => self.constant(),

            Token::Keyword(
                Keyword::Struct
                | Keyword::Exception
                | Keyword::Enum
                | Keyword::Typedef
                | Keyword::Union,
            ) => {
                for typ in self.type_declaration()? {
                    self.declare(typ);
                }

                Ok(())
            }

            _ => self.unexpected("a declaration"),
        }
    }

    fn type_declaration(&mut self) -> Parse<Vec<Type>> {
        match self.peek() {
            Token::Keyword(Keyword::Struct) => Ok(vec![self.structure(false)?]),
            Token::Keyword(Keyword::Exception) => Ok(vec![self.structure(true)?]),
            Token::Keyword(Keyword::Enum) => Ok(vec![self.enumeration()?]),
            Token::Keyword(Keyword::Union) => Ok(vec![self.union()?]),
            Token::Keyword(Keyword::Typedef) => self.typedef(),
            _ => self.unexpected("a type declaration"),
        }
    }

    fn module(&mut self) -> Parse<()> {
        self.keyword(Keyword::Module)?;
        let name = self.id()?;
        self.expect(Token::OpenCurly)?;

        self.current().open_submodule(&name);
        self.scope.push(name);

        while *self.peek() != Token::CloseCurly {
            self.definition()?;
        }

        self.expect(Token::CloseCurly)?;
        self.expect(Token::Semicolon)?;

        self.scope.pop();
        Ok(())
    }

    fn interface(&mut self) -> Parse<()> {
        self.keyword(Keyword::Interface)?;
        let name = self.id()?;

        if *self.peek() == Token::Semicolon {
            self.next()?;
            debug!("Forward declaration of interface {}", self.current().qualify(&name));

            return Ok(());
        }

        let parents = if *self.peek() == Token::Colon {
            self.next()?;
            self.comma_separated(|s| s.scoped_name().map(|scoped| scoped.to_string()))?
        } else {
            Vec::new()
        };

        self.expect(Token::OpenCurly)?;

        let mut interface = Interface {
            name,
            parents,
            operations: Vec::new(),
            attributes: Vec::new(),
            nested: TypeMap::default(),
        };

        loop {
            match self.peek() {
                Token::CloseCurly => break,
                Token::Directive(_) => self.directive()?,

                Token::Keyword(Keyword::Readonly | Keyword::Attribute) => {
                    interface.attributes.extend(self.attribute()?)
                }

                Token::Keyword(
                    Keyword::Struct
                    | Keyword::Exception
                    | Keyword::Enum
                    | Keyword::Typedef
                    | Keyword::Union,
                ) => {
                    for typ in self.type_declaration()? {
                        interface.nested.insert(typ);
                    }
                }

                _ => interface.operations.push(self.operation()?),
            }
        }

        self.expect(Token::CloseCurly)?;
        self.expect(Token::Semicolon)?;

        self.declare(Type::new(TypeKind::Interface(interface)));
        Ok(())
    }

    fn attribute(&mut self) -> Parse<Vec<Attribute>> {
        let readonly = *self.peek() == Token::Keyword(Keyword::Readonly);
        if readonly {
            self.next()?;
        }

        self.keyword(Keyword::Attribute)?;
        let of = self.typ()?;
        let names = self.comma_separated(Parser::id)?;
        self.expect(Token::Semicolon)?;

        let attributes = names
            .into_iter()
            .map(|name| Attribute {
                name,
                of: of.clone(),
                readonly,
            })
            .collect();

        Ok(attributes)
    }

    fn operation(&mut self) -> Parse<Operation> {
        let oneway = *self.peek() == Token::Keyword(Keyword::Oneway);
        if oneway {
            self.next()?;
        }

        let returns = self.typ()?;
        let name = self.id()?;

        self.expect(Token::OpenParen)?;
        let parameters = match self.peek() {
            Token::CloseParen => Vec::new(),
            _ => self.comma_separated(Parser::parameter)?,
        };

        self.expect(Token::CloseParen)?;

        let raises = if *self.peek() == Token::Keyword(Keyword::Raises) {
            self.next()?;
            self.expect(Token::OpenParen)?;
            let raises = self.comma_separated(|s| s.scoped_name().map(|scoped| scoped.to_string()))?;
            self.expect(Token::CloseParen)?;

            raises
        } else {
            Vec::new()
        };

        self.expect(Token::Semicolon)?;

        Ok(Operation {
            name,
            returns,
            parameters,
            raises,
            oneway,
        })
    }

    fn parameter(&mut self) -> Parse<Parameter> {
        let direction = match self.peek() {
            Token::Keyword(Keyword::In) => Direction::In,
            Token::Keyword(Keyword::Out) => Direction::Out,
            Token::Keyword(Keyword::InOut) => Direction::InOut,
            _ => {
                let of = self.typ()?;
                let name = self.id()?;

                return Ok(Parameter {
                    name,
                    of,
                    direction: Direction::default(),
                });
            }
        };

        self.next()?;
        let of = self.typ()?;
        let name = self.id()?;

        Ok(Parameter {
            name,
            of,
            direction,
        })
    }

    fn structure(&mut self, exception: bool) -> Parse<Type> {
        self.keyword(if exception {
            Keyword::Exception
        } else {
            Keyword::Struct
        })?;

        let name = self.id()?;
        let fields = self.fields()?;
        self.expect(Token::Semicolon)?;

        Ok(Type::new(TypeKind::Struct(Struct {
            name,
            fields,
            exception,
        })))
    }

    fn fields(&mut self) -> Parse<Vec<Field>> {
        self.expect(Token::OpenCurly)?;

        let mut fields = Vec::new();
        while *self.peek() != Token::CloseCurly {
            let of = self.typ()?;
            let names = self.comma_separated(Parser::id)?;
            self.expect(Token::Semicolon)?;

            fields.extend(names.into_iter().map(|name| Field {
                name,
                of: of.clone(),
            }));
        }

        self.expect(Token::CloseCurly)?;
        Ok(fields)
    }

    fn enumeration(&mut self) -> Parse<Type> {
        self.keyword(Keyword::Enum)?;
        let name = self.id()?;
        self.expect(Token::OpenCurly)?;

        let mut elements: Vec<String> = Vec::new();
        loop {
            let location = self.token.location().clone();
            let element = self.id()?;
            if elements.contains(&element) {
                return Err(Located::at(ParseError::DuplicateEnumerator(element), location));
            }

            elements.push(element);

            // Se permite una coma final
            if *self.peek() != Token::Comma {
                break;
            }

            self.next()?;
            if *self.peek() == Token::CloseCurly {
                break;
            }
        }

        self.expect(Token::CloseCurly)?;
        self.expect(Token::Semicolon)?;

        Ok(Type::new(TypeKind::Enum(Enum { name, elements })))
    }

    fn typedef(&mut self) -> Parse<Vec<Type>> {
        self.keyword(Keyword::Typedef)?;

        if *self.peek() != Token::Keyword(Keyword::Struct) {
            let target = self.typ()?;
            let names = self.comma_separated(Parser::id)?;
            self.expect(Token::Semicolon)?;

            let aliases = names
                .into_iter()
                .map(|name| {
                    Type::new(TypeKind::TypeDef(TypeDef {
                        name,
                        target: Box::new(target.clone()),
                    }))
                })
                .collect();

            return Ok(aliases);
        }

        // typedef struct [Tag] { ... } Nombre;
        self.next()?;
        let tag = match self.peek() {
            Token::Id(_) => Some(self.id()?),
            _ => None,
        };

        let fields = self.fields()?;
        let name = self.id()?;
        self.expect(Token::Semicolon)?;

        let types = match tag {
            None => vec![Type::new(TypeKind::Struct(Struct {
                name,
                fields,
                exception: false,
            }))],

            Some(tag) => {
                let alias = Type::new(TypeKind::TypeDef(TypeDef {
                    name,
                    target: Box::new(Type::new(TypeKind::Scoped(Scoped {
                        path: vec![tag.clone()],
                        absolute: false,
                    }))),
                }));

                let tagged = Type::new(TypeKind::Struct(Struct {
                    name: tag,
                    fields,
                    exception: false,
                }));

                vec![tagged, alias]
            }
        };

        Ok(types)
    }

    fn union(&mut self) -> Parse<Type> {
        self.keyword(Keyword::Union)?;
        let name = self.id()?;

        self.keyword(Keyword::Switch)?;
        self.expect(Token::OpenParen)?;
        let discriminant = self.typ()?;
        self.expect(Token::CloseParen)?;

        self.expect(Token::OpenCurly)?;

        let mut cases = Vec::new();
        while *self.peek() != Token::CloseCurly {
            let mut labels = Vec::new();
            loop {
                match self.peek() {
                    Token::Keyword(Keyword::Case) => {
                        self.next()?;
                        labels.push(self.label()?);
                    }

                    Token::Keyword(Keyword::Default) => {
                        self.next()?;
                        self.expect(Token::Colon)?;
                        labels.push(String::from("default"));
                    }

                    _ => break,
                }
            }

            if labels.is_empty() {
                return self.unexpected("`case` or `default`");
            }

            let of = self.typ()?;
            let name = self.id()?;
            self.expect(Token::Semicolon)?;

            cases.push(UnionCase { labels, name, of });
        }

        self.expect(Token::CloseCurly)?;
        self.expect(Token::Semicolon)?;

        Ok(Type::new(TypeKind::Union(Union {
            name,
            discriminant: Box::new(discriminant),
            cases,
        })))
    }

    /// Etiqueta de caso, como texto hasta el siguiente `:`.
    fn label(&mut self) -> Parse<String> {
        let label = self.text_until(Token::Colon)?;
        if label.is_empty() {
            return self.unexpected("a case label");
        }

        self.expect(Token::Colon)?;
        Ok(label)
    }

    fn constant(&mut self) -> Parse<()> {
        self.keyword(Keyword::Const)?;
        let of = self.typ()?;
        let name = self.id()?;
        self.operator("=")?;

        let value = self.text_until(Token::Semicolon)?;
        if value.is_empty() {
            return self.unexpected("a constant value");
        }

        self.expect(Token::Semicolon)?;

        let module = self.current();
        debug!("Declared constant {}", module.qualify(&name));
        module.add_constant(Constant { name, of, value });

        Ok(())
    }

    fn typ(&mut self) -> Parse<Type> {
        use Primitive::*;

        let primitive = match self.peek() {
            Token::Keyword(Keyword::Sequence) => return self.sequence(),
            Token::Scope | Token::Id(_) => {
                return Ok(Type::new(TypeKind::Scoped(self.scoped_name()?)))
            }

            Token::Keyword(Keyword::Unsigned) => {
                self.next()?;
                match self.peek() {
                    Token::Keyword(Keyword::Short) => UShort,
                    Token::Keyword(Keyword::Long) => {
                        self.next()?;
                        if *self.peek() != Token::Keyword(Keyword::Long) {
                            return Ok(ULong.into());
                        }

                        ULongLong
                    }

                    _ => return self.unexpected("`short` or `long`"),
                }
            }

            Token::Keyword(Keyword::Long) => {
                self.next()?;
                match self.peek() {
                    Token::Keyword(Keyword::Long) => LongLong,
                    Token::Keyword(Keyword::Double) => Double,
                    _ => return Ok(Long.into()),
                }
            }

            Token::Keyword(Keyword::String | Keyword::WString) => {
                let wide = *self.peek() == Token::Keyword(Keyword::WString);
                self.next()?;

                // El límite de un string acotado no se conserva
                if self.at_operator("<") {
                    self.operator("<")?;
                    self.bound()?;
                    self.operator(">")?;
                }

                return Ok(if wide { WString } else { String }.into());
            }

            Token::Keyword(keyword) => match primitive(*keyword) {
                Some(primitive) => primitive,
                None => return self.unexpected("a type"),
            },

            _ => return self.unexpected("a type"),
        };

        self.next()?;
        Ok(primitive.into())
    }

    fn sequence(&mut self) -> Parse<Type> {
        self.keyword(Keyword::Sequence)?;
        self.operator("<")?;

        let element = self.typ()?;
        let bound = if *self.peek() == Token::Comma {
            self.next()?;
            self.bound()?
        } else {
            -1
        };

        self.operator(">")?;

        Ok(Type::new(TypeKind::Sequence(Sequence {
            element: Box::new(element),
            bound,
        })))
    }

    fn bound(&mut self) -> Parse<i64> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Number(digits) => match digits.parse::<i64>() {
                Ok(bound) if bound >= 0 => Ok(bound),
                _ => Err(Located::at(ParseError::InvalidBound(digits), location)),
            },

            other => Err(Located::at(ParseError::Expected("a bound", other), location)),
        }
    }

    fn scoped_name(&mut self) -> Parse<Scoped> {
        let absolute = *self.peek() == Token::Scope;
        if absolute {
            self.next()?;
        }

        let mut path = vec![self.id()?];
        while *self.peek() == Token::Scope {
            self.next()?;
            path.push(self.id()?);
        }

        Ok(Scoped { path, absolute })
    }

    fn directive(&mut self) -> Parse<()> {
        let (location, token) = self.next()?.split();
        let text = match token {
            Token::Directive(text) => text,
            other => return Err(Located::at(ParseError::Expected("a directive", other), location)),
        };

        match split_word(&text) {
            ("include", argument) => self.include(argument, location),
            ("pragma", pragma) => self.pragma(pragma, location),
            _ => {
                debug!("{}: ignoring directive #{}", location, text);
                Ok(())
            }
        }
    }

    fn include(&mut self, argument: &str, location: Location) -> Parse<()> {
        let path = argument
            .strip_prefix('<')
            .and_then(|path| path.strip_suffix('>'))
            .or_else(|| {
                argument
                    .strip_prefix('"')
                    .and_then(|path| path.strip_suffix('"'))
            })
            .filter(|path| !path.is_empty());

        let path = match path {
            Some(path) => path,
            None => {
                let error = ParseError::MalformedInclude(argument.to_owned());
                return Err(Located::at(error, location));
            }
        };

        if !self.session.included.insert(path.to_owned()) {
            debug!("{}: `{}` was already included", location, path);
            return Ok(());
        }

        let (reader, name) = match self.session.open(path, &self.file) {
            Ok(Some(found)) => found,
            Ok(None) => {
                let error = ParseError::IncludeNotFound(path.to_owned());
                return Err(Located::at(error, location));
            }

            Err(error) => {
                let error = ParseError::IncludeIo(path.to_owned(), error);
                return Err(Located::at(error, location));
            }
        };

        debug!("{}: including `{}` from {}", location, path, name);

        let (start, stream) = source::consume(reader, name.clone());
        Parser::new(
            start,
            Box::new(stream),
            PathBuf::from(name),
            self.session,
            self.root,
            self.scope.clone(),
        )?
        .specification()
    }

    fn pragma(&mut self, text: &str, location: Location) -> Parse<()> {
        let malformed = || Located::at(ParseError::MalformedPragma(text.to_owned()), location.clone());
        let (name, rest) = split_word(text);

        if unicase::eq_ascii(name, "ID") {
            let (target, id) = split_word(rest);
            let id = quoted(id).filter(|_| !target.is_empty()).ok_or_else(malformed)?;

            self.stamp(target, id, &location);
        } else if unicase::eq_ascii(name, "prefix") {
            let prefix = quoted(rest).ok_or_else(malformed)?;

            debug!("{}: prefix \"{}\"", location, prefix);
            self.current().set_prefix(prefix.to_owned());
        } else {
            debug!("{}: ignoring #pragma {}", location, name);
        }

        Ok(())
    }

    /// Aplica `#pragma ID`. Un destino aún no declarado no tiene efecto.
    fn stamp(&mut self, target: &str, id: &str, location: &Location) {
        let path: Vec<&str> = target.split("::").filter(|name| !name.is_empty()).collect();
        let module = if target.starts_with("::") {
            &mut *self.root
        } else {
            self.root.open_path(&self.scope)
        };

        match module.find_type_mut(&path) {
            Some(typ) => {
                debug!("{}: repository ID of {} is \"{}\"", location, target, id);
                typ.set_repository_id(id.to_owned());
            }

            None => warn!("{}: #pragma ID target `{}` not found, ignored", location, target),
        }
    }

    /// Junta los lexemas hasta antes de `end` o un delimitador de bloque.
    fn text_until(&mut self, end: Token) -> Parse<String> {
        let mut text = String::new();
        loop {
            match self.peek() {
                token if *token == end => break Ok(text),
                Token::Eof | Token::OpenCurly | Token::CloseCurly | Token::Semicolon => {
                    break Ok(text)
                }

                token => {
                    text.push_str(&token.lexeme());
                    self.next()?;
                }
            }
        }
    }

    fn declare(&mut self, typ: Type) {
        let module = self.current();
        debug!("Declared {} {}", typ.kind().describe(), module.qualify(typ.name()));

        module.add_type(typ);
    }

    fn current(&mut self) -> &mut Module {
        self.root.open_path(&self.scope)
    }

    fn comma_separated<T, F>(&mut self, mut rule: F) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = vec![rule(self)?];
        while *self.peek() == Token::Comma {
            self.next()?;
            items.push(rule(self)?);
        }

        Ok(items)
    }

    fn id(&mut self) -> Parse<String> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(id.to_string()),
            other => Err(Located::at(ParseError::Expected("an identifier", other), location)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        let (location, found) = self.next()?.split();
        if found == token {
            Ok(())
        } else {
            Err(Located::at(ParseError::UnexpectedToken(token, found), location))
        }
    }

    fn at_operator(&self, operator: &str) -> bool {
        matches!(self.peek(), Token::Operator(found) if found.starts_with(operator))
    }

    /// Consume un operador. Si el token actual es un operador de dos
    /// caracteres que inicia con `operator`, se consume solo la primera
    /// parte (`>>` en `sequence<sequence<long>>`).
    fn operator(&mut self, operator: &str) -> Parse<()> {
        if !self.at_operator(operator) {
            return self.unexpected(match operator {
                "<" => "`<`",
                ">" => "`>`",
                _ => "`=`",
            });
        }

        let split = match self.token.as_mut() {
            Token::Operator(found) if found.len() > operator.len() => {
                found.replace_range(..operator.len(), "");
                true
            }

            _ => false,
        };

        if !split {
            self.next()?;
        }

        Ok(())
    }

    fn peek(&self) -> &Token {
        self.token.as_ref()
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        let next = self.lexer.next_token().map_err(lexical)?;
        Ok(mem::replace(&mut self.token, next))
    }

    fn unexpected<T>(&self, expected: &'static str) -> Parse<T> {
        let error = ParseError::Expected(expected, self.peek().clone());
        Err(Located::at(error, self.token.location().clone()))
    }
}

fn lexical(error: Located<LexerError>) -> Located<ParseError> {
    error.map(ParseError::Lexical)
}

/// Tipos primitivos de un solo token.
fn primitive(keyword: Keyword) -> Option<Primitive> {
    use Primitive::*;

    let primitive = match keyword {
        Keyword::Short | Keyword::Int16 => Short,
        Keyword::UInt16 => UShort,
        Keyword::Int32 => Long,
        Keyword::UInt32 => ULong,
        Keyword::Int64 => LongLong,
        Keyword::UInt64 => ULongLong,
        Keyword::Int8 => Int8,
        Keyword::UInt8 => UInt8,
        Keyword::Float => Float,
        Keyword::Double => Double,
        Keyword::Boolean => Boolean,
        Keyword::Char => Char,
        Keyword::WChar => WChar,
        Keyword::Octet => Octet,
        Keyword::Any => Any,
        Keyword::Void => Void,
        _ => return None,
    };

    Some(primitive)
}

/// Separa la primera palabra del resto del texto.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

fn quoted(text: &str) -> Option<&str> {
    text.trim().strip_prefix('"')?.strip_suffix('"')
}
