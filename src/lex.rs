//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios (`// ...` y `/* ... */`) se descartan durante
//! esta operación. Cada token emitido está asociado a una ubicación en el
//! código fuente original.
//!
//! # Contenido de un token
//! Puntuación y palabras clave se identifican por lo que son. Los
//! identificadores, literales y operadores conservan su lexema. Las
//! secuencias de escape dentro de literales de texto o de carácter no se
//! interpretan: la barra invertida y el carácter que le sigue se conservan
//! tal cual. Una línea de preprocesador (`#...` hasta el fin de línea) se
//! emite como un único token opaco.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave distinguen mayúsculas de minúsculas, pero un
//!   identificador que solo difiere de una palabra clave en capitalización
//!   es un error (`Module`, `STRUCT`, ...).
//! - Los operadores se agrupan de forma voraz hasta dos caracteres.
//!
//! # Errores
//! Todo error léxico es fatal. El lexer no intenta recuperarse.

use crate::source::{InputStream, Located, Location};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Un literal de texto o de carácter no se cerró antes del fin de línea.
    #[error("Unterminated {0} literal")]
    Unterminated(&'static str),

    /// Un comentario de bloque no se cerró antes del fin de archivo.
    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal numérico, con a lo sumo un punto decimal.
    Number(String),

    /// Literal de texto, sin comillas.
    StringLiteral(String),

    /// Literal de carácter, sin comillas.
    CharLiteral(String),

    /// Uno o dos caracteres de operador.
    Operator(String),

    /// Línea de preprocesador, sin `#`.
    Directive(String),

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// `;`
    Semicolon,

    /// `:`
    Colon,

    /// `::`
    Scope,

    /// `,`
    Comma,

    /// Fin de la entrada.
    Eof,
}

impl Token {
    /// Reconstruye la forma en que el token aparece en el código fuente.
    pub fn lexeme(&self) -> String {
        use Token::*;

        match self {
            Id(id) => id.to_string(),
            Token::Keyword(keyword) => keyword.to_string(),
            Number(text) | Operator(text) => text.clone(),
            StringLiteral(text) => format!("\"{}\"", text),
            CharLiteral(text) => format!("'{}'", text),
            Directive(text) => format!("#{}", text),
            OpenCurly => "{".into(),
            CloseCurly => "}".into(),
            OpenParen => "(".into(),
            CloseParen => ")".into(),
            OpenSquare => "[".into(),
            CloseSquare => "]".into(),
            Semicolon => ";".into(),
            Colon => ":".into(),
            Scope => "::".into(),
            Comma => ",".into(),
            Eof => String::new(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Token::Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Number(number) => write!(fmt, "literal `{}`", number),
            StringLiteral(text) => write!(fmt, "string literal \"{}\"", text),
            CharLiteral(text) => write!(fmt, "character literal '{}'", text),
            Directive(text) => write!(fmt, "directive `#{}`", text),
            Eof => fmt.write_str("end of input"),
            other => write!(fmt, "`{}`", other.lexeme()),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Module,
    Interface,
    Struct,
    Exception,
    Enum,
    Typedef,
    Union,
    Switch,
    Case,
    Default,
    Const,
    Sequence,
    Unsigned,
    Short,
    Long,
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
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    In,
    Out,
    InOut,
    Oneway,
    Raises,
    Readonly,
    Attribute,
    True,
    False,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("module",    Keyword::Module),
    ("interface", Keyword::Interface),
    ("struct",    Keyword::Struct),
    ("exception", Keyword::Exception),
    ("enum",      Keyword::Enum),
    ("typedef",   Keyword::Typedef),
    ("union",     Keyword::Union),
    ("switch",    Keyword::Switch),
    ("case",      Keyword::Case),
    ("default",   Keyword::Default),
    ("const",     Keyword::Const),
    ("sequence",  Keyword::Sequence),
    ("unsigned",  Keyword::Unsigned),
    ("short",     Keyword::Short),
    ("long",      Keyword::Long),
    ("float",     Keyword::Float),
    ("double",    Keyword::Double),
    ("boolean",   Keyword::Boolean),
    ("char",      Keyword::Char),
    ("wchar",     Keyword::WChar),
    ("octet",     Keyword::Octet),
    ("string",    Keyword::String),
    ("wstring",   Keyword::WString),
    ("any",       Keyword::Any),
    ("void",      Keyword::Void),
    ("int8",      Keyword::Int8),
    ("uint8",     Keyword::UInt8),
    ("int16",     Keyword::Int16),
    ("uint16",    Keyword::UInt16),
    ("int32",     Keyword::Int32),
    ("uint32",    Keyword::UInt32),
    ("int64",     Keyword::Int64),
    ("uint64",    Keyword::UInt64),
    ("in",        Keyword::In),
    ("out",       Keyword::Out),
    ("inout",     Keyword::InOut),
    ("oneway",    Keyword::Oneway),
    ("raises",    Keyword::Raises),
    ("readonly",  Keyword::Readonly),
    ("attribute", Keyword::Attribute),
    ("TRUE",      Keyword::True),
    ("FALSE",     Keyword::False),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map_or("?", |&(name, _)| name);

        fmt.write_str(name)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: Peekable<S>,
    state: State,
    start: Location,
    last: Location,
    finished: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido
    /// sin consumir más entrada.
    Complete(Token),

    /// Se encontró `:`, puede seguir otro para formar `::`.
    Colon,

    /// Se encontró `/`: comentario u operador.
    Slash,

    /// Comentario de línea, termina en `'\n'`.
    LineComment,

    /// Comentario de bloque. `star` indica si el último carácter fue `*`.
    BlockComment { star: bool },

    /// Identificador o palabra clave.
    Word(String),

    /// Literal numérico.
    Number { digits: String, fraction: bool },

    /// Literal de texto (`"`) o de carácter (`'`).
    Quoted {
        quote: char,
        text: String,
        escaped: bool,
    },

    /// Línea de preprocesador.
    Directive(String),

    /// Secuencia de operador.
    Operator(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let last = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            last,
            finished: false,
        }
    }

    /// Obtiene el siguiente token.
    ///
    /// Al llegar al final de la entrada se emite [`Token::Eof`], lo cual
    /// se repite indefinidamente en llamadas posteriores.
    pub fn next_token(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        let result = self.lex();
        self.state = State::Start;

        match result {
            Ok(token) => {
                let location = Location::span(self.start.clone(), &self.last);
                Ok(Located::at(token, location))
            }

            Err((error, location)) => Err(Located::at(error, location)),
        }
    }

    /// Reduce la entrada completa a una secuencia de tokens, sin incluir
    /// [`Token::Eof`], o al primer error encontrado.
    pub fn try_exhaustive(self) -> Result<Vec<Located<Token>>, Located<LexerError>> {
        self.collect()
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Token, (LexerError, Location)> {
        use State::*;

        loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let (next_char, here) = match self.source.peek() {
                Some(Ok((c, location))) => (Some(*c), location.clone()),
                Some(Err(_)) => match self.source.next() {
                    Some(Err(error)) => return Err((error.into(), self.last.clone())),
                    _ => continue,
                },

                None => (None, self.last.clone()),
            };

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = here.clone();
            }

            match (&mut self.state, next_char) {
                (Start, None) => return Ok(Token::Eof),

                // Tokens triviales
                (Start, Some('{')) => self.state = Complete(Token::OpenCurly),
                (Start, Some('}')) => self.state = Complete(Token::CloseCurly),
                (Start, Some('(')) => self.state = Complete(Token::OpenParen),
                (Start, Some(')')) => self.state = Complete(Token::CloseParen),
                (Start, Some('[')) => self.state = Complete(Token::OpenSquare),
                (Start, Some(']')) => self.state = Complete(Token::CloseSquare),
                (Start, Some(';')) => self.state = Complete(Token::Semicolon),
                (Start, Some(',')) => self.state = Complete(Token::Comma),
                (Start, Some(':')) => self.state = Colon,
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('#')) => self.state = Directive(String::new()),

                (Start, Some(quote @ ('"' | '\''))) => {
                    self.state = Quoted {
                        quote,
                        text: String::new(),
                        escaped: false,
                    }
                }

                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Number {
                        digits: c.to_string(),
                        fraction: false,
                    }
                }

                (Start, Some(c)) if is_operator_char(c) => self.state = Operator(c.to_string()),

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => return Err((LexerError::BadChar(c), here)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => return Ok(std::mem::replace(token, Token::Eof)),

                (Colon, Some(':')) => self.state = Complete(Token::Scope),
                (Colon, _) => return Ok(Token::Colon),

                (Slash, Some('/')) => self.state = LineComment,
                (Slash, Some('*')) => self.state = BlockComment { star: false },
                (Slash, Some(c)) if is_operator_char(c) => {
                    self.state = Complete(Token::Operator(format!("/{}", c)))
                }

                (Slash, _) => return Ok(Token::Operator(String::from("/"))),

                // Los comentarios de línea descartan el resto de la línea
                (LineComment, Some('\n')) | (LineComment, None) => self.state = Start,
                (LineComment, Some(_)) => (),

                (BlockComment { .. }, None) => {
                    return Err((LexerError::UnterminatedComment, self.start.clone()))
                }

                (BlockComment { star: true }, Some('/')) => self.state = Start,
                (BlockComment { star }, Some(c)) => *star = c == '*',

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    let word = std::mem::take(word);
                    return Ok(word_token(word));
                }

                (Number { digits, .. }, Some(c)) if c.is_ascii_digit() => digits.push(c),
                (Number { digits, fraction }, Some('.')) if !*fraction => {
                    digits.push('.');
                    *fraction = true;
                }

                (Number { digits, .. }, _) => return Ok(Token::Number(std::mem::take(digits))),

                (Quoted { quote, .. }, None) | (Quoted { quote, .. }, Some('\n')) => {
                    let what = if *quote == '"' { "string" } else { "character" };
                    return Err((LexerError::Unterminated(what), self.start.clone()));
                }

                // Los escapes se conservan sin interpretar
                (Quoted { text, escaped, .. }, Some(c)) if *escaped => {
                    text.push(c);
                    *escaped = false;
                }

                (Quoted { text, escaped, .. }, Some('\\')) => {
                    text.push('\\');
                    *escaped = true;
                }

                (Quoted { quote, text, .. }, Some(c)) if c == *quote => {
                    let text = std::mem::take(text);
                    let token = if *quote == '"' {
                        Token::StringLiteral(text)
                    } else {
                        Token::CharLiteral(text)
                    };

                    self.state = Complete(token);
                }

                (Quoted { text, .. }, Some(c)) => text.push(c),

                (Directive(text), Some('\n')) | (Directive(text), None) => {
                    return Ok(Token::Directive(text.trim().to_owned()))
                }

                (Directive(text), Some(c)) => text.push(c),

                // Operadores de a lo sumo dos caracteres
                (Operator(operator), Some(c)) if is_operator_char(c) => {
                    operator.push(c);
                    let operator = std::mem::take(operator);
                    self.state = Complete(Token::Operator(operator));
                }

                (Operator(operator), _) => return Ok(Token::Operator(std::mem::take(operator))),
            }

            // Si no hubo `return`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok((_, location))) = self.source.next() {
                self.last = location;
            }
        }
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_token() {
            Ok(token) if *token.as_ref() == Token::Eof => {
                self.finished = true;
                None
            }

            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }

            ok => Some(ok),
        }
    }
}

/// Clasifica un término terminado. Las palabras clave distinguen
/// mayúsculas, así que `IN` o `Module` son identificadores.
fn word_token(word: String) -> Token {
    match Keyword::from_str(&word) {
        Ok(keyword) => Token::Keyword(keyword),
        Err(_) => Token::Id(Identifier::from(word.as_str())),
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Caracteres que forman operadores.
fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '<' | '>' | '=' | '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '!'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    fn lex(text: &str) -> Result<Vec<Located<Token>>, Located<LexerError>> {
        let (start, stream) = source::consume(text.as_bytes(), "test.idl");
        Lexer::new(start, stream).try_exhaustive()
    }

    fn tokens(text: &str) -> Vec<Token> {
        lex(text)
            .expect("lexing failed")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn dump(text: &str) -> String {
        tokens(text)
            .iter()
            .map(Token::lexeme)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn struct_declaration() {
        insta::assert_snapshot!(
            dump("struct Point { long x; unsigned long long y; };"),
            @"struct Point { long x ; unsigned long long y ; } ;"
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            tokens("module _private Abc9"),
            vec![
                Token::Keyword(Keyword::Module),
                Token::Id(Identifier::from("_private")),
                Token::Id(Identifier::from("Abc9")),
            ]
        );
    }

    #[test]
    fn scope_and_colon() {
        assert_eq!(
            tokens("::A::B : C"),
            vec![
                Token::Scope,
                Token::Id(Identifier::from("A")),
                Token::Scope,
                Token::Id(Identifier::from("B")),
                Token::Colon,
                Token::Id(Identifier::from("C")),
            ]
        );
    }

    #[test]
    fn numbers_take_one_decimal_point() {
        assert_eq!(
            tokens("42 3.14"),
            vec![
                Token::Number("42".into()),
                Token::Number("3.14".into()),
            ]
        );
    }

    #[test]
    fn escapes_are_kept_verbatim() {
        assert_eq!(
            tokens(r#""a\"b\n" '\''"#),
            vec![
                Token::StringLiteral(r#"a\"b\n"#.into()),
                Token::CharLiteral(r"\'".into()),
            ]
        );
    }

    #[test]
    fn operators_are_greedy_up_to_two() {
        insta::assert_snapshot!(dump("a<<=b >> -1 /="), @"a << = b >> - 1 /=");
    }

    #[test]
    fn comments_are_skipped() {
        let text = "// line\nlong /* block\n * still */ x; // trailing";
        insta::assert_snapshot!(dump(text), @"long x ;");
    }

    #[test]
    fn directives_are_opaque() {
        assert_eq!(
            tokens("#include <a.idl>\nmodule"),
            vec![
                Token::Directive("include <a.idl>".into()),
                Token::Keyword(Keyword::Module),
            ]
        );
    }

    #[test]
    fn locations_are_one_based_lines_zero_based_columns() {
        let located = lex("module\n  Foo").expect("lexing failed");
        assert_eq!(located[0].location().to_string(), "test.idl:1:0");
        assert_eq!(located[1].location().line(), 2);
        assert_eq!(located[1].location().column(), 2);
        assert_eq!(located[1].location().end().column(), 5);
    }

    #[test]
    fn end_of_input_repeats() {
        let (start, stream) = source::consume("x".as_bytes(), "test.idl");
        let mut lexer = Lexer::new(start, stream);

        assert!(matches!(lexer.next_token().unwrap().into_inner(), Token::Id(_)));
        for _ in 0..3 {
            assert_eq!(lexer.next_token().unwrap().into_inner(), Token::Eof);
        }
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let error = lex("const string s = \"abc;\nlong").unwrap_err();
        assert!(matches!(error.as_ref(), LexerError::Unterminated("string")));
        assert_eq!(error.location().to_string(), "test.idl:1:17");
    }

    #[test]
    fn unterminated_comment_is_fatal() {
        let error = lex("long /* never closed").unwrap_err();
        assert!(matches!(error.as_ref(), LexerError::UnterminatedComment));
    }

    #[test]
    fn illegal_character_is_fatal() {
        let error = lex("long $x;").unwrap_err();
        assert!(matches!(error.as_ref(), LexerError::BadChar('$')));
        assert_eq!(error.to_string(), "test.idl:1:5: Bad character '$' in input stream");
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(
            tokens("in IN Module module DEFAULT"),
            vec![
                Token::Keyword(Keyword::In),
                Token::Id(Identifier::from("IN")),
                Token::Id(Identifier::from("Module")),
                Token::Keyword(Keyword::Module),
                Token::Id(Identifier::from("DEFAULT")),
            ]
        );
    }
}
