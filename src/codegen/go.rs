//! Traducción del modelo semántico a artefactos Go.
//!
//! Cada tipo declarado produce un artefacto. Todo artefacto incluye un
//! tipo `<Nombre>Helper` con la identidad del tipo (identificador de
//! repositorio y nombre IDL), que satisface `runtime.Helper`.
//!
//! Las referencias `A::B::C` no se resuelven: se traducen al nombre
//! exportado de su último componente.

use super::{
    artifact::{Arm, Artifact, Const, Decl, Func, Signature, Stmt},
    GenerateFlags, Options,
};

use crate::model::{
    Attribute, Direction, Enum, Interface, Module, Operation, Primitive, Struct, Type, TypeDef,
    TypeKind, Union,
};

/// Paquete del runtime, del cual depende todo artefacto.
pub const RUNTIME_PACKAGE: &str = "idl/runtime";

/// Archivo de las constantes de un módulo. Ningún identificador IDL
/// contiene `.`, así que no choca con el artefacto de un tipo.
pub const CONSTANTS: &str = "module.constants";

/// Artefactos de un módulo, en orden de declaración.
///
/// `prefix` es el prefijo de repositorio efectivo, heredado del módulo
/// más cercano que declaró uno.
pub fn artifacts(module: &Module, prefix: &str, options: &Options) -> Vec<Artifact> {
    let context = Context {
        module,
        prefix,
        options,
    };

    let mut artifacts = Vec::new();
    for typ in module.types().iter() {
        artifacts.extend(context.artifact(typ, None));

        if let TypeKind::Interface(interface) = typ.kind() {
            if !options.flags.contains(GenerateFlags::SKIP_NESTED) {
                for nested in interface.nested.iter() {
                    artifacts.extend(context.artifact(nested, Some(&interface.name)));
                }
            }
        }
    }

    if !module.constants().is_empty() {
        artifacts.push(context.constants());
    }

    artifacts
}

struct Context<'a> {
    module: &'a Module,
    prefix: &'a str,
    options: &'a Options,
}

impl Context<'_> {
    fn artifact(&self, typ: &Type, owner: Option<&str>) -> Option<Artifact> {
        let name = typ.name();
        let (file, qualified) = match owner {
            Some(owner) => (
                format!("{}_{}", owner.to_lowercase(), name.to_lowercase()),
                self.module.qualify(&format!("{}::{}", owner, name)),
            ),

            None => (name.to_lowercase(), self.module.qualify(name)),
        };

        // Los tipos anidados llevan el nombre de su interfaz: `I::Mode` es `IMode`
        let go_name = match owner {
            Some(owner) => format!("{}{}", exported(owner), exported(name)),
            None => exported(name),
        };

        let mut artifact = self.start(file, &qualified);
        let id = self.repository_id(typ, owner);

        match typ.kind() {
            TypeKind::Struct(structure) => self.structure(&mut artifact, &go_name, structure, &id),
            TypeKind::Enum(enumeration) => self.enumeration(&mut artifact, &go_name, enumeration),
            TypeKind::TypeDef(typedef) => self.typedef(&mut artifact, &go_name, typedef),
            TypeKind::Union(union) => self.union(&mut artifact, &go_name, union),
            TypeKind::Interface(interface) => self.interface(&mut artifact, &go_name, interface),

            // Solo las declaraciones producen artefactos
            TypeKind::Simple(_) | TypeKind::Sequence(_) | TypeKind::Scoped(_) => return None,
        }

        helper(&mut artifact, &go_name, &id, name);
        if let TypeKind::Interface(_) = typ.kind() {
            artifact.push(Decl::Func(narrow(&go_name)));
        }

        Some(artifact)
    }

    fn start(&self, file: String, qualified: &str) -> Artifact {
        let header = format!("Code generated by idlc from {}. DO NOT EDIT.", qualified);
        let mut artifact = Artifact::new(file, &self.options.package, header);

        artifact.import(quote(RUNTIME_PACKAGE));
        for dependency in &self.options.dependencies {
            if dependency.contains('"') {
                artifact.import(dependency.as_str());
            } else {
                artifact.import(quote(dependency));
            }
        }

        artifact
    }

    /// Identificador estampado por pragma, o `IDL:<prefijo/>A/B/Nombre:1.0`.
    fn repository_id(&self, typ: &Type, owner: Option<&str>) -> String {
        if !typ.repository_id().is_empty() {
            return typ.repository_id().to_owned();
        }

        let mut path = self.module.path();
        path.extend(owner);
        path.push(typ.name());

        if self.prefix.is_empty() {
            format!("IDL:{}:1.0", path.join("/"))
        } else {
            format!("IDL:{}/{}:1.0", self.prefix, path.join("/"))
        }
    }

    fn structure(&self, artifact: &mut Artifact, name: &str, structure: &Struct, id: &str) {
        let name = name.to_owned();
        let fields = structure
            .fields
            .iter()
            .map(|field| (exported(&field.name), go_type(&field.of)))
            .collect();

        let what = if structure.exception {
            "exception"
        } else {
            "struct"
        };

        artifact.push(Decl::Comment(format!("{} is the IDL {} {}.", name, what, structure.name)));
        artifact.push(Decl::Struct {
            name: name.clone(),
            fields,
        });

        constructor(artifact, &name);

        if structure.exception {
            artifact.push(Decl::Func(Func::method(
                "e",
                format!("*{}", name),
                Signature::new("Error").result("string"),
                vec![Stmt::line(format!("return {}", quote(id)))],
            )));
        }
    }

    fn enumeration(&self, artifact: &mut Artifact, name: &str, enumeration: &Enum) {
        let name = name.to_owned();
        let names = format!("{}Names", lower_first(&name));

        artifact.import(quote("strconv"));
        artifact.push(Decl::Comment(format!("{} is the IDL enum {}.", name, enumeration.name)));
        artifact.push(Decl::Defined {
            name: name.clone(),
            underlying: String::from("int32"),
        });

        let elements = enumeration
            .elements
            .iter()
            .enumerate()
            .map(|(ordinal, element)| Const {
                name: format!("{}{}", name, exported(element)),
                typ: Some(name.clone()),
                value: ordinal.to_string(),
            })
            .collect();

        artifact.push(Decl::Consts(elements));

        let quoted: Vec<_> = enumeration.elements.iter().map(|e| quote(e)).collect();
        artifact.push(Decl::Var {
            name: names.clone(),
            typ: None,
            value: Some(format!("[...]string{{{}}}", quoted.join(", "))),
        });

        let out_of_range = format!(
            "return {} + strconv.Itoa(int(e)) + \")\"",
            quote(&format!("{}(", name))
        );

        artifact.push(Decl::Func(Func::method(
            "e",
            &name,
            Signature::new("String").result("string"),
            vec![
                Stmt::block(
                    format!("if e < 0 || int(e) >= len({})", names),
                    vec![Stmt::line(out_of_range)],
                ),
                Stmt::line(format!("return {}[e]", names)),
            ],
        )));

        artifact.push(Decl::Comment(format!(
            "{}FromString looks up an element by its IDL name.",
            name
        )));

        artifact.push(Decl::Func(Func::new(
            Signature::new(format!("{}FromString", name))
                .param("name", "string")
                .result(&name)
                .result("bool"),
            vec![
                Stmt::block(
                    format!("for index, candidate := range {}", names),
                    vec![Stmt::block(
                        "if candidate == name",
                        vec![Stmt::line(format!("return {}(index), true", name))],
                    )],
                ),
                Stmt::line("return 0, false"),
            ],
        )));
    }

    fn typedef(&self, artifact: &mut Artifact, name: &str, typedef: &TypeDef) {
        let name = name.to_owned();

        artifact.push(Decl::Comment(format!("{} is the IDL typedef {}.", name, typedef.name)));
        artifact.push(Decl::Alias {
            name,
            target: go_type(&typedef.target),
        });
    }

    fn union(&self, artifact: &mut Artifact, name: &str, union: &Union) {
        let name = name.to_owned();
        let receiver = format!("*{}", name);
        let discriminant = go_type(&union.discriminant);

        artifact.push(Decl::Comment(format!("{} is the IDL union {}.", name, union.name)));
        artifact.push(Decl::Struct {
            name: name.clone(),
            fields: vec![
                (String::from("Discriminator"), discriminant.clone()),
                (String::from("Value"), String::from("interface{}")),
            ],
        });

        constructor(artifact, &name);

        let claimed: Vec<String> = union
            .cases
            .iter()
            .filter(|case| !case.is_default())
            .flat_map(|case| case.labels.iter())
            .map(|label| union_label(&union.discriminant, label))
            .collect();

        for case in &union.cases {
            let of = go_type(&case.of);
            let member = exported(&case.name);
            let zero = vec![
                Stmt::line(format!("var zero {}", of)),
                Stmt::line("return zero, false"),
            ];

            let take = vec![
                Stmt::line(format!("value, ok := u.Value.({})", of)),
                Stmt::line("return value, ok"),
            ];

            // `default` responde a todo valor que ningún otro caso reclame
            let (getter, setter) = if case.is_default() {
                let mut getter = Vec::new();
                if !claimed.is_empty() {
                    getter.push(Stmt::Switch {
                        subject: String::from("u.Discriminator"),
                        arms: vec![Arm {
                            labels: claimed.clone(),
                            body: zero,
                        }],
                    });
                }

                getter.extend(take);

                let setter = Func::method(
                    "u",
                    &receiver,
                    Signature::new(format!("Set{}", member))
                        .param("discriminator", &discriminant)
                        .param("value", &of),
                    vec![
                        Stmt::line("u.Discriminator = discriminator"),
                        Stmt::line("u.Value = value"),
                    ],
                );

                (getter, setter)
            } else {
                let labels: Vec<_> = case
                    .labels
                    .iter()
                    .map(|label| union_label(&union.discriminant, label))
                    .collect();

                let mut getter = vec![Stmt::Switch {
                    subject: String::from("u.Discriminator"),
                    arms: vec![Arm {
                        labels: labels.clone(),
                        body: take,
                    }],
                }];

                getter.extend(zero);

                let setter = Func::method(
                    "u",
                    &receiver,
                    Signature::new(format!("Set{}", member)).param("value", &of),
                    vec![
                        Stmt::line(format!(
                            "u.Discriminator = {}",
                            labels.first().map_or("", String::as_str)
                        )),
                        Stmt::line("u.Value = value"),
                    ],
                );

                (getter, setter)
            };

            artifact.push(Decl::Func(Func::method(
                "u",
                &receiver,
                Signature::new(format!("Get{}", member))
                    .result(&of)
                    .result("bool"),
                getter,
            )));

            artifact.push(Decl::Func(setter));
        }
    }

    fn interface(&self, artifact: &mut Artifact, name: &str, interface: &Interface) {
        let name = name.to_owned();
        let parents: Vec<String> = interface
            .parents
            .iter()
            .map(|parent| exported(last_component(parent)))
            .collect();

        // Conjunto de capacidades
        let mut methods: Vec<Signature> = interface
            .operations
            .iter()
            .map(|operation| self.signature(operation))
            .collect();

        for attribute in &interface.attributes {
            methods.push(getter(attribute));
            if !attribute.readonly {
                methods.push(setter(attribute));
            }
        }

        artifact.push(Decl::Comment(format!(
            "{} is the capability set of the IDL interface {}.",
            name, interface.name
        )));

        artifact.push(Decl::Interface {
            name: name.clone(),
            embeds: parents.clone(),
            methods: methods.clone(),
        });

        self.stub(artifact, interface, &name, &parents);
        self.servant(artifact, interface, &name, &parents);
    }

    fn stub(&self, artifact: &mut Artifact, interface: &Interface, name: &str, parents: &[String]) {
        let stub = format!("{}Stub", name);
        let receiver = format!("*{}", stub);

        let mut fields: Vec<_> = parents
            .iter()
            .map(|parent| (String::new(), format!("{}Stub", parent)))
            .collect();

        fields.push((String::from("Ref"), String::from("runtime.Handle")));

        artifact.push(Decl::Comment(format!(
            "{} forwards {} calls to a remote object.",
            stub, name
        )));

        artifact.push(Decl::Struct {
            name: stub.clone(),
            fields,
        });

        let mut init: Vec<_> = parents
            .iter()
            .map(|parent| format!("{0}Stub: *New{0}Stub(ref)", parent))
            .collect();

        init.push(String::from("Ref: ref"));

        artifact.push(Decl::Func(Func::new(
            Signature::new(format!("New{}", stub))
                .param("ref", "runtime.Handle")
                .result(&receiver),
            vec![Stmt::line(format!("return &{}{{{}}}", stub, init.join(", ")))],
        )));

        for operation in &interface.operations {
            let signature = self.signature(operation);
            let args: Vec<String> = signature.params.iter().map(|(name, _)| name.clone()).collect();
            let body = forward(&operation.name, &args, &operation.returns, operation.oneway);

            artifact.push(Decl::Func(Func::method("s", &receiver, signature, body)));
        }

        for attribute in &interface.attributes {
            let body = forward(&format!("_get_{}", attribute.name), &[], &attribute.of, false);
            artifact.push(Decl::Func(Func::method("s", &receiver, getter(attribute), body)));

            if !attribute.readonly {
                let args = [String::from("value")];
                let void = Type::from(Primitive::Void);
                let body = forward(&format!("_set_{}", attribute.name), &args, &void, false);

                artifact.push(Decl::Func(Func::method("s", &receiver, setter(attribute), body)));
            }
        }
    }

    fn servant(&self, artifact: &mut Artifact, interface: &Interface, name: &str, parents: &[String]) {
        let servant = format!("{}Servant", name);
        let receiver = format!("*{}", servant);

        artifact.push(Decl::Comment(format!(
            "{} dispatches incoming calls to a {} implementation.",
            servant, name
        )));

        artifact.push(Decl::Struct {
            name: servant.clone(),
            fields: vec![(String::from("Impl"), name.to_owned())],
        });

        artifact.push(Decl::Func(Func::new(
            Signature::new(format!("New{}", servant))
                .param("impl", name)
                .result(&receiver),
            vec![Stmt::line(format!("return &{}{{Impl: impl}}", servant))],
        )));

        let mut arms = Vec::new();
        for operation in &interface.operations {
            let signature = self.signature(operation);
            let types: Vec<&str> = signature.params.iter().map(|(_, typ)| typ.as_str()).collect();
            let call = format!("s.Impl.{}({})", signature.name, unpack(&types));

            arms.push(dispatch_arm(&operation.name, types.len(), &call, is_void(&operation.returns)));
        }

        for attribute in &interface.attributes {
            let call = format!("s.Impl.{}()", getter(attribute).name);
            arms.push(dispatch_arm(&format!("_get_{}", attribute.name), 0, &call, false));

            if !attribute.readonly {
                let of = go_type(&attribute.of);
                let call = format!("s.Impl.{}({})", setter(attribute).name, unpack(&[of.as_str()]));

                arms.push(dispatch_arm(&format!("_set_{}", attribute.name), 1, &call, true));
            }
        }

        let mut body = vec![Stmt::Switch {
            subject: String::from("operation"),
            arms,
        }];

        // Las operaciones heredadas se delegan a los adaptadores padre
        for parent in parents {
            body.push(Stmt::block(
                format!(
                    "if result, err := (&{}Servant{{Impl: s.Impl}}).Dispatch(operation, args); !runtime.IsBadOperation(err)",
                    parent
                ),
                vec![Stmt::line("return result, err")],
            ));
        }

        body.push(Stmt::line("return nil, runtime.NewBadOperation(operation)"));

        artifact.push(Decl::Func(Func::method(
            "s",
            &receiver,
            Signature::new("Dispatch")
                .param("operation", "string")
                .param("args", "[]interface{}")
                .result("interface{}")
                .result("error"),
            body,
        )));
    }

    fn signature(&self, operation: &Operation) -> Signature {
        let mut signature = Signature::new(exported(&operation.name));
        for parameter in &operation.parameters {
            let of = go_type(&parameter.of);
            let of = match parameter.direction {
                Direction::In => of,
                Direction::Out | Direction::InOut => format!("*{}", of),
            };

            signature = signature.param(local(&parameter.name), of);
        }

        if !is_void(&operation.returns) {
            signature = signature.result(go_type(&operation.returns));
        }

        signature.result("error")
    }

    fn constants(&self) -> Artifact {
        let qualified = if self.module.is_root() {
            String::from("the root module")
        } else {
            self.module.qualified_name()
        };

        let mut artifact = self.start(String::from(CONSTANTS), &qualified);
        let constants = self
            .module
            .constants()
            .iter()
            .map(|constant| Const {
                name: exported(&constant.name),
                typ: Some(go_type(&constant.of)),
                value: constant_value(&constant.value),
            })
            .collect();

        artifact.push(Decl::Consts(constants));
        artifact.push(Decl::Var {
            name: String::from("_"),
            typ: Some(String::from("runtime.Handle")),
            value: None,
        });

        artifact
    }
}

/// Tipo Go para un tipo IDL.
pub fn go_type(typ: &Type) -> String {
    match typ.kind() {
        TypeKind::Simple(primitive) => primitive_type(*primitive).to_owned(),
        TypeKind::Sequence(sequence) => format!("[]{}", go_type(&sequence.element)),
        TypeKind::Scoped(scoped) => exported(scoped.name()),
        _ => exported(typ.name()),
    }
}

/// Tabla fija de primitivos.
pub fn primitive_type(primitive: Primitive) -> &'static str {
    use Primitive::*;

    match primitive {
        Int8 => "int8",
        UInt8 => "uint8",
        Short => "int16",
        UShort => "uint16",
        Long => "int32",
        ULong => "uint32",
        LongLong => "int64",
        ULongLong => "uint64",
        Float => "float32",
        Double => "float64",
        Boolean => "bool",
        Char | Octet => "byte",
        WChar => "rune",
        String | WString => "string",
        Any => "interface{}",
        Void => "",
    }
}

fn is_void(typ: &Type) -> bool {
    matches!(typ.kind(), TypeKind::Simple(Primitive::Void))
}

/// Tipo `<Nombre>Helper` con `Id()` y `Name()`.
fn helper(artifact: &mut Artifact, name: &str, id: &str, idl_name: &str) {
    let helper = format!("{}Helper", name);

    artifact.push(Decl::Comment(format!("{} describes {} ({}).", helper, name, id)));
    artifact.push(Decl::Struct {
        name: helper.clone(),
        fields: Vec::new(),
    });

    artifact.push(Decl::Func(Func::method(
        "",
        &helper,
        Signature::new("Id").result("string"),
        vec![Stmt::line(format!("return {}", quote(id)))],
    )));

    artifact.push(Decl::Func(Func::method(
        "",
        &helper,
        Signature::new("Name").result("string"),
        vec![Stmt::line(format!("return {}", quote(idl_name)))],
    )));

    artifact.push(Decl::Var {
        name: String::from("_"),
        typ: Some(String::from("runtime.Helper")),
        value: Some(format!("{}{{}}", helper)),
    });
}

/// `Narrow`: verificación de capacidades sobre un objeto genérico.
fn narrow(name: &str) -> Func {
    let body = vec![
        Stmt::Switch {
            subject: String::from("typed := object.(type)"),
            arms: vec![
                Arm {
                    labels: vec![name.to_owned()],
                    body: vec![Stmt::line("return typed, nil")],
                },
                Arm {
                    labels: vec![String::from("runtime.Handle")],
                    body: vec![Stmt::block(
                        "if typed.IsA(h.Id())",
                        vec![Stmt::line(format!("return New{}Stub(typed), nil", name))],
                    )],
                },
            ],
        },
        Stmt::line("return nil, runtime.NewBadNarrow(h.Id())"),
    ];

    Func::method(
        "h",
        format!("{}Helper", name),
        Signature::new("Narrow")
            .param("object", "interface{}")
            .result(name)
            .result("error"),
        body,
    )
}

/// `New<Nombre>()`, que construye el valor cero.
fn constructor(artifact: &mut Artifact, name: &str) {
    artifact.push(Decl::Func(Func::new(
        Signature::new(format!("New{}", name)).result(format!("*{}", name)),
        vec![Stmt::line(format!("return &{}{{}}", name))],
    )));
}

fn getter(attribute: &Attribute) -> Signature {
    Signature::new(format!("Get{}", exported(&attribute.name)))
        .result(go_type(&attribute.of))
        .result("error")
}

fn setter(attribute: &Attribute) -> Signature {
    Signature::new(format!("Set{}", exported(&attribute.name)))
        .param("value", go_type(&attribute.of))
        .result("error")
}

/// Cuerpo de un método de stub: invocación remota por nombre.
fn forward(operation: &str, args: &[String], returns: &Type, oneway: bool) -> Vec<Stmt> {
    let args: Vec<String> = std::iter::once(quote(operation))
        .chain(args.iter().cloned())
        .collect();

    let args = args.join(", ");

    if is_void(returns) {
        if oneway {
            return vec![Stmt::line(format!("return s.Ref.InvokeOneway({})", args))];
        }

        return vec![
            Stmt::line(format!("_, err := s.Ref.Invoke({})", args)),
            Stmt::line("return err"),
        ];
    }

    let of = go_type(returns);
    vec![
        Stmt::line(format!("result, err := s.Ref.Invoke({})", args)),
        Stmt::block(
            "if err != nil",
            vec![
                Stmt::line(format!("var zero {}", of)),
                Stmt::line("return zero, err"),
            ],
        ),
        Stmt::line(format!("typed, ok := result.({})", of)),
        Stmt::block(
            "if !ok",
            vec![
                Stmt::line(format!("var zero {}", of)),
                Stmt::line(format!(
                    "return zero, runtime.NewBadResult({}, result)",
                    quote(operation)
                )),
            ],
        ),
        Stmt::line("return typed, nil"),
    ]
}

/// Brazo de `Dispatch` para una operación de aridad conocida.
fn dispatch_arm(operation: &str, arity: usize, call: &str, void: bool) -> Arm {
    let mut body = Vec::new();
    if arity > 0 {
        body.push(Stmt::block(
            format!("if len(args) != {}", arity),
            vec![Stmt::line(format!(
                "return nil, runtime.NewBadArity(operation, {}, len(args))",
                arity
            ))],
        ));
    }

    if void {
        body.push(Stmt::line(format!("return nil, {}", call)));
    } else {
        body.push(Stmt::line(format!("return {}", call)));
    }

    Arm {
        labels: vec![quote(operation)],
        body,
    }
}

/// `args[0].(T0), args[1].(T1), ...`
fn unpack(types: &[&str]) -> String {
    types
        .iter()
        .enumerate()
        .map(|(index, typ)| format!("args[{}].({})", index, typ))
        .collect::<Vec<_>>()
        .join(", ")
}

fn union_label(discriminant: &Type, label: &str) -> String {
    match label {
        "TRUE" => return String::from("true"),
        "FALSE" => return String::from("false"),
        _ => (),
    }

    let symbolic = label
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == ':');

    match discriminant.kind() {
        TypeKind::Scoped(scoped) if symbolic => {
            format!("{}{}", exported(scoped.name()), exported(last_component(label)))
        }

        _ => label.to_owned(),
    }
}

fn constant_value(value: &str) -> String {
    match value {
        "TRUE" => String::from("true"),
        "FALSE" => String::from("false"),
        _ if value.contains("::") => exported(last_component(value)),
        _ => value.to_owned(),
    }
}

fn last_component(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Nombre exportado: primera letra en mayúscula.
pub fn exported(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var", "nil", "true", "false", "len",
    "error", "s", "result", "err", "typed", "ok", "zero", "args", "operation",
];

/// Nombre local: primera letra en minúscula, escapando palabras reservadas
/// y nombres que usa el código generado.
pub fn local(name: &str) -> String {
    let lowered = lower_first(name);
    if RESERVED.contains(&lowered.as_str()) {
        lowered + "_"
    } else {
        lowered
    }
}

/// Literal de texto Go.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');

    for c in text.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }

            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Module, parse::parse};

    fn options() -> Options {
        Options::new("demo")
    }

    fn generate(text: &str) -> Vec<Artifact> {
        let root = parse(text.as_bytes(), "test.idl").expect("parse failed");
        let module = root.submodules().next().unwrap_or(&root);

        artifacts(module, "", &options())
    }

    fn find<'a>(artifact: &'a Artifact, name: &str) -> &'a Func {
        artifact
            .funcs()
            .find(|func| func.signature.name == name)
            .unwrap_or_else(|| panic!("no func {}", name))
    }

    #[test]
    fn names() {
        assert_eq!(exported("point"), "Point");
        assert_eq!(local("Amount"), "amount");
        assert_eq!(local("type"), "type_");
        assert_eq!(local("result"), "result_");
        assert_eq!(quote("a\"b\\c"), r#""a\"b\\c""#);
    }

    #[test]
    fn primitive_table() {
        assert_eq!(primitive_type(Primitive::Long), "int32");
        assert_eq!(primitive_type(Primitive::ULongLong), "uint64");
        assert_eq!(primitive_type(Primitive::Octet), "byte");
        assert_eq!(primitive_type(Primitive::WChar), "rune");
        assert_eq!(primitive_type(Primitive::Any), "interface{}");
    }

    #[test]
    fn default_repository_ids_use_prefix_and_path() {
        let root = parse("module A { module B { struct S { long x; }; }; };".as_bytes(), "t.idl")
            .expect("parse failed");

        let b: &Module = root.find(&["A", "B"]).unwrap();
        let artifacts = artifacts(b, "example.org", &options());

        let id = find(&artifacts[0], "Id");
        assert_eq!(
            id.body,
            vec![Stmt::line("return \"IDL:example.org/A/B/S:1.0\"")]
        );
    }

    #[test]
    fn stamped_repository_id_wins() {
        let artifacts = generate("struct S { long x; };\n#pragma ID S \"IDL:custom/S:2.0\"\n");
        let id = find(&artifacts[0], "Id");

        assert_eq!(id.body, vec![Stmt::line("return \"IDL:custom/S:2.0\"")]);
    }

    #[test]
    fn enum_ordinals_follow_declaration() {
        let artifacts = generate("enum Color { Red, Green, Blue };");
        let consts = artifacts[0]
            .decls
            .iter()
            .find_map(|decl| match decl {
                Decl::Consts(consts) => Some(consts),
                _ => None,
            })
            .unwrap();

        let pairs: Vec<_> = consts
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![("ColorRed", "0"), ("ColorGreen", "1"), ("ColorBlue", "2")]
        );

        assert!(artifacts[0].imports.contains(&quote("strconv")));
    }

    #[test]
    fn union_default_excludes_other_labels() {
        let artifacts = generate(
            "enum K { A, B, C }; union U switch (K) { case A: long a; case B: string b; default: octet other; };",
        );

        let get = find(&artifacts[1], "GetOther");
        match &get.body[0] {
            Stmt::Switch { arms, .. } => assert_eq!(arms[0].labels, vec!["KA", "KB"]),
            other => panic!("unexpected {:?}", other),
        }

        let set = find(&artifacts[1], "SetOther");
        assert_eq!(
            set.signature.params[0],
            (String::from("discriminator"), String::from("K"))
        );
    }

    #[test]
    fn interface_methods_return_errors() {
        let artifacts = generate(
            "interface Calc { long add(in long a, out long b); oneway void ping(); readonly attribute string name; };",
        );

        let calc = &artifacts[0];
        let methods = calc
            .decls
            .iter()
            .find_map(|decl| match decl {
                Decl::Interface { methods, .. } => Some(methods),
                _ => None,
            })
            .unwrap();

        let add = &methods[0];
        assert_eq!(
            add.params,
            vec![
                (String::from("a"), String::from("int32")),
                (String::from("b"), String::from("*int32")),
            ]
        );
        assert_eq!(add.results, vec!["int32", "error"]);
        assert_eq!(methods[1].results, vec!["error"]);
        assert_eq!(methods[2].name, "GetName");
        assert_eq!(methods.len(), 3);

        let dispatch = find(calc, "Dispatch");
        let labels: Vec<_> = match &dispatch.body[0] {
            Stmt::Switch { arms, .. } => arms.iter().flat_map(|arm| arm.labels.clone()).collect(),
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(labels, vec!["\"add\"", "\"ping\"", "\"_get_name\""]);
    }

    #[test]
    fn nested_types_become_artifacts() {
        let text = "module M { interface I { enum Mode { On, Off }; void set(in Mode m); }; };";
        let artifacts = generate(text);

        let files: Vec<_> = artifacts.iter().map(|a| a.file.as_str()).collect();
        assert_eq!(files, vec!["i", "i_mode"]);

        let id = find(&artifacts[1], "Id");
        assert_eq!(id.body, vec![Stmt::line("return \"IDL:M/I/Mode:1.0\"")]);

        let defined = artifacts[1].decls.iter().find_map(|decl| match decl {
            Decl::Defined { name, .. } => Some(name.as_str()),
            _ => None,
        });

        assert_eq!(defined, Some("IMode"));

        let root = parse(text.as_bytes(), "t.idl").expect("parse failed");
        let mut options = options();
        options.flags |= GenerateFlags::SKIP_NESTED;

        let module = root.find(&["M"]).unwrap();
        assert_eq!(super::artifacts(module, "", &options).len(), 1);
    }

    #[test]
    fn constants_artifact() {
        let artifacts = generate("module M { const boolean On = TRUE; const long Max = 10; };");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file, CONSTANTS);

        match &artifacts[0].decls[0] {
            Decl::Consts(consts) => {
                assert_eq!(consts[0].value, "true");
                assert_eq!(consts[1].typ.as_deref(), Some("int32"));
            }

            other => panic!("unexpected {:?}", other),
        }
    }
}
