//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{crate_version, Arg, Command};
use env_logger::Env;
use log::error;

use idlc::{
    codegen::{
        self,
        format::{External, Plain},
        GenerateFlags, Options,
    },
    error::Diagnostics,
    parse::{self, Session},
};

use std::{fs::File, io::BufReader, path::Path};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // Parsing de CLI
    let args = Command::new("IDL compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("IDL source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("DIR")
                .default_value(".")
                .help("Output directory"),
        )
        .arg(
            Arg::new("package")
                .short('p')
                .long("package")
                .takes_value(true)
                .value_name("NAME")
                .required_unless_present("dump")
                .help("Target package name"),
        )
        .arg(
            Arg::new("deps")
                .short('d')
                .long("deps")
                .takes_value(true)
                .value_name("LIST")
                .use_value_delimiter(true)
                .help("Comma-separated extra imports"),
        )
        .arg(
            Arg::new("include")
                .short('I')
                .long("include")
                .takes_value(true)
                .value_name("DIRS")
                .multiple_occurrences(true)
                .use_value_delimiter(true)
                .help("Comma-separated include search directories"),
        )
        .arg(
            Arg::new("formatter")
                .long("formatter")
                .takes_value(true)
                .value_name("COMMAND")
                .help("External formatter, e.g. 'gofmt' (plain formatter as fallback)"),
        )
        .arg(
            Arg::new("fail-fast")
                .long("fail-fast")
                .help("Abort on the first artifact that fails to format"),
        )
        .arg(
            Arg::new("no-nested")
                .long("no-nested")
                .help("Do not emit types nested inside interfaces"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Print declared types instead of generating code"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").context("Missing input file")?;

    let mut session = Session::new().with_resolver(parse::open_file);
    for dir in args.values_of("include").into_iter().flatten() {
        session = session.include_dir(dir);
    }

    let file = File::open(input).with_context(|| format!("Failed to open: {}", input))?;
    let root = match parse::parse_with(BufReader::new(file), input, &mut session) {
        Ok(root) => root,
        Err(error) => {
            eprint!("{}", Diagnostics::from(error));
            std::process::exit(1);
        }
    };

    if args.is_present("dump") {
        for (name, typ) in root.all_types() {
            println!("{:<9} {}", typ.kind().describe(), name);
        }

        return Ok(());
    }

    let package = args.value_of("package").context("Missing package name")?;
    let mut options = Options::new(package);

    options.dependencies = args
        .values_of("deps")
        .into_iter()
        .flatten()
        .filter(|dep| !dep.is_empty())
        .map(String::from)
        .collect();

    if args.is_present("fail-fast") {
        options.flags |= GenerateFlags::FAIL_FAST;
    }

    if args.is_present("no-nested") {
        options.flags |= GenerateFlags::SKIP_NESTED;
    }

    if let Some(command) = args.value_of("formatter") {
        let external = External::from_command(command).context("Empty formatter command")?;
        options.formatters = vec![Box::new(external), Box::new(Plain)];
    }

    let output = Path::new(args.value_of("output").unwrap_or("."));
    let report = codegen::generate(&root, output, &options)
        .with_context(|| format!("Failed to generate into: {}", output.display()))?;

    if !report.is_success() {
        for (path, failure) in &report.failed {
            error!("{}: {}", path.display(), failure);
        }

        bail!(
            "{} of {} artifacts were left unformatted",
            report.failed.len(),
            report.written.len()
        );
    }

    Ok(())
}
