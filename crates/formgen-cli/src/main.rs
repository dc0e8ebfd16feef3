use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use formgen_core::validators::one_of;
use formgen_core::{
    parse_document, Catalog, CatalogSet, FieldData, Form, LocaleGeneration, Menu, SpecDocument, Translator,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// formgen — form and menu specification compiler
///
/// Check, compile and expand JSON form/menu specifications, bootstrap
/// locale catalogs and run submissions through the validation pipeline.
#[derive(Parser)]
#[command(name = "formgen", version, about, long_about = None)]
struct Cli {
    /// Print nothing on success
    #[arg(long, short, global = true)]
    quiet: bool,

    /// More logging on stderr (-v debug, -vv trace); RUST_LOG wins
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a specification compiles
    Check {
        /// Path to a .json specification
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the compiled skeleton
    Compile {
        /// Path to a .json specification
        file: PathBuf,
    },

    /// Print the skeleton expanded for a locale
    Expand {
        /// Path to a .json specification
        file: PathBuf,
        /// Directory holding <locale>.json catalogs
        #[arg(long)]
        locales_dir: Option<PathBuf>,
        /// Locale to expand for (needs --locales-dir)
        #[arg(long)]
        locale: Option<String>,
        /// Recompute instead of reusing a cached expansion
        #[arg(long)]
        force: bool,
    },

    /// Print the submit route of a form
    Route {
        /// Path to a .json specification
        file: PathBuf,
    },

    /// Add every translation key of a specification to locale catalogs
    Locales {
        /// Path to a .json specification
        file: PathBuf,
        /// Directory holding <locale>.json catalogs
        #[arg(long)]
        locales_dir: PathBuf,
        /// Locales to generate (repeatable)
        #[arg(long = "locale", required = true)]
        locales: Vec<String>,
    },

    /// Validate submitted data against a form
    Submit {
        /// Path to a .json specification
        file: PathBuf,
        /// Field data as a JSON object
        #[arg(long)]
        data: String,
        /// File data as a JSON object
        #[arg(long)]
        files: Option<String>,
        /// Directory holding <locale>.json catalogs
        #[arg(long)]
        locales_dir: Option<PathBuf>,
        /// Locale for validation messages (needs --locales-dir)
        #[arg(long)]
        locale: Option<String>,
    },

    /// Show version information
    Version,
}

// ── Outcomes ──────────────────────────────────────────────

/// Why a command failed; decides the exit code
enum Failure {
    /// Specification or submission rejected (exit 1)
    Invalid(String),
    /// I/O or usage problem (exit 2)
    Fatal(String),
}

impl Failure {
    fn code(&self) -> i32 {
        match self {
            Failure::Invalid(_) => 1,
            Failure::Fatal(_) => 2,
        }
    }

    fn message(&self) -> &str {
        match self {
            Failure::Invalid(m) | Failure::Fatal(m) => m,
        }
    }
}

impl From<formgen_core::Error> for Failure {
    fn from(err: formgen_core::Error) -> Self {
        match err {
            formgen_core::Error::Catalog { .. } => Failure::Fatal(err.to_string()),
            other => Failure::Invalid(other.to_string()),
        }
    }
}

type Outcome = Result<i32, Failure>;

enum Loaded {
    Form(Form),
    Menu(Menu),
}

impl Loaded {
    fn kind(&self) -> &'static str {
        match self {
            Loaded::Form(_) => "form",
            Loaded::Menu(_) => "menu",
        }
    }

    fn id(&self) -> &str {
        match self {
            Loaded::Form(f) => f.id(),
            Loaded::Menu(m) => m.id(),
        }
    }

    fn skeleton(&self) -> &formgen_core::Skeleton {
        match self {
            Loaded::Form(f) => f.skeleton(),
            Loaded::Menu(m) => m.skeleton(),
        }
    }

    fn into_form(self) -> Result<Form, Failure> {
        match self {
            Loaded::Form(f) => Ok(f),
            Loaded::Menu(m) => Err(Failure::Fatal(format!("\"{}\" is a menu, not a form", m.id()))),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn read_json(file: &Path) -> Result<serde_json::Value, Failure> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| Failure::Fatal(format!("cannot read {}: {}", file.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| Failure::Invalid(format!("{}: {}", file.display(), e)))
}

fn load(file: &Path, locales: Option<&LocaleGeneration>) -> Result<Loaded, Failure> {
    let doc = read_json(file)?;
    let loaded = match parse_document(&doc)? {
        SpecDocument::Form(spec) => Loaded::Form(Form::compile(&spec, locales)?),
        SpecDocument::Menu(spec) => Loaded::Menu(Menu::compile(&spec, locales)?),
    };
    tracing::debug!(file = %file.display(), kind = loaded.kind(), id = loaded.id(), "specification loaded");
    Ok(loaded)
}

fn translator(dir: Option<&Path>, locale: Option<&str>) -> Result<Option<Catalog>, Failure> {
    match (dir, locale) {
        (Some(dir), Some(locale)) => Ok(Some(Catalog::load(dir, locale)?)),
        (None, Some(_)) => Err(Failure::Fatal("--locale needs --locales-dir".into())),
        _ => Ok(None),
    }
}

fn parse_data(what: &str, raw: &str) -> Result<FieldData, Failure> {
    serde_json::from_str(raw).map_err(|e| Failure::Fatal(format!("--{} is not a JSON object: {}", what, e)))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Failure> {
    let text = serde_json::to_string_pretty(value).map_err(|e| Failure::Fatal(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// ── Commands ──────────────────────────────────────────────

fn check(file: &Path, json: bool, quiet: bool) -> Outcome {
    match load(file, None) {
        Ok(loaded) => {
            let elements = loaded.skeleton().walk().len();
            if json {
                print_json(&serde_json::json!({
                    "valid": true,
                    "kind": loaded.kind(),
                    "id": loaded.id(),
                    "elements": elements,
                    "fingerprint": loaded.skeleton().fingerprint(),
                }))?;
            } else if !quiet {
                println!(
                    "{} {} is valid ({} \"{}\", {} elements)",
                    "✓".green(),
                    file.display(),
                    loaded.kind(),
                    loaded.id(),
                    elements
                );
            }
            Ok(0)
        }
        Err(Failure::Invalid(message)) => {
            if json {
                print_json(&serde_json::json!({ "valid": false, "error": message }))?;
            } else {
                eprintln!("{} {}", "✗".red(), message);
            }
            Ok(1)
        }
        Err(fatal) => Err(fatal),
    }
}

fn compile(file: &Path) -> Outcome {
    match load(file, None)? {
        Loaded::Form(form) => {
            let registry = form.registry();
            print_json(&serde_json::json!({
                "skeleton": form.skeleton(),
                "expectedValues": form.expected(),
                "fields": registry.field_names().collect::<Vec<_>>(),
                "files": registry.file_names().collect::<Vec<_>>(),
            }))?;
        }
        Loaded::Menu(menu) => print_json(&serde_json::json!({ "skeleton": menu.skeleton() }))?,
    }
    Ok(0)
}

fn expand(file: &Path, dir: Option<&Path>, locale: Option<&str>, force: bool) -> Outcome {
    let catalog = translator(dir, locale)?;
    let provider = catalog.as_ref().map(|c| c as &dyn Translator);
    let expanded = match load(file, None)? {
        Loaded::Form(form) => form.expand(provider, force),
        Loaded::Menu(menu) => menu.expand(provider, force),
    };
    print_json(&*expanded)?;
    Ok(0)
}

fn route(file: &Path) -> Outcome {
    let form = load(file, None)?.into_form()?;
    let route = form.submit_route();
    println!("{} {}", route.method.to_uppercase(), route.path);
    Ok(0)
}

fn generate_locales(file: &Path, dir: &Path, locales: &[String], quiet: bool) -> Outcome {
    let set = CatalogSet::open(dir, locales)?;
    let generation = LocaleGeneration::new(&set, locales.iter().cloned());
    load(file, Some(&generation))?;
    let written = set.save()?;
    if !quiet {
        for path in written {
            println!("{} {}", "wrote".green(), path.display());
        }
    }
    Ok(0)
}

fn submit(
    file: &Path,
    data: &str,
    files: Option<&str>,
    dir: Option<&Path>,
    locale: Option<&str>,
) -> Outcome {
    let mut form = load(file, None)?.into_form()?;
    let fields = parse_data("data", data)?;
    let files = files.map(|raw| parse_data("files", raw)).transpose()?;
    let catalog = translator(dir, locale)?;
    let provider = catalog.as_ref().map(|c| c as &dyn Translator);

    let constrained: Vec<(String, Vec<String>)> = form
        .expected()
        .iter()
        .filter(|(name, values)| !values.is_empty() && form.registry().contains(name))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect();
    for (name, values) in constrained {
        form.set_validator(&name, Some(Arc::new(one_of(values))))?;
    }

    match futures::executor::block_on(form.validate(fields, files, provider)) {
        Ok(submission) => {
            print_json(&serde_json::json!({
                "valid": true,
                "fields": submission.fields,
                "files": submission.files,
            }))?;
            Ok(0)
        }
        Err(failure) => {
            print_json(&serde_json::json!({ "valid": false, "errors": failure }))?;
            Ok(1)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let quiet = cli.quiet;

    let outcome = match cli.command {
        Commands::Check { file, json } => check(&file, json, quiet),
        Commands::Compile { file } => compile(&file),
        Commands::Expand {
            file,
            locales_dir,
            locale,
            force,
        } => expand(&file, locales_dir.as_deref(), locale.as_deref(), force),
        Commands::Route { file } => route(&file),
        Commands::Locales {
            file,
            locales_dir,
            locales,
        } => generate_locales(&file, &locales_dir, &locales, quiet),
        Commands::Submit {
            file,
            data,
            files,
            locales_dir,
            locale,
        } => submit(
            &file,
            &data,
            files.as_deref(),
            locales_dir.as_deref(),
            locale.as_deref(),
        ),
        Commands::Version => {
            println!("formgen {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    };

    let code = match outcome {
        Ok(code) => code,
        Err(failure) => {
            eprintln!("{} {}", "error:".red().bold(), failure.message());
            failure.code()
        }
    };
    process::exit(code);
}
