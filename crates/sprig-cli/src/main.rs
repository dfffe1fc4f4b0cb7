//! Sprig CLI entry point.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rhizome_sprig_eval::selfhost::compile_on_thread_with;
use rhizome_sprig_ir::{Object, Value, wire};
use rhizome_sprig_runtime::{Lang, SprigConfig, Surface};
use rhizome_sprig_syntax::{
    Parser as SprigParser, SyntaxError, compile_program, compile_script, is_program, tokenize,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Sprig language toolchain")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Wire JSON
    Json,
    /// Parenthesized S-expression text
    Sexpr,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream as JSON
    Tokenize {
        /// Input file (or - for stdin)
        file: String,
    },

    /// Print the syntax tree as JSON
    Parse {
        /// Input file (or - for stdin)
        file: String,
    },

    /// Lower surface syntax to S-expressions
    Transpile {
        /// Input file (or - for stdin)
        file: String,

        /// Use the self-hosted compiler instead of the native frontend
        #[arg(long)]
        self_hosted: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Evaluate a statement list and print its value
    Eval {
        /// Input file (or - for stdin)
        file: String,

        /// Backend: surface, native, sexpr or self-hosted
        #[arg(short, long)]
        lang: Option<Lang>,
    },

    /// Load a program, dispatch actions and print the resulting state
    Run {
        /// Input file (or - for stdin)
        file: String,

        /// Backend: surface, native, sexpr or self-hosted
        #[arg(short, long)]
        lang: Option<Lang>,

        /// JSON object merged into the state after loading
        #[arg(long)]
        state: Option<String>,

        /// Action to dispatch, as NAME or NAME=JSON. A JSON list is passed
        /// as the arguments, an object as the context.
        #[arg(short, long = "action")]
        actions: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sprig=info".parse()?)
                .add_directive("rhizome_sprig=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            SprigConfig::from_file(path)?
        }
        None => SprigConfig::default(),
    };

    match cli.command {
        Commands::Tokenize { file } => {
            let tokens = tokenize(&read_input(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }

        Commands::Parse { file } => {
            let tokens = tokenize(&read_input(&file)?)?;
            let parser = SprigParser::with_options(tokens.clone(), &config.parse);
            let json = if is_program(&tokens) {
                serde_json::to_string_pretty(&parser.parse_program()?)?
            } else {
                serde_json::to_string_pretty(&parser.parse_script()?)?
            };
            println!("{json}");
        }

        Commands::Transpile {
            file,
            self_hosted,
            format,
            out,
        } => {
            let source = read_input(&file)?;
            let expr = if self_hosted {
                compile_on_thread_with(&source, config.runtime.bootstrap_limits())?
            } else {
                lower(&source, &config)?
            };
            let text = match format {
                Format::Json => wire::to_string_pretty(&expr)?,
                Format::Sexpr => expr.to_string(),
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, &text)?;
                    info!("{} -> {}", file, path.display());
                }
                None => println!("{text}"),
            }
        }

        Commands::Eval { file, lang } => {
            let source = read_input(&file)?;
            let lang = lang.unwrap_or(config.runtime.default_lang);
            let mut surface = Surface::new(config);
            let result = match lang {
                Lang::Surface => surface.evaluate(&source, &Object::new())?,
                Lang::Native => {
                    surface.load_code("{}", Lang::Native)?;
                    surface.evaluate(&source, &Object::new())?
                }
                // Whole programs: the result is the state they leave behind.
                Lang::Sexpr | Lang::SelfHosted => {
                    surface.load_code(&source, lang)?;
                    Value::Object(surface.state())
                }
            };
            println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        }

        Commands::Run {
            file,
            lang,
            state,
            actions,
        } => {
            let source = read_input(&file)?;
            let lang = lang.unwrap_or(config.runtime.default_lang);
            let mut surface = Surface::new(config);
            surface.load_code(&source, lang)?;
            if let Some(state) = state {
                let json: serde_json::Value = serde_json::from_str(&state)?;
                surface.apply_update(&Value::from_json(&json))?;
            }
            for action in &actions {
                let (name, context) = parse_action(action)?;
                surface.handle_action(name, &context)?;
            }
            println!("{}", serde_json::to_string_pretty(&surface.state_json())?);
        }
    }

    Ok(())
}

fn read_input(file: &str) -> std::io::Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file)
    }
}

fn lower(source: &str, config: &SprigConfig) -> Result<Value, SyntaxError> {
    if is_program(&tokenize(source)?) {
        compile_program(source, &config.parse)
    } else {
        compile_script(source, &config.parse)
    }
}

/// Splits `NAME=JSON` into an action name and its context.
fn parse_action(spec: &str) -> Result<(&str, Object), serde_json::Error> {
    let Some((name, json)) = spec.split_once('=') else {
        return Ok((spec, Object::new()));
    };
    let context = match Value::from_json(&serde_json::from_str(json)?) {
        Value::Object(map) => map,
        Value::List(items) => Object::from([("args".to_string(), Value::List(items))]),
        other => Object::from([("args".to_string(), Value::List(vec![other]))]),
    };
    Ok((name, context))
}
