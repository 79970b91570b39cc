use accord_core::assertions::TestAssertion;
use accord_core::loader::{load_contracts, LoadedContract};
use accord_core::stub::{MessageStub, StubMapping};
use accord_core::{CompiledContract, Compiler, CompilerConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "accord")]
#[command(author, version, about = "Compile consumer-driven contracts into stubs and test assertions")]
struct Args {
    /// Compiler configuration (YAML)
    #[arg(short, long, global = true, env = "ACCORD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one WireMock mapping per HTTP contract, one message stub per messaging contract
    Stubs {
        /// Contract file or directory
        path: PathBuf,
        /// Directory the mappings are written to
        #[arg(short, long, default_value = "mappings")]
        output: PathBuf,
    },
    /// Print the test assertions as JSON
    Assertions {
        /// Contract file or directory
        path: PathBuf,
    },
    /// Compile contracts without writing anything
    Check {
        /// Contract file or directory
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CompilerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CompilerConfig::default(),
    };
    let compiler = Compiler::new(config);

    match args.command {
        Command::Stubs { path, output } => write_stubs(&compiler, &path, &output),
        Command::Assertions { path } => {
            let assertions = compile_all(&compiler, &path)?
                .iter()
                .map(|(_, compiled)| TestAssertion::from_compiled(compiled))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&assertions)?);
            Ok(())
        }
        Command::Check { path } => {
            let compiled = compile_all(&compiler, &path)?;
            info!(contracts = compiled.len(), "all contracts compile");
            Ok(())
        }
    }
}

fn compile_all(compiler: &Compiler, path: &Path) -> anyhow::Result<Vec<(PathBuf, CompiledContract)>> {
    let loaded = load_contracts(path)?;
    if loaded.is_empty() {
        warn!(path = %path.display(), "no contract files found");
    }
    loaded
        .into_iter()
        .map(|LoadedContract { file, contract }| {
            let compiled = compiler
                .compile(&contract)
                .with_context(|| format!("in {}", file.display()))?;
            Ok((file, compiled))
        })
        .collect()
}

fn write_stubs(compiler: &Compiler, path: &Path, output: &Path) -> anyhow::Result<()> {
    let compiled = compile_all(compiler, path)?;
    let messages = output.join("messages");
    let (mut mappings, mut message_stubs) = (0, 0);

    for (file, contract) in &compiled {
        if let Some(mapping) = StubMapping::from_compiled(contract, compiler.config())? {
            write_json(&output.join(format!("{}.json", contract.name)), &mapping)
                .with_context(|| format!("writing stub for {}", file.display()))?;
            mappings += 1;
        }
        if let Some(stub) = MessageStub::from_compiled(contract)? {
            write_json(&messages.join(format!("{}.json", contract.name)), &stub)
                .with_context(|| format!("writing message stub for {}", file.display()))?;
            message_stubs += 1;
        }
    }
    info!(mappings, messages = message_stubs, output = %output.display(), "stubs written");
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
