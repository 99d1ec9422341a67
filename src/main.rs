use clap::Parser;
use envx::cli::commands::{
    audit_cmd, completions, decrypt, delete, encrypt, envelope, get, keygen, list, rotate, run, set,
};
use envx::cli::{AuditAction, Cli, Commands, EnvelopeAction};
use envx::errors::EnvxError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keygen { ref output } => keygen::execute(output.as_deref()),
        Commands::Encrypt {
            ref name,
            ref value,
        } => encrypt::execute(&cli, name, value.as_deref()),
        Commands::Decrypt {
            ref name,
            ref value,
        } => decrypt::execute(&cli, name, value),
        Commands::Set {
            ref name,
            ref value,
            plain,
        } => set::execute(&cli, name, value.as_deref(), plain),
        Commands::Get { ref name } => get::execute(&cli, name.as_deref()),
        Commands::List => list::execute(&cli),
        Commands::Delete { ref name, force } => delete::execute(&cli, name, force),
        Commands::Rotate { dry_run } => rotate::execute(&cli, dry_run),
        Commands::Run { ref command } => run::execute(&cli, command),
        Commands::Envelope { ref action } => match action {
            EnvelopeAction::Create {
                scope,
                ttl,
                output_file,
            } => envelope::create(&cli, scope, ttl.as_deref(), output_file.as_deref()),
            EnvelopeAction::Inspect { token, json } => envelope::inspect(&cli, token, *json),
            EnvelopeAction::Run { token, command } => envelope::run(&cli, token, command),
            EnvelopeAction::List { last } => envelope::list(&cli, *last),
        },
        Commands::Audit { ref action } => match action {
            AuditAction::Show { last } => audit_cmd::show(&cli, *last),
            AuditAction::Verify => audit_cmd::verify(&cli),
        },
        Commands::Completions { shell } => completions::execute(shell),
    };

    if let Err(e) = result {
        let code = match e {
            // The child already reported its own failure.
            EnvxError::ChildProcessFailed(code) => code,
            _ => 1,
        };
        envx::cli::output::error(&e.to_string());
        std::process::exit(code);
    }
}

/// Log to stderr so stdout stays clean for tokens and values.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
