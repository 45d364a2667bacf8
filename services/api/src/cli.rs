use crate::demo::{run_demo, run_statement, DemoArgs, StatementArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use superapp_core::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Superapp Ledger",
    about = "Run the wallet ledger service or walk through its workflows from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run an end-to-end demo covering wallet, PayLater, review and payroll flows
    Demo(DemoArgs),
    /// Print a CSV statement for a scripted wallet history
    Statement(StatementArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Statement(args) => run_statement(args),
    }
}
