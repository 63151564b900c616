use clap::{Subcommand, ValueEnum};
use model::{catalog::SizeCategory, connection::EngineKind};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// List the wizard steps with their titles
    Steps,

    /// Fold a JSON action journal into the final wizard state
    Replay {
        #[arg(long, help = "JSON file holding an array of timestamped actions")]
        actions: PathBuf,

        #[arg(long, help = "Write the state here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Test one connection descriptor against the simulated backend
    TestConn {
        /// postgresql, mysql, sqlite, oracle or mssql (aliases accepted)
        #[arg(long)]
        engine: EngineKind,

        #[arg(long, default_value = "localhost")]
        host: String,

        /// Defaults to the engine's standard port
        #[arg(long)]
        port: Option<u16>,

        #[arg(long, default_value = "")]
        database: String,

        #[arg(long, default_value = "")]
        username: String,

        #[arg(long)]
        ssl: bool,

        #[arg(long, help = "Simulation settings JSON file")]
        settings: Option<PathBuf>,
    },

    /// Print the mock source catalog
    Catalog {
        #[arg(long, help = "Case-insensitive name filter")]
        search: Option<String>,

        #[arg(long, value_enum, help = "Only tables of this size")]
        size: Option<SizeArg>,
    },

    /// Run steps 1 to 3 of a session and print the dry-run summary
    DryRun {
        #[arg(long, help = "Session JSON file")]
        session: PathBuf,

        #[arg(long, help = "Simulation settings JSON file")]
        settings: Option<PathBuf>,

        #[arg(long, help = "Write the summary here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Run a full session through the migration console
    Run {
        #[arg(long, help = "Session JSON file")]
        session: PathBuf,

        #[arg(long, help = "Simulation settings JSON file")]
        settings: Option<PathBuf>,

        #[arg(long, help = ".env file with WIZARD_* overrides")]
        env_file: Option<PathBuf>,

        #[arg(long, help = "Directory to export the migration log into")]
        logs_dir: Option<PathBuf>,

        #[arg(long, help = "Write the summary here instead of stdout")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SizeArg {
    Small,
    Medium,
    Large,
}

impl From<SizeArg> for SizeCategory {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::Small => SizeCategory::Small,
            SizeArg::Medium => SizeCategory::Medium,
            SizeArg::Large => SizeCategory::Large,
        }
    }
}
