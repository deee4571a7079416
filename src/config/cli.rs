use crate::domain::model::{Product, ProductQuery};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "stock-ledger")]
#[command(about = "Stock ledger kept in SharePoint lists")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "stock-ledger.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Print results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register a new product
    Register(RegisterArgs),
    /// Find products by exactly one key
    Lookup {
        #[command(flatten)]
        key: KeyArgs,
        /// List every match instead of the first one
        #[arg(long)]
        all: bool,
    },
    /// Record stock received
    Inbound {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        unit_value: f64,
        #[arg(long)]
        invoice: String,
    },
    /// Record stock issued
    Outbound {
        #[arg(long)]
        factory_code: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        truck_plate: String,
        #[arg(long)]
        recipient: String,
    },
    /// Show the current balance of a product
    Balance {
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Show the movement history of a product
    History {
        #[arg(long)]
        factory_code: String,
        /// Write the history as CSV to this path
        #[arg(long)]
        csv: Option<String>,
    },
}

/// Missing fields are left empty so the writer reports them.
#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(long, default_value = "")]
    pub factory_code: String,
    #[arg(long, default_value = "")]
    pub supplier_code: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "")]
    pub supplier_name: String,
    #[arg(long, default_value = "")]
    pub unit_of_measure: String,
}

impl From<RegisterArgs> for Product {
    fn from(args: RegisterArgs) -> Self {
        Product {
            factory_code: args.factory_code,
            supplier_code: args.supplier_code,
            description: args.description,
            supplier_name: args.supplier_name,
            unit_of_measure: args.unit_of_measure,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    #[arg(long)]
    pub factory_code: Option<String>,
    #[arg(long)]
    pub supplier_code: Option<String>,
    /// Part of the product description
    #[arg(long)]
    pub description: Option<String>,
}

impl From<KeyArgs> for ProductQuery {
    fn from(args: KeyArgs) -> Self {
        ProductQuery {
            factory_code: args.factory_code.map(|c| c.trim().to_uppercase()),
            supplier_code: args.supplier_code.map(|c| c.trim().to_uppercase()),
            description: args.description,
        }
    }
}
