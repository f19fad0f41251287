use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fleetlink")]
#[command(version)]
#[command(about = "Fleet telematics client: vehicles, live status and service requests", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON file with the document collections (overrides [documents] path)
    #[arg(long, global = true, env = "FLEETLINK_DOCUMENTS_FILE")]
    pub documents: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output_format: OutputFormat,

    /// Don't print the busy indicator while requests are in flight
    #[arg(long, global = true)]
    pub no_indicator: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Sign in with the configured service account
    Auth,
    /// Show a group
    Group {
        /// Group id
        id: String,
    },
    /// List the devices in one or more groups
    Devices {
        /// Group id (repeatable)
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,
    },
    /// Show a single device
    Device {
        /// Device id
        id: String,
    },
    /// Live status for the devices in one or more groups, sorted by name
    Status {
        /// Group id (repeatable)
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,
    },
    /// Resolve a user's groups and load their devices
    Sync {
        /// User id in the `users` collection
        #[arg(long)]
        uid: String,
    },
    /// Service request history, newest first
    History {
        /// Only requests made by this user
        #[arg(long)]
        uid: Option<String>,
        /// Only requests that are still open
        #[arg(long)]
        open: bool,
    },
    /// List the issues a service request can report
    Issues,
    /// Submit a service request
    Request {
        /// Requesting user id
        #[arg(long)]
        uid: String,
        /// Driver name
        #[arg(long)]
        name: Option<String>,
        /// Call-back phone number
        #[arg(long)]
        phone: Option<String>,
        /// Tractor the request is about
        #[arg(long)]
        tractor: Option<String>,
        /// Issue number from `fleetlink issues` (repeatable)
        #[arg(short, long = "issue")]
        issues: Vec<usize>,
        /// Description when "Other" is selected
        #[arg(long)]
        other: Option<String>,
    },
    /// Show or update a user's account profile
    Account {
        /// User id in the `users` collection
        #[arg(long)]
        uid: String,
        /// New full name
        #[arg(long)]
        name: Option<String>,
        /// New customer name
        #[arg(long)]
        customer: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_groups() {
        let cli = Cli::try_parse_from(["fleetlink", "status", "-g", "b1", "--group", "b2"]).unwrap();
        match cli.command {
            Commands::Status { groups } => assert_eq!(groups, vec!["b1", "b2"]),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.output_format, OutputFormat::Text);
    }

    #[test]
    fn test_devices_requires_a_group() {
        assert!(Cli::try_parse_from(["fleetlink", "devices"]).is_err());
    }

    #[test]
    fn test_request_flags() {
        let cli = Cli::try_parse_from([
            "fleetlink", "request", "--uid", "u1", "--name", "Dana", "-i", "0", "-i", "20",
            "--other", "mirror", "--output-format", "json",
        ])
        .unwrap();
        assert_eq!(cli.output_format, OutputFormat::Json);
        match cli.command {
            Commands::Request { uid, issues, other, .. } => {
                assert_eq!(uid, "u1");
                assert_eq!(issues, vec![0, 20]);
                assert_eq!(other.as_deref(), Some("mirror"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_account_flags() {
        let cli = Cli::try_parse_from(["fleetlink", "account", "--uid", "u1", "--customer", "Acme"])
            .unwrap();
        match cli.command {
            Commands::Account { uid, name, customer } => {
                assert_eq!(uid, "u1");
                assert_eq!(name, None);
                assert_eq!(customer.as_deref(), Some("Acme"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
