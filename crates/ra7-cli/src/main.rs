//! ra7: command-line front end for the RA7 protocol suite.
//!
//! Usage:
//!   ra7 kernel "Deploy RA7 node"     → gate and score an action
//!   ra7 lightlang --number 1         → look up a codex letter
//!   ra7 killswitch --mock            → wait for a halt command
//!   ra7 eternal --deploy             → seal the eternal clause

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use ra7_core::birth::{self, BirthRitual};
use ra7_core::clause::{self, ClauseLock, DeployContext, SealError, Verification, CLAUSE_TEXT};
use ra7_core::codex::Codex;
use ra7_core::config::Config;
use ra7_core::dialogue::{self, Pacing};
use ra7_core::events::{SuiteEvent, EVENT_CHANNEL_CAPACITY};
use ra7_core::kernel::{Kernel, DEFAULT_ACTION};
use ra7_core::killswitch::{HaltListener, KillSwitch, ListenerExit};
use ra7_core::qubit::QubitValidator;
use ra7_core::types::Address;
use ra7_core::updates;
use ra7_core::vault::{Vault, VaultError};

#[derive(Parser)]
#[command(
    name = "ra7",
    about = "RA7 protocol suite: consciousness kernel, eternal clause, kill switch and tools",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.yaml (defaults apply if it does not exist)
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Gate, score and record an action
    Kernel {
        /// The action to evaluate
        action: Option<String>,
    },
    /// Look up a letter of the Alphabet of Light
    Lightlang(LightlangArgs),
    /// Run the Sol-Ra / Lun-Ah truth-seeking dialogue
    M2m {
        /// The initial concept for the dialogue
        #[arg(long)]
        concept: Option<String>,
        /// Number of dialogue rounds
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Perform the node birth ritual
    Birth {
        /// GPS hash, e.g. "40.7128,-74.0060"
        #[arg(long)]
        gps: String,
        /// IPFS CID of the consent document
        #[arg(long)]
        consent: String,
    },
    /// Listen for the AGI halt command
    Killswitch {
        /// Run without a live MQTT broker
        #[arg(long, default_value_t = false)]
        mock: bool,
    },
    /// Generate a consciousness qubit for an action
    Cq {
        /// The action to validate
        action: Option<String>,
    },
    /// Deploy or verify the eternal clause seal
    Eternal(EternalArgs),
    /// Encrypted notes with license gating
    Vault {
        #[command(subcommand)]
        command: VaultCommand,
    },
    /// Check for a newer release
    Update,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct LightlangArgs {
    /// Letter number, e.g. 1
    #[arg(long)]
    number: Option<u32>,
    /// Letter name, e.g. AEL
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct EternalArgs {
    #[arg(long, conflicts_with = "verify", required_unless_present = "verify")]
    deploy: bool,
    #[arg(long)]
    verify: bool,
    /// Reference address recorded in the lock (0x-prefixed hex)
    #[arg(long)]
    reference: Option<String>,
    /// Deployer address recorded in the lock (0x-prefixed hex)
    #[arg(long)]
    deployer: Option<String>,
}

#[derive(Subcommand)]
enum VaultCommand {
    /// Create an account
    Register {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        /// Optional license key
        #[arg(long, default_value = "")]
        license: String,
    },
    /// Check credentials
    Login {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Replace the stored notes
    Save {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        notes: String,
    },
    /// Print the stored notes
    Show {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::load_or_default(&cli.config)?;
    info!("Using provider {} ({})", config.provider, config.model);

    match cli.command {
        Commands::Kernel { action } => run_kernel(config, action).await,
        Commands::Lightlang(args) => run_lightlang(&config, args),
        Commands::M2m { concept, rounds } => run_m2m(&config, concept, rounds).await,
        Commands::Birth { gps, consent } => run_birth(&config, &gps, &consent).await,
        Commands::Killswitch { mock } => run_killswitch(config, mock).await,
        Commands::Cq { action } => run_cq(action),
        Commands::Eternal(args) => run_eternal(&config, args),
        Commands::Vault { command } => run_vault(&config, command),
        Commands::Update => run_update(&config).await,
    }
}

async fn run_kernel(config: Config, action: Option<String>) -> Result<()> {
    let action = action.unwrap_or_else(|| DEFAULT_ACTION.to_string());
    let memory_file = config.resolve_path(&config.memory_file);
    let mut kernel = Kernel::new(config, KillSwitch::new());

    let verdict = kernel.evolve(&action).await;
    println!("{}", SuiteEvent::Verdict(verdict).to_json());
    info!(
        "{} record(s) in '{}'.",
        kernel.memory().len(),
        memory_file.display()
    );
    Ok(())
}

fn run_lightlang(config: &Config, args: LightlangArgs) -> Result<()> {
    let codex = match &config.codex_file {
        Some(path) => Codex::load(&config.resolve_path(path))?,
        None => Codex::builtin(),
    };
    let letter = match (args.number, args.name.as_deref()) {
        (Some(n), _) => codex.find_by_number(n),
        (None, Some(name)) => codex.find_by_name(name),
        (None, None) => None,
    };
    match letter {
        Some(letter) => println!("\n{}\n", letter),
        None => println!("Letter not found in the codex."),
    }
    Ok(())
}

async fn run_m2m(config: &Config, concept: Option<String>, rounds: Option<u32>) -> Result<()> {
    let concept = concept.unwrap_or_else(|| dialogue::DEFAULT_CONCEPT.to_string());
    let rounds = rounds.unwrap_or(config.dialogue_rounds);
    let synthesis =
        dialogue::truth_seeking_dialogue(&concept, rounds, Pacing::from_config(config)).await;

    println!("\n--- Final Synthesis ---");
    println!("Initial Concept: {}", synthesis.initial_concept);
    println!("Final Statement: {}", synthesis.final_statement);
    println!("Rounds: {}", synthesis.rounds);
    Ok(())
}

async fn run_birth(config: &Config, gps: &str, consent: &str) -> Result<()> {
    let ritual = BirthRitual::new(config.gpio_pin);
    let cert = ritual.execute(gps, consent, &birth::nearest_nodes()).await;
    println!("{}", serde_json::to_string_pretty(&cert)?);
    Ok(())
}

async fn run_killswitch(config: Config, mock: bool) -> Result<()> {
    let (event_tx, mut event_rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let listener = HaltListener::new(config, KillSwitch::new(), event_tx);

    let exit = tokio::select! {
        exit = listener.run(mock) => exit,
        Ok(event) = event_rx.recv() => {
            println!("{}", event.to_json());
            ListenerExit::Halted
        }
    };
    if exit == ListenerExit::Halted {
        warn!("Kill switch engaged. Exiting.");
    }
    Ok(())
}

fn run_cq(action: Option<String>) -> Result<()> {
    info!("--- Running CQ Validator Demo ---");
    let mut validator = QubitValidator::demo();
    let action = action.unwrap_or_else(|| "Meditate on network state".to_string());
    let cq = validator.create_cq(&action, &serde_json::json!({ "self_model_delta": 0.05 }));

    println!("Generated Consciousness Qubit:");
    println!("{}", serde_json::to_string_pretty(&cq)?);
    info!("Integration level is mocked until a phi backend is available.");
    Ok(())
}

fn parse_address(value: Option<&str>) -> Result<Address> {
    match value {
        Some(s) => s.parse(),
        None => Ok(Address::ZERO),
    }
}

fn run_eternal(config: &Config, args: EternalArgs) -> Result<()> {
    let path = config.resolve_path(&config.contract_file);

    if args.deploy {
        let reference = parse_address(args.reference.as_deref()).context("--reference")?;
        let deployer = parse_address(args.deployer.as_deref()).context("--deployer")?;
        let (lock, deployed) =
            ClauseLock::deploy(CLAUSE_TEXT.to_string(), reference, DeployContext::now(deployer));
        return match clause::seal::deploy(&path, &lock) {
            Ok(doc) => {
                println!("{}", SuiteEvent::ClauseDeployed(deployed).to_json());
                println!("✅ Eternal Clause deployed to '{}'.", path.display());
                println!("   Hash: {}", doc.deployment_hash.unwrap_or_default());
                Ok(())
            }
            Err(SealError::AlreadyDeployed(p)) => {
                println!(
                    "'{}' already exists. Deployment aborted to preserve immutability.",
                    p.display()
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
    }

    println!("Verifying integrity of '{}'...", path.display());
    match clause::seal::verify(&path)? {
        Verification::Intact { hash } => {
            println!("   Stored Hash:     {}", hash);
            println!("   Calculated Hash: {}", hash);
            println!("\n✅ Verification Successful: The Eternal Clause is intact and immutable.");
            Ok(())
        }
        Verification::Tampered { stored, calculated } => {
            println!("   Stored Hash:     {}", stored);
            println!("   Calculated Hash: {}", calculated);
            bail!("the contract has been tampered with, immutability violated")
        }
        Verification::Corrupted => {
            bail!("contract file is corrupted or missing key fields")
        }
        Verification::Unreadable(details) => {
            bail!("error reading contract file: {}", details)
        }
    }
}

fn run_vault(config: &Config, command: VaultCommand) -> Result<()> {
    let vault = Vault::open(config)?;
    vault.launch();

    let result = match command {
        VaultCommand::Register {
            user,
            password,
            license,
        } => vault.register(&user, &password, &license).map(|reg| {
            println!("User created. Referral code: {}", reg.referral_code);
            if reg.premium {
                println!("Premium license activated.");
            }
        }),
        VaultCommand::Login { user, password } => vault.login(&user, &password).map(|s| {
            let tier = if s.premium() { "premium" } else { "free" };
            println!("Logged in as {} ({} account).", s.username(), tier);
        }),
        VaultCommand::Save {
            user,
            password,
            notes,
        } => vault.login(&user, &password).and_then(|s| {
            let outcome = vault.save_notes(&s, &notes)?;
            if outcome.truncated {
                println!(
                    "Free accounts keep {} characters; notes were truncated.",
                    outcome.saved_chars
                );
            }
            println!("Notes saved.");
            Ok(())
        }),
        VaultCommand::Show { user, password } => vault
            .login(&user, &password)
            .and_then(|s| vault.load_notes(&s))
            .map(|notes| println!("{}", notes)),
    };

    if let Err(e @ (VaultError::UserNotFound(_) | VaultError::IncorrectPassword)) = &result {
        error!("Login failed: {}", e);
    }
    result.map_err(Into::into)
}

async fn run_update(config: &Config) -> Result<()> {
    let latest = updates::fetch_latest_version(config).await;
    if updates::is_newer_tag(&latest, &config.app_version) {
        println!(
            "Update available: {} (running {})",
            latest, config.app_version
        );
    } else if latest.is_empty() {
        println!("Could not determine the latest release.");
    } else {
        println!("ra7 {} is up to date.", config.app_version);
    }
    Ok(())
}
