//! txauth - terminal front end for the transaction gate
//!
//! Drives the core against a JSON credential file and a simulated biometric
//! sensor. PINs are read from stdin, one per line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use txauth_core::{
    AuthSettings, BiometricCapability, BiometricKind, Catalog, CredentialStore, EntryError,
    FileCredentialStore, GateOutcome, NoBiometrics, PinEntryPrompt, PinSetupForm, PinSubmission,
    ProtectedTransaction, SimulatedBiometric, SimulatedOutcome, TransactionAuthManager,
    TransactionCallbacks, Translator, VerificationGate,
};

/// txauth - verify transfers and card operations before they run
#[derive(Parser)]
#[command(name = "txauth")]
#[command(about = "Biometric and PIN verification for wallet transactions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding credentials.json (overrides the settings file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Behaviour of the simulated biometric sensor
    #[arg(long, global = true, value_enum, default_value = "approve")]
    biometric: BiometricMode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BiometricMode {
    /// No sensor on this device
    Unavailable,
    /// Every prompt succeeds
    Approve,
    /// Every prompt is declined by the user
    Reject,
    /// The sensor reports an error
    Error,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured verification methods
    Status,

    /// Choose how transactions are verified
    Setup {
        /// Enable biometric verification
        #[arg(long)]
        biometrics: bool,

        /// Set a transaction PIN (read twice from stdin)
        #[arg(long)]
        pin: bool,
    },

    /// Send money to a recipient
    Send {
        /// Recipient
        #[arg(long)]
        to: String,

        /// Amount to send
        #[arg(long)]
        amount: f64,
    },

    /// Top up a card
    TopUp {
        /// Card identifier
        #[arg(long)]
        card: String,

        /// Amount to load
        #[arg(long)]
        amount: f64,
    },

    /// Move funds off a card
    Unload {
        /// Card identifier
        #[arg(long)]
        card: String,

        /// Amount to unload
        #[arg(long)]
        amount: f64,
    },

    /// Clear stored credentials and verification settings
    Logout,
}

struct App {
    store: Arc<FileCredentialStore>,
    gate: Arc<VerificationGate>,
    catalog: Catalog,
    stdin: BufReader<Stdin>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "txauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut app = App::open(&cli).await?;

    match cli.command {
        Commands::Status => app.status().await?,
        Commands::Setup { biometrics, pin } => app.setup(biometrics, pin).await?,
        Commands::Send { to, amount } => {
            check_amount(amount)?;
            let description = format!("send {:.2} to {}", amount, to);
            app.protected(description, move || async move {
                info!("Sent {:.2} to {}", amount, to);
                Ok(())
            })
            .await?;
        }
        Commands::TopUp { card, amount } => {
            check_amount(amount)?;
            let description = format!("top up card {} with {:.2}", card, amount);
            app.protected(description, move || async move {
                info!("Loaded {:.2} onto card {}", amount, card);
                Ok(())
            })
            .await?;
        }
        Commands::Unload { card, amount } => {
            check_amount(amount)?;
            let description = format!("unload {:.2} from card {}", amount, card);
            app.protected(description, move || async move {
                info!("Unloaded {:.2} from card {}", amount, card);
                Ok(())
            })
            .await?;
        }
        Commands::Logout => {
            app.gate.sign_out().await;
            println!("Signed out. Transaction verification must be set up again.");
        }
    }

    Ok(())
}

fn check_amount(amount: f64) -> anyhow::Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be a positive number");
    }
    Ok(())
}

fn simulated_sensor(mode: BiometricMode) -> Arc<dyn BiometricCapability> {
    let outcome = match mode {
        BiometricMode::Unavailable => return Arc::new(NoBiometrics),
        BiometricMode::Approve => SimulatedOutcome::Approve,
        BiometricMode::Reject => SimulatedOutcome::Reject,
        BiometricMode::Error => SimulatedOutcome::Error,
    };
    Arc::new(SimulatedBiometric::enrolled(BiometricKind::Fingerprint, outcome))
}

impl App {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let settings_path = cli.settings.clone().unwrap_or_else(AuthSettings::default_path);
        let settings = AuthSettings::load_or_default(&settings_path)
            .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

        let store_path = match (&cli.data_dir, &settings.store_path) {
            (Some(dir), _) => dir.join("credentials.json"),
            (None, Some(path)) => path.clone(),
            (None, None) => FileCredentialStore::default_path(),
        };
        let store = Arc::new(
            FileCredentialStore::open(&store_path)
                .await
                .with_context(|| format!("Failed to open {}", store_path.display()))?,
        );
        info!("Using credential store at {}", store.path().display());

        let manager = TransactionAuthManager::load(store.clone(), simulated_sensor(cli.biometric))
            .await
            .with_settings(&settings)
            .context("Invalid settings")?;
        let gate = VerificationGate::new(Arc::new(manager)).with_settings(settings.gate.clone());

        Ok(Self {
            store,
            gate: Arc::new(gate),
            catalog: Catalog::english(),
            stdin: BufReader::new(tokio::io::stdin()),
        })
    }

    async fn status(&self) -> anyhow::Result<()> {
        let manager = self.gate.manager();
        let config = manager.config().await;
        let logged_in_before = self.store.has_ever_logged_in().await.unwrap_or_else(|e| {
            warn!("Failed to read login history: {}", e);
            false
        });

        println!("\n=== Transaction Verification ===\n");
        println!("Credential store: {}", self.store.path().display());
        println!("Configured:       {}", yes_no(config.is_configured));
        println!("Biometrics:       {}", yes_no(config.use_biometrics));
        println!("PIN:              {}", yes_no(config.use_pin));
        println!(
            "Sensor:           {}",
            manager.biometric_label().await.unwrap_or("none")
        );
        println!("Logged in before: {}", yes_no(logged_in_before));

        if !config.is_configured {
            println!("\nRun 'txauth setup' to choose a verification method.");
        }
        Ok(())
    }

    async fn setup(&mut self, biometrics: bool, pin: bool) -> anyhow::Result<()> {
        let mut form = PinSetupForm::open(self.gate.manager()).await;
        let labels = form.labels(&self.catalog);
        println!("\n=== {} ===\n", labels.title);
        println!("{}\n", labels.subtitle);

        if biometrics && !form.biometrics_offered() {
            println!("Biometrics are not available on this device.");
        }
        form.set_use_biometrics(biometrics);

        if pin {
            let Some(first) = self.read_secret(&labels.pin_prompt).await? else {
                form.dismiss(&self.gate).await;
                bail!("Setup cancelled");
            };
            let confirm_prompt = self.catalog.translate("pin_setup.confirm_pin", &[]);
            let Some(second) = self.read_secret(&confirm_prompt).await? else {
                form.dismiss(&self.gate).await;
                bail!("Setup cancelled");
            };
            form.set_pin(&first, &second);
        }

        match form.submit(&self.gate).await {
            Ok(config) => {
                if let Err(e) = self.store.set_has_ever_logged_in(true).await {
                    warn!("Failed to record login: {}", e);
                }
                println!(
                    "Saved. Biometrics: {}, PIN: {}",
                    yes_no(config.use_biometrics),
                    yes_no(config.use_pin)
                );
                Ok(())
            }
            Err(e) => match form.error_message(&self.catalog) {
                Some(message) => bail!("{}", message),
                None => Err(e).context("Failed to save verification settings"),
            },
        }
    }

    /// Run a money-moving action behind the gate, prompting for the PIN if needed
    async fn protected<T, Fut>(&mut self, description: String, transaction: T) -> anyhow::Result<()>
    where
        T: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        let wrapper = ProtectedTransaction::new(Arc::clone(&self.gate));
        let done = description.clone();
        let callbacks = TransactionCallbacks::new()
            .on_success(move || println!("Done: {}", done))
            .on_error(|e: String| eprintln!("Transaction failed: {}", e));

        match wrapper
            .execute_protected_transaction(transaction, callbacks)
            .await
        {
            GateOutcome::Authorized => Ok(()),
            GateOutcome::AwaitingPin => self.enter_pin(&description).await,
            GateOutcome::SetupRequired => {
                println!("Transaction verification is not set up.");
                println!("Run 'txauth setup' first, then retry.");
                Ok(())
            }
            GateOutcome::Denied => bail!("No usable verification method; run 'txauth setup' again"),
        }
    }

    async fn enter_pin(&mut self, description: &str) -> anyhow::Result<()> {
        let mut prompt = PinEntryPrompt::new();
        let labels = prompt.labels(&self.catalog);
        println!("\n=== {} ===\n", labels.title);
        println!("Confirm: {}", description);
        println!("{} (empty line to {})", labels.subtitle, labels.cancel.to_lowercase());

        loop {
            let Some(pin) = self.read_secret("PIN").await? else {
                prompt.cancel(&self.gate).await;
                println!("Cancelled.");
                return Ok(());
            };
            prompt.set_input(&pin);

            match prompt.submit(&self.gate).await {
                PinSubmission::Accepted { .. } => return Ok(()),
                PinSubmission::Rejected { .. } => {
                    if let Some(message) = prompt.error_message(&self.catalog) {
                        eprintln!("{}", message);
                    }
                    if let Some(EntryError::LockedOut(_)) = prompt.error() {
                        prompt.cancel(&self.gate).await;
                        bail!("PIN entry locked");
                    }
                }
            }
        }
    }

    /// Read one line; `None` on end of input or an empty line
    async fn read_secret(&mut self, label: &str) -> anyhow::Result<Option<Zeroizing<String>>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{}: ", label).as_bytes()).await?;
        stdout.flush().await?;

        let mut line = Zeroizing::new(String::new());
        let read = self
            .stdin
            .read_line(&mut line)
            .await
            .context("Failed to read from stdin")?;
        let trimmed = line.trim();
        if read == 0 || trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Zeroizing::new(trimmed.to_string())))
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
