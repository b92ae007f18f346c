use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tripplan_core::{
    load_tripplan_config, AddRecordOutcome, AiReallocation, AllocationMode, AuthOutcome,
    BudgetClient, BudgetRecord, DayTarget, DeleteOutcome, HttpTransport, ItineraryPayload,
    ItinerarySummary, PlanRequest, PlannerClient, PoiPayload, RegisterRequest, Resolution,
    RouteName, RouteTable, SaveOutcome, Transport, TripplanConfig, UserClient,
};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] tripplan_core::ConfigError),
    #[error("api error: {0}")]
    Api(#[from] tripplan_core::ApiError),
    #[error("route error: {0}")]
    Route(#[from] tripplan_core::RouteError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Travel planner command-line client", long_about = None)]
pub struct Cli {
    /// Path to tripplan.toml
    #[arg(long, default_value = "configs/tripplan.toml")]
    pub config: PathBuf,
    /// Backend base url (overrides backend.base_url; allows running without a config file)
    #[arg(long)]
    pub base_url: Option<String>,
    /// Bearer token sent with every request (overrides auth.token)
    #[arg(long)]
    pub token: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Log requests to stderr
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an itinerary from structured trip details
    Plan(PlanArgs),
    /// Generate an itinerary from a free-text request
    VoicePlan(VoicePlanArgs),
    /// Search points of interest
    Pois(PoisArgs),
    /// Transcribe an audio file
    Transcribe(TranscribeArgs),
    /// Saved itineraries
    #[command(subcommand)]
    Itinerary(ItineraryCommands),
    /// Account registration and login
    #[command(subcommand)]
    User(UserCommands),
    /// Expense records and daily budgets
    #[command(subcommand)]
    Budget(BudgetCommands),
    /// Resolve a client route to its view
    Route(RouteArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(long)]
    pub destination: String,
    /// First day of the trip (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: NaiveDate,
    #[arg(long)]
    pub days: u32,
    #[arg(long)]
    pub budget: f64,
    #[arg(long, default_value_t = 1)]
    pub people: u32,
    /// Preference tag; repeat for several
    #[arg(long = "preference")]
    pub preferences: Vec<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Use the planner endpoint that rejects incomplete requests
    #[arg(long, default_value_t = false)]
    pub validated: bool,
}

#[derive(Args, Debug)]
pub struct VoicePlanArgs {
    pub text: String,
}

#[derive(Args, Debug)]
pub struct PoisArgs {
    pub keywords: String,
    #[arg(long)]
    pub city: Option<String>,
}

#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Audio file, sent base64-encoded
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ItineraryCommands {
    /// Save an itinerary read from a JSON file
    Save {
        #[arg(long)]
        user: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// List a user's saved itineraries
    List {
        #[arg(long)]
        user: String,
    },
    /// Fetch a saved itinerary
    Get { id: String },
    /// Delete a saved itinerary
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Args, Debug)]
pub struct DayTargetArgs {
    /// 1-based day index
    #[arg(long)]
    pub day: Option<u32>,
    /// Calendar date of the day (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl DayTargetArgs {
    fn target(&self) -> Result<DayTarget> {
        if self.day.is_none() && self.date.is_none() {
            return Err(AppError::InvalidInput(
                "either --day or --date is required".to_string(),
            ));
        }
        Ok(DayTarget {
            day_index: self.day,
            date: self.date,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommands {
    /// Record an expense (negative amount) or income
    Add {
        #[arg(long)]
        category: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        itinerary: Option<String>,
    },
    Delete {
        id: String,
    },
    /// List records, optionally for one itinerary
    Records {
        #[arg(long)]
        itinerary: Option<String>,
    },
    Summary {
        #[arg(long)]
        itinerary: String,
    },
    Analyze {
        #[arg(long)]
        itinerary: Option<String>,
    },
    /// Redistribute the itinerary budget across its days
    Reallocate {
        #[arg(long)]
        itinerary: String,
        #[arg(long, default_value_t = AllocationMode::Equal)]
        mode: AllocationMode,
        #[arg(long)]
        new_total: Option<f64>,
        #[command(flatten)]
        ai: AiReallocationArgs,
    },
    DayUpdate {
        #[arg(long)]
        itinerary: String,
        #[command(flatten)]
        target: DayTargetArgs,
        #[arg(long)]
        new_budget: f64,
    },
    DayAdjust {
        #[arg(long)]
        itinerary: String,
        #[command(flatten)]
        target: DayTargetArgs,
        #[arg(long, allow_hyphen_values = true)]
        delta: f64,
    },
    DayReset {
        #[arg(long)]
        itinerary: String,
        #[command(flatten)]
        target: DayTargetArgs,
        #[arg(long, default_value_t = AllocationMode::Equal)]
        mode: AllocationMode,
    },
}

/// Client-held figures for `--mode ai`.
#[derive(Args, Debug)]
pub struct AiReallocationArgs {
    /// Total budget to spread instead of the stored one
    #[arg(long)]
    pub total_budget: Option<f64>,
    /// JSON file with an array of budget records
    #[arg(long)]
    pub records: Option<PathBuf>,
    /// Current budget of each day, in order; repeat per day
    #[arg(long = "day-budget")]
    pub day_budgets: Vec<f64>,
}

impl AiReallocationArgs {
    fn data(&self) -> Result<AiReallocation> {
        let records = match &self.records {
            Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
            None => None,
        };
        Ok(AiReallocation {
            total_budget: self.total_budget,
            records,
            day_budgets: (!self.day_budgets.is_empty()).then(|| self.day_budgets.clone()),
        })
    }
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    pub path: String,
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Route lookups need no backend, so they run without loading any config.
pub async fn run(cli: Cli) -> Result<()> {
    let output = match &cli.command {
        Commands::Route(args) => route(&RouteTable::standard(ViewInfo::for_route), &args.path)?,
        command => {
            let config = resolve_config(&cli)?;
            let transport = HttpTransport::from_config(&config)?;
            AppContext::new(Arc::new(transport)).execute(command).await?
        }
    };
    output.print(cli.format)
}

fn route(routes: &RouteTable<ViewInfo>, path: &str) -> Result<Output> {
    let (resolution, view) = routes.navigate(path)?;
    Output::of(&RouteReport {
        resolution,
        view: view.clone(),
    })
}

/// Loads the config file, falling back to `--base-url` alone when the file
/// is absent, then applies command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<TripplanConfig> {
    let mut config = match (&cli.base_url, cli.config.exists()) {
        (Some(base_url), false) => TripplanConfig::for_base_url(base_url.clone()),
        _ => load_tripplan_config(&cli.config)?,
    };
    if let Some(base_url) = &cli.base_url {
        config.backend.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.auth.token = Some(token.clone());
    }
    config.validate()?;
    debug!(base_url = %config.backend.base_url, "configuration resolved");
    Ok(config)
}

/// A command result in both output formats.
#[derive(Debug)]
pub struct Output {
    pub json: Value,
    pub text: String,
}

impl Output {
    fn of<T>(value: &T) -> Result<Self>
    where
        T: Serialize + DisplayFallback,
    {
        Ok(Self {
            json: serde_json::to_value(value)?,
            text: value.display(),
        })
    }

    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Text => {
                println!("{}", self.text);
                Ok(())
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&self.json)?;
                println!("{}", json);
                Ok(())
            }
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

pub struct AppContext {
    planner: PlannerClient,
    users: UserClient,
    budget: BudgetClient,
    routes: RouteTable<ViewInfo>,
}

impl AppContext {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            planner: PlannerClient::new(Arc::clone(&transport)),
            users: UserClient::new(Arc::clone(&transport)),
            budget: BudgetClient::new(transport),
            routes: RouteTable::standard(ViewInfo::for_route),
        }
    }

    pub async fn execute(&self, command: &Commands) -> Result<Output> {
        match command {
            Commands::Plan(args) => {
                let mut request = PlanRequest::new(
                    args.destination.clone(),
                    args.start_date,
                    args.days,
                    args.budget,
                    args.people,
                );
                request.preferences.extend(args.preferences.iter().cloned());
                request.notes = args.notes.clone();
                let payload = if args.validated {
                    self.planner.plan_validated(&request).await?
                } else {
                    self.planner.plan_itinerary(&request).await?
                };
                Output::of(&payload)
            }
            Commands::VoicePlan(args) => Output::of(&self.planner.voice_plan(&args.text).await?),
            Commands::Pois(args) => Output::of(
                &self
                    .planner
                    .search_pois(&args.keywords, args.city.as_deref())
                    .await?,
            ),
            Commands::Transcribe(args) => {
                let audio = fs::read(&args.file)?;
                let text = self.planner.transcribe_audio_bytes(&audio).await?;
                Output::of(&Transcript { text })
            }
            Commands::Itinerary(command) => self.itinerary(command).await,
            Commands::User(command) => self.user(command).await,
            Commands::Budget(command) => self.budget(command).await,
            Commands::Route(args) => route(&self.routes, &args.path),
        }
    }

    async fn itinerary(&self, command: &ItineraryCommands) -> Result<Output> {
        match command {
            ItineraryCommands::Save { user, file } => {
                let content = fs::read_to_string(file)?;
                let payload: ItineraryPayload = serde_json::from_str(&content)?;
                Output::of(&self.planner.save_itinerary(user, &payload).await?)
            }
            ItineraryCommands::List { user } => Output::of(&ItineraryList {
                rows: self.planner.list_itineraries(user).await?,
            }),
            ItineraryCommands::Get { id } => Output::of(&self.planner.get_itinerary(id).await?),
            ItineraryCommands::Delete { id } => {
                Output::of(&self.planner.delete_itinerary(id).await?)
            }
        }
    }

    async fn user(&self, command: &UserCommands) -> Result<Output> {
        match command {
            UserCommands::Register {
                username,
                password,
                email,
            } => {
                let request = RegisterRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                };
                Output::of(&self.users.register(&request).await?)
            }
            UserCommands::Login { username, password } => {
                Output::of(&self.users.login(username, password).await?)
            }
        }
    }

    async fn budget(&self, command: &BudgetCommands) -> Result<Output> {
        match command {
            BudgetCommands::Add {
                category,
                amount,
                description,
                date,
                itinerary,
            } => {
                let record = BudgetRecord {
                    id: None,
                    category: category.clone(),
                    amount: *amount,
                    description: description.clone(),
                    date: *date,
                    itinerary_id: itinerary.clone(),
                };
                Output::of(&self.budget.add_record(&record).await?)
            }
            BudgetCommands::Delete { id } => Output::of(&self.budget.delete_record(id).await?),
            BudgetCommands::Records { itinerary } => Output::of(&RecordList {
                rows: self.budget.list_records(itinerary.as_deref()).await?,
            }),
            BudgetCommands::Summary { itinerary } => {
                Output::of(&self.budget.summary(itinerary).await?)
            }
            BudgetCommands::Analyze { itinerary } => {
                Output::of(&self.budget.analyze(itinerary.as_deref()).await?)
            }
            BudgetCommands::Reallocate {
                itinerary,
                mode,
                new_total,
                ai,
            } => {
                let data = ai.data()?;
                if data.is_empty() {
                    Output::of(&self.budget.reallocate(itinerary, *mode, *new_total).await?)
                } else if *mode == AllocationMode::Ai {
                    Output::of(&self.budget.reallocate_with_data(itinerary, &data).await?)
                } else {
                    Err(AppError::InvalidInput(
                        "--total-budget, --records and --day-budget require --mode ai".to_string(),
                    ))
                }
            }
            BudgetCommands::DayUpdate {
                itinerary,
                target,
                new_budget,
            } => Output::of(
                &self
                    .budget
                    .update_day(itinerary, &target.target()?, *new_budget)
                    .await?,
            ),
            BudgetCommands::DayAdjust {
                itinerary,
                target,
                delta,
            } => Output::of(
                &self
                    .budget
                    .adjust_day(itinerary, &target.target()?, *delta)
                    .await?,
            ),
            BudgetCommands::DayReset {
                itinerary,
                target,
                mode,
            } => Output::of(
                &self
                    .budget
                    .reset_day(itinerary, &target.target()?, *mode)
                    .await?,
            ),
        }
    }
}

/// What the CLI knows about a routed view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewInfo {
    pub route: RouteName,
    pub component: &'static str,
}

impl ViewInfo {
    fn for_route(route: RouteName) -> Self {
        Self {
            route,
            component: route.component(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RouteReport {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub view: ViewInfo,
}

impl DisplayFallback for RouteReport {
    fn display(&self) -> String {
        let mut line = format!(
            "{} -> {} ({})",
            self.resolution.path, self.resolution.name, self.view.component
        );
        if let Some(from) = &self.resolution.redirected_from {
            line.push_str(&format!(" [redirected from {from}]"));
        }
        line
    }
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub text: String,
}

impl DisplayFallback for Transcript {
    fn display(&self) -> String {
        self.text.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct ItineraryList {
    pub rows: Vec<ItinerarySummary>,
}

impl DisplayFallback for ItineraryList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No saved itineraries".to_string();
        }
        let mut lines = Vec::new();
        for entry in &self.rows {
            let days = entry
                .days
                .map(|v| format!("{v}d"))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "{} | {} | {} | {} | {}",
                entry.id,
                entry.destination.as_deref().unwrap_or("<no destination>"),
                entry.start_date.as_deref().unwrap_or("-"),
                days,
                entry.summary.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub rows: Vec<BudgetRecord>,
}

impl DisplayFallback for RecordList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No budget records".to_string();
        }
        let mut lines = Vec::new();
        for record in &self.rows {
            lines.push(format!(
                "{} | {} | {:.2} | {} | {}",
                record.id.as_deref().unwrap_or("-"),
                record.category,
                record.amount,
                record
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                record.description.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for ItineraryPayload {
    fn display(&self) -> String {
        let Some(itinerary) = self.itinerary() else {
            return pretty(self.as_value());
        };
        let mut lines = vec![format!(
            "{} | start {} | {} days | budget {}",
            itinerary.destination.as_deref().unwrap_or("<no destination>"),
            itinerary.start_date.as_deref().unwrap_or("-"),
            itinerary
                .days
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            itinerary
                .budget
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        )];
        for day in &itinerary.schedule {
            let index = day
                .day_index
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            let budget = day
                .daily_budget
                .map(|v| format!(" ({v:.2})"))
                .unwrap_or_default();
            lines.push(format!(
                "Day {index}: {}{budget}",
                day.summary.as_deref().unwrap_or("")
            ));
            for place in &day.places {
                lines.push(format!(
                    "  - {} [{}] {}",
                    place.name.as_deref().unwrap_or("<unnamed>"),
                    place.kind.as_deref().unwrap_or("-"),
                    place.address.as_deref().unwrap_or("")
                ));
            }
        }
        lines.join("\n")
    }
}

impl DisplayFallback for PoiPayload {
    fn display(&self) -> String {
        let Some(search) = self.search() else {
            return pretty(self.as_value());
        };
        if search.pois.is_empty() {
            return "No POIs found".to_string();
        }
        search
            .pois
            .iter()
            .map(|poi| {
                format!(
                    "{} | {} | {} | {}",
                    poi.name.as_deref().unwrap_or("<unnamed>"),
                    poi.kind.as_deref().unwrap_or("-"),
                    poi.address.as_deref().unwrap_or("-"),
                    poi.location.as_deref().unwrap_or("-")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for SaveOutcome {
    fn display(&self) -> String {
        match (&self.id, &self.message) {
            (Some(id), _) => format!("[{}] saved as {id}", self.status),
            (None, Some(message)) => format!("[{}] {message}", self.status),
            (None, None) => format!("[{}]", self.status),
        }
    }
}

impl DisplayFallback for DeleteOutcome {
    fn display(&self) -> String {
        match &self.message {
            Some(message) => format!("[{}] {message}", self.status),
            None => format!("[{}]", self.status),
        }
    }
}

impl DisplayFallback for AuthOutcome {
    fn display(&self) -> String {
        match (&self.user_id, &self.message) {
            (Some(user_id), _) => format!("[{}] user {user_id}", self.status),
            (None, Some(message)) => format!("[{}] {message}", self.status),
            (None, None) => format!("[{}]", self.status),
        }
    }
}

impl DisplayFallback for AddRecordOutcome {
    fn display(&self) -> String {
        match self.record.as_ref().and_then(|record| record.id.as_deref()) {
            Some(id) => format!("[{}] record {id}", self.status),
            None => format!("[{}]", self.status),
        }
    }
}

impl DisplayFallback for Value {
    fn display(&self) -> String {
        pretty(self)
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
