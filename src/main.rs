use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use salariz::net::types::{
    CreditPack, MessageResponse, PageRequest, ProfileUpdate, RegisterRequest, ResetPasswordRequest, UploadPayslip,
};
use salariz::report::{self, AnalysisReport, PayslipRow, StatsSummary};
use salariz::util::french_error::get_french_error;
use salariz::{ApiClient, ApiError, ClientConfig, Session};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[derive(Parser, Debug)]
#[command(name = "salariz", about = "Payslip analysis client")]
struct Cli {
    #[arg(long, env = "SALARIZ_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SALARIZ_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the access token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "SALARIZ_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SALARIZ_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to `--password`.
        #[arg(long)]
        password_confirm: Option<String>,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    Profile(ProfileCommand),
    VerifyEmail {
        token: String,
    },
    ResendVerification {
        email: String,
    },
    Password(PasswordCommand),
    /// Show the remaining analysis credits.
    Credits,
    Billing(BillingCommand),
    Payslips(PayslipsCommand),
    Analysis(AnalysisCommand),
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Update {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Args, Debug)]
struct PasswordCommand {
    #[command(subcommand)]
    command: PasswordSubcommand,
}

#[derive(Subcommand, Debug)]
enum PasswordSubcommand {
    ResetRequest {
        email: String,
    },
    Reset {
        #[arg(long)]
        token: String,
        #[arg(long, env = "SALARIZ_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
        /// Defaults to `--new-password`.
        #[arg(long)]
        confirm_password: Option<String>,
    },
}

#[derive(Args, Debug)]
struct BillingCommand {
    #[command(subcommand)]
    command: BillingSubcommand,
}

#[derive(Subcommand, Debug)]
enum BillingSubcommand {
    Status,
    /// Open a checkout session and print its URL.
    Checkout {
        #[arg(long, default_value_t = CreditPack::Pack5)]
        pack: CreditPack,
    },
    FreeCredits,
    Simulate {
        #[arg(long, default_value_t = CreditPack::Pack5)]
        pack: CreditPack,
    },
    CheckPayment,
}

#[derive(Args, Debug)]
struct PayslipsCommand {
    #[command(subcommand)]
    command: PayslipsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PayslipsSubcommand {
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Stats,
    Conventions,
    Upload(UploadArgs),
    Delete {
        id: i64,
    },
    /// List payslips whose period contains the given text.
    Find {
        period: String,
    },
}

#[derive(Args, Debug)]
struct UploadArgs {
    file: PathBuf,
    #[arg(long)]
    convention: Option<String>,
    #[arg(long)]
    contractual_salary: Option<String>,
    #[arg(long)]
    details: Option<String>,
    #[arg(long)]
    period: Option<String>,
    /// Payment date, `YYYY-MM-DD`.
    #[arg(long)]
    date_paiement: Option<String>,
    #[arg(long)]
    employment_status: Option<String>,
    #[arg(long)]
    expected_smic_percent: Option<String>,
    #[arg(long)]
    working_time_ratio: Option<String>,
    /// Upload even if a payslip with the same period exists.
    #[arg(long, default_value_t = false)]
    force: bool,
    /// Run the analysis right after the upload.
    #[arg(long, default_value_t = false)]
    analyze: bool,
}

#[derive(Args, Debug)]
struct AnalysisCommand {
    #[command(subcommand)]
    command: AnalysisSubcommand,
}

#[derive(Subcommand, Debug)]
enum AnalysisSubcommand {
    Run {
        id: i64,
    },
    /// Raw analysis JSON.
    Results {
        id: i64,
    },
    Report {
        id: i64,
        /// Write a standalone HTML report to this path.
        #[arg(long)]
        html: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Api(error)) => {
            tracing::debug!(code = error.error_code(), error = %error, "command failed");
            let translated = get_french_error(&error);
            eprintln!("{}\n{}", translated.title, translated.description);
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Erreur\n{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = salariz::config::normalize_base_url(base_url)?;
    }
    if let Some(token_file) = cli.token_file {
        config.token_file = Some(token_file);
    }
    tracing::debug!(base_url = %config.base_url, token_file = ?config.token_file, "client configured");

    let client = Arc::new(ApiClient::from_config(&config)?);
    let session = Session::new(client.clone());

    match cli.command {
        Command::Login { username, password } => {
            let user = session.login(&username, &password).await?;
            println!("Connecté en tant que {}", user.username);
        }
        Command::Register { username, email, password, password_confirm } => {
            let password_confirm = password_confirm.unwrap_or_else(|| password.clone());
            let request = RegisterRequest { username, email, password, password_confirm };
            session.register(&request).await?;
            println!("Compte créé. Vérifiez votre email avant de vous connecter.");
        }
        Command::Logout => {
            session.logout().await?;
            println!("Déconnecté");
        }
        Command::Whoami => match session.bootstrap().await {
            Some(user) => print_json(&user)?,
            None => println!("Non connecté"),
        },
        Command::Profile(profile) => run_profile(&client, profile).await?,
        Command::VerifyEmail { token } => print_message(&client.verify_email(&token).await?),
        Command::ResendVerification { email } => print_message(&client.resend_verification(&email).await?),
        Command::Password(password) => run_password(&client, password).await?,
        Command::Credits => {
            let credits = client.my_credits().await?;
            println!("{} crédit(s)", credits.credits);
        }
        Command::Billing(billing) => run_billing(&client, billing).await?,
        Command::Payslips(payslips) => run_payslips(&client, payslips).await?,
        Command::Analysis(analysis) => run_analysis(&client, analysis).await?,
    }
    Ok(())
}

async fn run_profile(client: &ApiClient, profile: ProfileCommand) -> Result<(), CliError> {
    match profile.command {
        ProfileSubcommand::Update { first_name, last_name, email } => {
            let update = ProfileUpdate { first_name, last_name, email };
            if update.is_empty() {
                return Err(CliError::Usage("nothing to update; pass --first-name, --last-name or --email".into()));
            }
            print_json(&client.update_profile(&update).await?)
        }
    }
}

async fn run_password(client: &ApiClient, password: PasswordCommand) -> Result<(), CliError> {
    match password.command {
        PasswordSubcommand::ResetRequest { email } => {
            print_message(&client.request_password_reset(&email).await?);
        }
        PasswordSubcommand::Reset { token, new_password, confirm_password } => {
            let confirm_password = confirm_password.unwrap_or_else(|| new_password.clone());
            let request = ResetPasswordRequest { token, new_password, confirm_password };
            print_message(&client.reset_password(&request).await?);
        }
    }
    Ok(())
}

async fn run_billing(client: &ApiClient, billing: BillingCommand) -> Result<(), CliError> {
    match billing.command {
        BillingSubcommand::Status => {
            let status = client.billing_status().await?;
            println!("Crédits : {}", status.user_credits);
            println!("Stripe configuré : {}", yes_no(status.stripe_configured));
            println!("Webhook configuré : {}", yes_no(status.webhook_configured));
        }
        BillingSubcommand::Checkout { pack } => {
            let session = client.create_checkout_session(pack).await?;
            match session.checkout_url {
                Some(url) => println!("{url}"),
                None => return Err(CliError::Usage("checkout session has no URL".into())),
            }
        }
        BillingSubcommand::FreeCredits => {
            let grant = client.claim_free_credits().await?;
            print_grant(grant.message.as_deref(), grant.new_credits);
        }
        BillingSubcommand::Simulate { pack } => {
            let grant = client.simulate_payment(pack).await?;
            print_grant(grant.message.as_deref(), grant.new_credits);
        }
        BillingSubcommand::CheckPayment => {
            let check = client.check_payment_status().await?;
            println!("{} crédit(s) ajouté(s), total {}", check.credits_added, check.new_credit_total);
        }
    }
    Ok(())
}

async fn run_payslips(client: &ApiClient, payslips: PayslipsCommand) -> Result<(), CliError> {
    match payslips.command {
        PayslipsSubcommand::List { limit, offset, json } => {
            let page = client.list_payslips(PageRequest { limit, offset }).await?;
            if json {
                return print_json(&page.results);
            }
            println!("{} fiche(s) au total", page.count);
            for summary in &page.results {
                print_row(&PayslipRow::from_summary(summary));
            }
        }
        PayslipsSubcommand::Stats => {
            let stats = StatsSummary::from_stats(&client.payslip_stats().await?);
            println!("Analyses : {}", stats.total_analyses);
            println!("Score moyen : {}/10", stats.avg_score);
            println!("Conformité moyenne : {}/10", stats.avg_conformity_score);
            println!("Erreurs détectées : {}", stats.total_errors);
            println!("Dernière analyse : {}", stats.last_analysis.as_deref().unwrap_or(report::MISSING));
        }
        PayslipsSubcommand::Conventions => {
            for convention in client.conventions().await? {
                println!("{}\t{}", convention.value, convention.label);
            }
        }
        PayslipsSubcommand::Upload(args) => run_upload(client, args).await?,
        PayslipsSubcommand::Delete { id } => {
            client.delete_payslip(id).await?;
            println!("Fiche {id} supprimée");
        }
        PayslipsSubcommand::Find { period } => {
            for summary in client.find_payslips_by_period(&period).await? {
                print_row(&PayslipRow::from_summary(&summary));
            }
        }
    }
    Ok(())
}

async fn run_upload(client: &ApiClient, args: UploadArgs) -> Result<(), CliError> {
    if let Some(period) = args.period.as_deref().filter(|p| !p.trim().is_empty()) {
        let existing = client.find_payslips_by_period(period).await?;
        if !existing.is_empty() && !args.force {
            let ids: Vec<String> = existing.iter().map(|p| p.id.to_string()).collect();
            return Err(CliError::Usage(format!(
                "une fiche existe déjà pour la période « {period} » (id {}); relancez avec --force",
                ids.join(", ")
            )));
        }
    }

    let bytes = tokio::fs::read(&args.file)
        .await
        .map_err(|source| CliError::Io { path: args.file.clone(), source })?;
    let file_name = args
        .file
        .file_name()
        .map_or_else(|| "payslip.pdf".to_owned(), |name| name.to_string_lossy().into_owned());

    let created = client
        .upload_payslip(UploadPayslip {
            file_name,
            bytes,
            convention_collective: args.convention,
            contractual_salary: args.contractual_salary,
            additional_details: args.details,
            period: args.period,
            date_paiement: args.date_paiement,
            employment_status: args.employment_status,
            expected_smic_percent: args.expected_smic_percent,
            working_time_ratio: args.working_time_ratio,
        })
        .await?;
    println!("Fiche {} envoyée", created.id);

    if args.analyze {
        let outcome = client.analyze_payslip(created.id).await?;
        println!("{}", outcome.message.as_deref().unwrap_or("Analyse lancée"));
    }
    Ok(())
}

async fn run_analysis(client: &ApiClient, analysis: AnalysisCommand) -> Result<(), CliError> {
    match analysis.command {
        AnalysisSubcommand::Run { id } => {
            let outcome = client.analyze_payslip(id).await?;
            println!("{}", outcome.message.as_deref().unwrap_or("Analyse terminée"));
        }
        AnalysisSubcommand::Results { id } => print_json(&client.analysis_results(id).await?)?,
        AnalysisSubcommand::Report { id, html } => {
            let report = AnalysisReport::from_result(&client.analysis_results(id).await?);
            print_report(&report);
            if let Some(path) = html {
                tokio::fs::write(&path, report::html::render(&report))
                    .await
                    .map_err(|source| CliError::Io { path: path.clone(), source })?;
                println!("Rapport HTML écrit dans {}", path.display());
            }
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_message(response: &MessageResponse) {
    let text = response
        .message
        .as_deref()
        .or(response.error.as_deref())
        .unwrap_or("OK");
    println!("{text}");
}

fn print_grant(message: Option<&str>, new_credits: Option<i64>) {
    println!("{}", message.unwrap_or("Crédits ajoutés"));
    if let Some(total) = new_credits {
        println!("Nouveau solde : {total}");
    }
}

fn print_row(row: &PayslipRow) {
    println!(
        "#{:<5} {:<16} {:<10} {:>4}/10  {:<16} {}",
        row.id,
        row.period,
        row.date,
        row.score,
        row.badge(),
        row.file_name
    );
}

fn print_report(report: &AnalysisReport) {
    println!("Période : {}", report.period);
    println!("Date : {}", report.date);
    println!("Conformité légale : {}%", report.conformity_percent);
    println!("Note globale : {}/10", report.global_score);
    println!("Salaire brut : {}", report::euros(report.gross_salary));
    println!("Cotisations salariales : -{}", report::euros(report.employee_contributions));
    println!("Net à payer : {}", report::euros(report.net_salary));
    println!("Convention : {}", report.convention);
    println!();
    println!("{} anomalie(s)", report.anomaly_count());
    for anomaly in &report.anomalies {
        println!("[{}] {} : {}", anomaly.severity.label(), anomaly.kind, anomaly.description);
        if let Some(impact) = &anomaly.financial_impact {
            println!("    Impact financier : {impact}");
        }
        if let Some(fix) = &anomaly.fix {
            println!("    Recommandation : {fix}");
        }
    }
    if !report.recommendations.is_empty() {
        println!();
        println!("Recommandations :");
        for (index, recommendation) in report.recommendations.iter().enumerate() {
            println!("  {}. {recommendation}", index + 1);
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "oui" } else { "non" }
}
