use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobmatch_client::{
    ApiService, ClientConfig, NormalizedResult, Preferences, RecommendationRequest, UploadFile,
};

#[derive(Parser)]
#[command(name = "jobmatch", about = "Upload a resume and list matched job postings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a resume file and print the matched jobs
    Upload { file: PathBuf },
    /// Probe backend health
    Health,
    /// Request recommendations for already-analyzed resume data (JSON file)
    Recommend {
        file: PathBuf,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        job_type: Option<String>,
        #[arg(long)]
        salary_range: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // crate name with hyphens is not a valid tracing target
                EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME").replace('-', "_")))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("jobmatch client v{} -> {}", env!("CARGO_PKG_VERSION"), config.base_url);

    let cli = Cli::parse();
    let service = ApiService::new(&config).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    match cli.command {
        Command::Upload { file } => {
            let upload = UploadFile::from_path(&file)?;
            if let Err(err) = upload.validate() {
                anyhow::bail!(err.user_message());
            }
            match service.upload_resume(&upload).await {
                Ok(result) => print_result(&result),
                Err(err) => anyhow::bail!(err.user_message()),
            }
        }
        Command::Health => {
            let status = service.check_health().await;
            match status.error {
                Some(detail) => println!("status: {} ({detail})", status.status),
                None => println!("status: {}", status.status),
            }
        }
        Command::Recommend {
            file,
            location,
            job_type,
            salary_range,
        } => {
            let raw = std::fs::read_to_string(&file)?;
            let request = RecommendationRequest {
                resume_data: serde_json::from_str(&raw)?,
                preferences: Preferences {
                    location,
                    job_type,
                    salary_range,
                },
            };
            match service.get_job_recommendations(&request).await {
                Ok(result) => print_result(&result),
                Err(err) => anyhow::bail!(err.user_message()),
            }
        }
    }

    Ok(())
}

fn print_result(result: &NormalizedResult) {
    if let Some(summary) = &result.resume_summary {
        println!("Resume summary: {summary}\n");
    }
    if !result.resume_skills.is_empty() {
        println!("Detected skills: {}\n", result.resume_skills.join(", "));
    }
    if result.matches.is_empty() {
        println!("No matches found.");
        return;
    }
    if let Some(total) = result.total_jobs_analyzed {
        println!("{} matches ({} jobs analyzed)\n", result.matches.len(), total);
    } else {
        println!("{} matches\n", result.matches.len());
    }

    for job in &result.matches {
        println!(
            "[{:>3.0}%] {} — {} ({})",
            job.match_percentage, job.title, job.company, job.location
        );
        if !job.matching_skills.is_empty() {
            println!("       have: {}", job.matching_skills.join(", "));
        }
        if !job.missing_skills.is_empty() {
            println!("       missing: {}", job.missing_skills.join(", "));
        }
        if let Some(recommendation) = &job.recommendation {
            println!("       tip: {recommendation}");
        }
        if job.url != "#" {
            println!("       {}", job.url);
        }
        println!();
    }
}
