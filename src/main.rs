use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use daybook::commands;
use daybook::config::{CliArgs, Command, Config, GasAction, SettingAction, StructureAction};
use daybook::services::state::AppState;
use daybook::utils::today;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Create data dir {}", config.data_dir.display()))?;
    let state = AppState::open(&config.db_path()).await?;

    run(&state, cli.command).await
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::List => print_json(&commands::records::list_records(state).await?),
        Command::Show { date } => match commands::records::get_record(state, &date).await? {
            Some(record) => print_json(&record),
            None => {
                eprintln!("No record for {}", date);
                Ok(())
            }
        },
        Command::New { date } => {
            let date = date.unwrap_or_else(today);
            print_json(&commands::records::new_record(state, &date).await?)
        }
        Command::Save { file } => {
            let payload = read_json(&file)?;
            print_json(&commands::records::save_record(state, payload).await?)
        }
        Command::Delete { date } => {
            let removed = commands::records::delete_record(state, &date).await?;
            println!("{}", if removed { "deleted" } else { "not found" });
            Ok(())
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Read {}", file.display()))?;
            print_json(&commands::records::import_records(state, &raw).await?)
        }
        Command::ExportBackup { file } => {
            print_json(&commands::backup::export_backup(state, &file).await?)
        }
        Command::Restore {
            file,
            yes,
            allow_older,
        } => {
            let plan = commands::backup::plan_restore(state, &file).await?;
            eprintln!(
                "Backup: {} records, latest {} (sha256 {})",
                plan.backup().data.records.len(),
                plan.backup_latest.as_deref().unwrap_or("-"),
                plan.backup().digest,
            );
            eprintln!(
                "Local:  {} records, latest {}",
                plan.local_records,
                plan.local_latest.as_deref().unwrap_or("-"),
            );
            if plan.backup().legacy_format {
                eprintln!("Legacy backup: custom categories are not included and stay as they are.");
            }
            if plan.is_older() {
                eprintln!("Warning: this backup is older than the data on this device.");
            }
            if !yes {
                eprintln!("All local records will be replaced. Re-run with --yes to restore.");
                return Ok(());
            }

            match commands::backup::restore_backup(state, plan, allow_older).await {
                Ok(report) => print_json(&report),
                Err(err) => {
                    let critical = err
                        .downcast_ref::<daybook::error::RestoreError>()
                        .map(|e| e.is_critical())
                        .unwrap_or(false);
                    if critical {
                        eprintln!("CRITICAL: local data may be incomplete. Restore again from the same backup.");
                    }
                    Err(err)
                }
            }
        }
        Command::ExportCsv { file } => {
            let count = commands::backup::export_csv(state, &file).await?;
            println!("exported {} records to {}", count, file.display());
            Ok(())
        }
        Command::Summary { month, months } => {
            print_json(&commands::dashboard::get_monthly_summary(state, month, months).await?)
        }
        Command::Structure { action } => match action {
            StructureAction::Show => print_json(&commands::settings::get_structure(state).await?),
            StructureAction::Set { file } => {
                let payload = read_json(&file)?;
                print_json(&commands::settings::save_structure(state, payload).await?)
            }
        },
        Command::Setting { action } => match action {
            SettingAction::Get { key: Some(key) } => {
                print_json(&commands::settings::get_setting(state, &key).await?)
            }
            SettingAction::Get { key: None } => {
                let settings: serde_json::Map<String, serde_json::Value> =
                    commands::settings::get_all_settings(state)
                        .await?
                        .into_iter()
                        .collect();
                print_json(&settings)
            }
            SettingAction::Delete { key } => {
                let removed = commands::settings::delete_setting(state, &key).await?;
                println!("{}", if removed { "deleted" } else { "not found" });
                Ok(())
            }
            SettingAction::Set { key, value } => {
                commands::settings::save_setting(state, &key, &value).await?;
                print_json(&commands::settings::get_settings(state).await?)
            }
        },
        Command::Gas { action } => match action {
            GasAction::List => print_json(&commands::gas::get_gas_logs(state).await?),
            GasAction::Add { kind, count } => {
                print_json(&commands::gas::add_gas_log(state, kind.into(), count).await?)
            }
            GasAction::Delete { id } => {
                let removed = commands::gas::delete_gas_log(state, &id).await?;
                println!("{}", if removed { "deleted" } else { "not found" });
                Ok(())
            }
            GasAction::Stock => {
                println!("{}", commands::gas::get_gas_stock(state).await?);
                Ok(())
            }
        },
    }
}

fn read_json(path: &std::path::Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Parse {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
