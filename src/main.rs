mod config;
mod db;
mod error;
mod models;
mod operations;
mod preferences;

use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, error};

use config::Config;
use db::{balance_repository, category_repository, connection};
use error::{FinanceError, Result};
use operations::add::add_transaction_to_db;
use operations::balance::{balance_summary, format_money, render_summary};
use operations::category::{add_category_db, delete_category_db, edit_category_db, list_category_labels};
use operations::edit::{edit_transaction_in_db, load_transaction};
use operations::history::run_history;
use operations::import::{ImportFormat, import_transactions_to_db};
use operations::remove::remove_transaction_from_db;
use operations::search::search_transactions_db;
use preferences::PreferenceStore;

pub enum UserCommands {
    Add,
    Edit,
    Remove,
    History,
    Search,
    Balance,
    Months,
    Categories,
    CategoryAdd,
    CategoryEdit,
    CategoryDelete,
    Import,
    Exit,
}

const COMMANDS: &str =
    "add, edit, remove, history, search, balance, months, categories, category-add, category-edit, category-delete, import, exit";

fn main() -> ExitCode {
    let config = Config::parse();
    config.init_logging();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let conn = connection::establish_connection(&config.database)?;
    category_repository::ensure_default_categories(&conn)?;
    let preferences = PreferenceStore::new(&config.preferences);
    debug!("Using preferences at {}", preferences.path().display());

    println!("Welcome to the expense tracker!");
    print_balance(&conn, today(), config.recent_months);

    loop {
        println!("Please enter a command ({}):", COMMANDS);

        let Some(input) = read_user_input()? else {
            break;
        };
        let Some(word) = input.split_whitespace().next() else {
            continue;
        };
        let Some(command) = check_for_command(word) else {
            println!("Unknown command '{}'.", word);
            continue;
        };

        match command {
            UserCommands::Add => {
                println!(
                    "Enter: type(gasto/ingreso), amount, category, date(YYYY-MM-DD), description\n\
                     Category, date and description may be left empty."
                );
                let Some(details) = read_user_input()? else {
                    break;
                };
                match add_transaction_to_db(&conn, &preferences, &details, today()) {
                    Ok(id) => println!("Transaction #{} added successfully!", id),
                    Err(e) => report_error("adding transaction", &e),
                }
            }
            UserCommands::Edit => {
                println!("Transaction ID to edit:");
                let Some(id_input) = read_user_input()? else {
                    break;
                };
                let current = match load_transaction(&conn, &id_input) {
                    Ok(tx) => tx,
                    Err(e) => {
                        report_error("loading transaction", &e);
                        continue;
                    }
                };
                println!("{}", current);
                println!("Enter: amount, category label (e.g. Comida (Gasto)), date, description\nLeave a field empty to keep it.");
                let Some(details) = read_user_input()? else {
                    break;
                };
                match edit_transaction_in_db(&conn, &id_input, &details) {
                    Ok(updated) => println!("Updated: {}", updated),
                    Err(e) => report_error("editing transaction", &e),
                }
            }
            UserCommands::Remove => {
                println!("Transaction ID to remove:");
                let Some(id_input) = read_user_input()? else {
                    break;
                };
                match remove_transaction_from_db(&conn, &id_input) {
                    Ok(true) => println!("Transaction removed successfully."),
                    Ok(false) => println!("No transaction with ID {}.", id_input.trim()),
                    Err(e) => report_error("removing transaction", &e),
                }
            }
            UserCommands::History => {
                if let Err(e) = run_history(&conn) {
                    report_error("browsing history", &e);
                }
            }
            UserCommands::Search => {
                println!("Filters as key=value separated by commas (category, month=YYYY-MM, kind). Empty shows all:");
                let Some(filter) = read_user_input()? else {
                    break;
                };
                match search_transactions_db(&conn, &filter) {
                    Ok(transactions) if transactions.is_empty() => println!("No transactions found."),
                    Ok(transactions) => {
                        for transaction in &transactions {
                            println!("{}", transaction);
                        }
                        let total: Decimal = transactions.iter().map(|t| t.amount).sum();
                        println!("{} transactions, total {}", transactions.len(), format_money(total));
                    }
                    Err(e) => report_error("searching transactions", &e),
                }
            }
            UserCommands::Balance => print_balance(&conn, today(), config.recent_months),
            UserCommands::Months => match balance_repository::months_with_transactions(&conn) {
                Ok(months) if months.is_empty() => println!("No transactions yet."),
                Ok(months) => {
                    for month in months {
                        match balance_repository::monthly_balance(&conn, month) {
                            Ok(balance) => {
                                println!("{}  {:<16} {:>16}", month, month.display_name(), format_money(balance))
                            }
                            Err(e) => report_error("computing monthly balance", &e),
                        }
                    }
                }
                Err(e) => report_error("listing months", &e),
            },
            UserCommands::Categories => {
                println!("Kind to list (gasto/ingreso, empty for both):");
                let Some(kind) = read_user_input()? else {
                    break;
                };
                match list_category_labels(&conn, &kind) {
                    Ok(labels) => labels.iter().for_each(|label| println!("  {}", label)),
                    Err(e) => report_error("listing categories", &e),
                }
            }
            UserCommands::CategoryAdd => {
                println!("Enter: name, kind(gasto/ingreso)");
                let Some(details) = read_user_input()? else {
                    break;
                };
                match add_category_db(&conn, &details) {
                    Ok(category) => println!("Category {} created.", category),
                    Err(e) => report_error("adding category", &e),
                }
            }
            UserCommands::CategoryEdit => {
                println!("Category to edit, as listed (e.g. Comida (Gasto)):");
                let Some(label) = read_user_input()? else {
                    break;
                };
                println!("Enter: new name, kind(gasto/ingreso)");
                let Some(details) = read_user_input()? else {
                    break;
                };
                match edit_category_db(&conn, &label, &details) {
                    Ok(category) => println!("Category is now {}.", category),
                    Err(e) => report_error("editing category", &e),
                }
            }
            UserCommands::CategoryDelete => {
                println!("Category to delete, as listed (e.g. Comida (Gasto)). Its transactions are deleted too:");
                let Some(label) = read_user_input()? else {
                    break;
                };
                println!("Type 'yes' to confirm:");
                let Some(confirmation) = read_user_input()? else {
                    break;
                };
                if !confirmation.eq_ignore_ascii_case("yes") {
                    println!("Cancelled.");
                    continue;
                }
                match delete_category_db(&conn, &label) {
                    Ok(category) => println!("Category {} deleted.", category),
                    Err(e) => report_error("deleting category", &e),
                }
            }
            UserCommands::Import => {
                println!("CSV file to import (date, description, amount, category label):");
                let Some(path) = read_user_input()? else {
                    break;
                };
                match import_transactions_to_db(&conn, ImportFormat::Csv, Path::new(&path)) {
                    Ok(count) => println!("Successfully imported {} transactions.", count),
                    Err(e) => report_error("importing transactions", &e),
                }
            }
            UserCommands::Exit => {
                println!("Exiting the application.");
                break;
            }
        }
    }

    connection::close_connection(conn)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn print_balance(conn: &Connection, today: NaiveDate, months: usize) {
    match balance_summary(conn, today, months) {
        Ok(summary) => render_summary(&summary).iter().for_each(|line| println!("{}", line)),
        Err(e) => report_error("computing balance", &e),
    }
}

fn report_error(action: &str, err: &FinanceError) {
    println!("Error {}: {}", action, err);
    if err.is_validation() || err.is_conflict() {
        println!("Please try again.");
    }
}

/// `None` once stdin is closed (Ctrl-D), which ends the session like `exit`.
fn read_user_input() -> Result<Option<String>> {
    read_line_from(&mut io::stdin().lock())
}

fn read_line_from(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut input = String::new();
    if reader.read_line(&mut input)? == 0 {
        debug!("Standard input closed");
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn check_for_command(input: &str) -> Option<UserCommands> {
    match input {
        "add" => Some(UserCommands::Add),
        "edit" => Some(UserCommands::Edit),
        "remove" => Some(UserCommands::Remove),
        "history" => Some(UserCommands::History),
        "search" => Some(UserCommands::Search),
        "balance" => Some(UserCommands::Balance),
        "months" => Some(UserCommands::Months),
        "categories" => Some(UserCommands::Categories),
        "category-add" => Some(UserCommands::CategoryAdd),
        "category-edit" => Some(UserCommands::CategoryEdit),
        "category-delete" => Some(UserCommands::CategoryDelete),
        "import" => Some(UserCommands::Import),
        "exit" | "quit" => Some(UserCommands::Exit),
        _ => None,
    }
}
