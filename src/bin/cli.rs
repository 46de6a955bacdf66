#![cfg(not(tarpaulin_include))]

use sheetbook::config::{self, SheetConfig};
use sheetbook::gateway::{AppendOptions, AppendOutcome, DatasetSyncGateway};
use sheetbook::record::{DatasetSpec, Record};

use std::error::Error;
use std::io::{self, Write};

fn main() -> Result<(), Box<dyn Error>> {
    config::init_database(config::DEFAULT_DATABASE_DIR)?;
    let config = SheetConfig::load()?;

    let mut gateway = match DatasetSyncGateway::from_config(config) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Edit database/config.json or set SHEETBOOK_* environment variables.");
            return Ok(());
        }
    };

    let mut status = String::from("ok");
    loop {
        print!("({}) > ", status);
        io::stdout().flush().unwrap();

        let mut command = String::new();
        if io::stdin().read_line(&mut command).is_err() {
            break;
        }
        let command = command.trim();

        if command.is_empty() {
            status = String::from("invalid command");
            continue;
        }

        if command == "help" {
            println!("Commands:");
            println!("  q: Quit");
            println!("  append <dataset> <field=value>...: Append one record");
            println!("  list <dataset>: Print a dataset's records");
            println!("  mapping <dataset>: Print a dataset's column mapping");
            println!("  pending: Show queued appends");
            println!("  flush: Retry queued appends");
            continue;
        }

        if command == "q" {
            break;
        } else if command == "pending" {
            for item in gateway.pending() {
                println!(
                    "{}  {}  {} rows  queued {}",
                    item.id,
                    item.dataset,
                    item.rows.len(),
                    item.queued_at
                );
            }
            println!("{} pending", gateway.pending().len());
            status = String::from("ok");
        } else if command == "flush" {
            let outcome = gateway.flush_pending();
            println!(
                "flushed {}, {} remaining",
                outcome.flushed, outcome.remaining
            );
            status = String::from("ok");
        } else if let Some(rest) = command.strip_prefix("mapping ") {
            match DatasetSpec::builtin(rest.trim()) {
                Some(spec) => {
                    let mapping = gateway.mapping_for(&spec);
                    if mapping.is_empty() {
                        println!(
                            "(no mapping; fallback headers: {})",
                            spec.fallback_headers.join(", ")
                        );
                    } else {
                        for (name, position) in mapping.iter() {
                            match position {
                                Some(position) => println!("{}\t{}", name, position),
                                None => println!("{}\t(retired)", name),
                            }
                        }
                    }
                    status = String::from("ok");
                }
                None => status = String::from("unknown dataset"),
            }
        } else if let Some(rest) = command.strip_prefix("list ") {
            match DatasetSpec::builtin(rest.trim()) {
                Some(spec) => match gateway.load_records(&spec) {
                    Ok(records) => {
                        for record in &records {
                            let cells: Vec<String> = record
                                .fields()
                                .map(|(field, value)| format!("{}={}", field, value))
                                .collect();
                            println!("{}", cells.join("  "));
                        }
                        println!("{} records", records.len());
                        status = String::from("ok");
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        status = String::from("read failed");
                    }
                },
                None => status = String::from("unknown dataset"),
            }
        } else if let Some(rest) = command.strip_prefix("append ") {
            let mut parts = rest.split_whitespace();
            let dataset = parts.next().unwrap_or("");
            let spec = match DatasetSpec::builtin(dataset) {
                Some(spec) => spec,
                None => {
                    status = String::from("unknown dataset");
                    continue;
                }
            };

            let mut record = Record::new();
            for pair in parts {
                if let Some(equal_pos) = pair.find('=') {
                    record.set(&pair[..equal_pos], pair[equal_pos + 1..].to_string());
                }
            }
            if record.is_empty() {
                status = String::from("no fields given");
                continue;
            }

            match gateway.append_records(&spec, vec![record], &AppendOptions::default()) {
                Ok(AppendOutcome::Appended { rows_appended }) => {
                    println!("appended {} row(s)", rows_appended);
                    status = String::from("ok");
                }
                Ok(AppendOutcome::Enqueued { rows_enqueued }) => {
                    println!("saved {} row(s) locally, will retry", rows_enqueued);
                    status = String::from("enqueued");
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    status = String::from("append failed");
                }
            }
        } else {
            status = String::from("invalid command");
        }
    }

    Ok(())
}
