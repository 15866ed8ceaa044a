//! Replace the rider roster from a CSV file.
//!
//! Usage: cargo run --bin import_roster <roster.csv> <busbot.db>
//!
//! Each line of the roster is `first,last,phone`. Every status is reset to
//! UNSET and nobody is a counter afterwards; use PROMOTE to restore counters.

use std::path::Path;

use busbot::bot::roster::parse_roster;
use busbot::bot::{Database, Store};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <roster.csv> <busbot.db>", args[0]);
        eprintln!();
        eprintln!("Replace the roster in the database with the riders in the CSV file.");
        eprintln!("Lines are 'first,last,phone'. The whole file is checked before anything is written.");
        std::process::exit(1);
    }

    let roster_path = Path::new(&args[1]);
    let db_path = Path::new(&args[2]);

    let text = match std::fs::read_to_string(roster_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", roster_path.display());
            std::process::exit(1);
        }
    };

    let entries = match parse_roster(&text) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Roster rejected, database untouched: {e}");
            std::process::exit(1);
        }
    };

    let result = Database::open(db_path).and_then(|db| db.replace_roster(&entries));
    if let Err(e) = result {
        eprintln!("Import failed: {e}");
        std::process::exit(1);
    }

    println!("Imported {} riders into {}", entries.len(), db_path.display());
}
