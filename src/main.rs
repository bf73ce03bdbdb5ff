use anyhow::{bail, Result};
use env_logger::Env;

use sqlite_query_engine::database::Database;
use sqlite_query_engine::executor::{execute, QueryOutput};
use sqlite_query_engine::sql::parse_select;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Preserved startup quirk from the original prototype.
    eprintln!("Logs from your program will appear here!");

    let args = std::env::args().collect::<Vec<_>>();
    match args.len() {
        0 | 1 => bail!("Missing <database_file> and <command>"),
        2 => bail!("Missing <command>"),
        _ => {}
    }

    let database = Database::open(&args[1])?;
    let command = args[2].as_str();

    match command {
        ".dbinfo" => {
            println!("database page size: {}", database.page_size());
            println!("number of tables:  {}", database.schema_cell_count()?);
        }
        ".tables" => {
            let names = database
                .tables()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            println!("table names: {names}");
        }
        sql => {
            let query = parse_select(sql)?;
            match execute(&database, &query)? {
                QueryOutput::Count(n) => println!("{n}"),
                QueryOutput::Rows(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
            }
        }
    }

    Ok(())
}
