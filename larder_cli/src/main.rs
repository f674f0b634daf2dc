use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use larder::{object, Object, Store, Q};
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process;

mod person;

use person::Person;

/// Walk through the operations of a document store, one at a time, against a set of person
/// records.
#[derive(Parser)]
#[command(name = "larder", version, about)]
struct Cli {
    /// Path to the store file (falls back to the LARDER_DB environment variable)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a single person and save them
    Add {
        name: String,
        /// Age in years (people may decline to give one)
        #[arg(long)]
        age: Option<i64>,
        /// Favorite foods, in order of preference; repeatable
        #[arg(long = "food")]
        foods: Vec<String>,
    },

    /// Create a fixture set of people in one bulk insert
    Seed,

    /// Find every person with the given name
    FindName { name: String },

    /// Find one person by ID
    FindId { id: i64 },

    /// Find a person by ID, append a food to their list, and save them back
    AddFood { id: i64, food: String },

    /// Set the age of every person with the given name
    SetAge { name: String, age: i64 },

    /// Remove one person by ID
    RemoveId { id: i64 },

    /// Remove every person with the given name
    RemoveName { name: String },

    /// People who like the given food, sorted by name
    Search {
        food: String,
        /// Return at most this many people
        #[arg(long)]
        limit: Option<usize>,
        /// Leave ages out of the results
        #[arg(long)]
        hide_age: bool,
    },

    /// Count all people in the store
    Count,
}

fn main() {
    env_logger::init();

    if let Err(e) = main_impl() {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn main_impl() -> Result<()> {
    let cli = Cli::parse();

    let db_path = cli
        .db
        .or_else(|| env::var_os("LARDER_DB").map(PathBuf::from))
        .context("no store given; pass --db or set LARDER_DB")?;

    debug!("using store at {:?}", db_path);
    let store = Store::open(&db_path).with_context(|| format!("could not open {:?}", db_path))?;

    run(store, cli.command)
}

fn run(mut store: Store, command: Command) -> Result<()> {
    match command {
        Command::Add { name, age, foods } => {
            let mut person = Person::new(name, age, foods);
            store.save(&mut person)?;
            println!("saved {}", person);
        }

        Command::Seed => {
            let people = vec![
                Person::new(
                    "Mary".to_string(),
                    Some(34),
                    vec!["pizza".to_string(), "fries".to_string()],
                ),
                Person::new(
                    "John".to_string(),
                    Some(28),
                    vec!["burritos".to_string(), "tacos".to_string()],
                ),
                Person::new(
                    "Amy".to_string(),
                    Some(21),
                    vec!["burritos".to_string(), "sushi".to_string()],
                ),
                Person::new("Leah".to_string(), None, vec!["salad".to_string()]),
            ];

            let ids = store.add_many(people.into_iter().map(|p| p.into()).collect())?;
            println!("seeded {} people", ids.len());
        }

        Command::FindName { name } => {
            let people: Vec<Person> = store.query(Person::q().equal("name", name)).iter_as()?;

            if people.is_empty() {
                println!("no matches");
            }

            for person in people {
                println!("{}", person);
            }
        }

        Command::FindId { id } => match store.query(Q.id(id)).first_as::<Person>()? {
            Some(person) => println!("{}", person),
            None => println!("no person with ID {}", id),
        },

        Command::AddFood { id, food } => {
            let mut person: Person = store
                .query(Q.id(id))
                .first_as()?
                .ok_or_else(|| anyhow!("no person with ID {}", id))?;

            person.favorite_foods.push(food);
            store.save(&mut person)?;
            println!("saved {}", person);
        }

        Command::SetAge { name, age } => {
            let updated = store
                .query(Person::q().equal("name", name))
                .set(object!("age" => age))?;
            println!("updated {} people", updated);
        }

        Command::RemoveId { id } => {
            if store.query(Q.id(id)).delete()? == 0 {
                println!("no person with ID {}", id);
            } else {
                println!("removed person {}", id);
            }
        }

        Command::RemoveName { name } => {
            let removed = store.query(Person::q().equal("name", &name)).delete()?;
            println!("removed {} people named {}", removed, name);
        }

        Command::Search {
            food,
            limit,
            hide_age,
        } => {
            let mut collection = store
                .query(Person::q().contains("favoriteFoods", food))
                .sorted_by("name");

            if let Some(limit) = limit {
                collection = collection.limit(limit);
            }

            if hide_age {
                collection = collection.fields(&["kind", "name", "favoriteFoods"]);
            }

            for object in collection.iter()? {
                println!("{}", format_object(&object)?);
            }
        }

        Command::Count => {
            println!("{}", store.query(Person::q()).len()?);
        }
    }

    Ok(())
}

// Projected results may be missing fields a Person requires, so they print as raw JSON.
fn format_object(object: &Object) -> Result<String> {
    Ok(serde_json::to_string(object)?)
}
