use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rand::{Rng, seq::SliceRandom};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};
use url::Url;

use expense_tracker::{
    Amount, CategoryName, NewExpense, PasswordHash, PaymentMethod, User, create_expense,
    create_user, get_or_create_category, get_user_by_email, initialize_db,
};

const CATEGORY_NAMES: [&str; 5] = ["Food", "Travel", "Office", "Utilities", "Entertainment"];
const USER_COUNT: usize = 10;
const EXPENSE_COUNT: usize = 50;
const DESCRIPTIONS: [&str; 8] = [
    "Lunch with the team",
    "Taxi to the airport",
    "Printer paper",
    "Electricity bill",
    "Concert tickets",
    "Groceries",
    "Train fare",
    "Software subscription",
];

/// A utility for filling a database with sample users, categories and expenses.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database. It is created if it does not exist.
    #[arg(long)]
    db_path: String,
}

/// Create sample data for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let db_path = Path::new(&args.db_path);

    match db_path.extension() {
        None => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    println!("Opening database at {db_path:#?}");
    let conn = Connection::open(db_path)?;

    initialize_db(&conn)?;

    println!("Creating categories...");
    let categories = CATEGORY_NAMES
        .iter()
        .map(|name| get_or_create_category(CategoryName::new(name)?, &conn))
        .collect::<Result<Vec<_>, _>>()?;

    println!("Creating users...");
    let password_hash = PasswordHash::new("password", PasswordHash::DEFAULT_COST)?;
    let users = (1..=USER_COUNT)
        .map(|i| get_or_create_user(&format!("user{i}"), &password_hash, &conn))
        .collect::<Result<Vec<_>, _>>()?;

    println!("Creating expenses...");
    let mut rng = rand::thread_rng();
    let today = OffsetDateTime::now_utc().date();

    for _ in 0..EXPENSE_COUNT {
        let (Some(owner), Some(category), Some(description), Some(payment_method)) = (
            users.choose(&mut rng),
            categories.choose(&mut rng),
            DESCRIPTIONS.choose(&mut rng),
            PaymentMethod::ALL.choose(&mut rng),
        ) else {
            break;
        };

        let receipt_number: u32 = rng.gen_range(10_000..100_000);

        create_expense(
            NewExpense {
                owner: Some(owner.id),
                date: today - Duration::days(rng.gen_range(0..365)),
                category_id: category.id,
                description: description.to_string(),
                amount: Amount::from_cents(rng.gen_range(500..=50_000)),
                payment_method: *payment_method,
                receipt_link: Some(Url::parse(&format!(
                    "https://receipts.example.com/{receipt_number}"
                ))?),
            },
            &conn,
        )?;
    }

    println!(
        "Success! Log in as user1 to user{USER_COUNT} with the password \"password\"."
    );

    Ok(())
}

fn get_or_create_user(
    email: &str,
    password_hash: &PasswordHash,
    conn: &Connection,
) -> Result<User, expense_tracker::Error> {
    match get_user_by_email(email, conn) {
        Err(expense_tracker::Error::NotFound) => create_user(email, password_hash.clone(), conn),
        result => result,
    }
}
