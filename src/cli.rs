use anyhow::{anyhow, Context as _, Result};
use console::{pad_str, style, Alignment, StyledObject};
use std::collections::BTreeMap;
use std::path::Path;

use crate::args::{Args, Command, YearMonth};
use crate::db::{ChunkKey, Database, Entry, Group, GroupId, Iban, Money};
use crate::server;
use crate::terminal::BulletPointPrinter;

pub async fn main(args: Args) -> Result<()> {
    let db = match &args.command {
        Command::Init => {
            let name = args
                .name
                .as_deref()
                .ok_or_else(|| anyhow!("Creating a database requires --name"))?;
            Database::create(&args.db_dir, name).context("Failed to create database")?
        }
        _ => load_db(&args.db_dir, args.name.as_deref())?,
    };
    match args.command {
        Command::Init => main_init(&db),
        Command::Import { files } => main_import(&db, &files),
        Command::Info => main_info(&db),
        Command::ListEntries { iban, month } => main_list_entries(&db, iban, month),
        Command::AddGroup { members } => main_add_group(&db, members),
        Command::Serve { address, port } => server::serve(db, address, port).await,
    }
}

fn load_db(dir: &Path, name: Option<&str>) -> Result<Database> {
    match name {
        Some(name) => Database::open_or_create(dir, name).context("Failed to open database"),
        None => Database::open(dir).with_context(|| {
            anyhow!(
                "Failed to load database from {}. Use --name to create a new one.",
                dir.display()
            )
        }),
    }
}

fn main_init(db: &Database) -> Result<()> {
    println!(
        "Created database {} in {}",
        style_name(&db.name()),
        db.dir().display()
    );
    Ok(())
}

fn main_import(db: &Database, files: &[impl AsRef<Path>]) -> Result<()> {
    println!("{}", style_header("Importing:"));
    let printer = BulletPointPrinter::new_stdout();
    for file in files {
        let file = file.as_ref();
        let summary = db
            .import_csv(file)
            .with_context(|| anyhow!("Failed to import {}", file.display()))?;
        printer.print_item(format!(
            "{}: added {} of {} entries",
            style_file(file),
            style(summary.added).bold(),
            summary.total,
        ));
    }
    Ok(())
}

fn main_info(db: &Database) -> Result<()> {
    println!("{} {}", style_header("Database:"), style_name(&db.name()));
    println!();

    println!("{}", style_header("Groups:"));
    let printer = BulletPointPrinter::new_stdout();
    printer.print_items_or(db.groups().iter().map(format_group), style("(none)").italic());
    println!();

    println!("{}", style_header("Accounts:"));
    let mut accounts: BTreeMap<Iban, Vec<ChunkKey>> = BTreeMap::new();
    for key in db.list_chunks().context("Failed to list chunks")? {
        accounts.entry(key.iban.clone()).or_default().push(key);
    }
    if accounts.is_empty() {
        printer.print_item(style("(none)").italic());
    }
    for (iban, chunks) in accounts {
        printer.print_item(style_iban(&iban));
        printer.indent().print_items_or(
            chunks
                .iter()
                .map(|key| format!("{:04}-{:02}", key.year, key.month)),
            style("(none)").italic(),
        );
    }
    Ok(())
}

fn main_list_entries(db: &Database, iban: Iban, month: YearMonth) -> Result<()> {
    let key = ChunkKey {
        iban,
        year: month.year,
        month: month.month,
    };
    let entries = db
        .entries(&key)
        .with_context(|| anyhow!("Failed to load entries for {key}"))?;

    println!("{} {}", style_header("Entries:"), key);
    let groups = db.groups();
    let printer = BulletPointPrinter::new_stdout();
    printer.print_items_or(
        entries.iter().map(|entry| format_entry(entry, &groups)),
        style("(none)").italic(),
    );
    println!("{} {}", style_header("Sum:"), style_amount(total(&entries)?));
    Ok(())
}

fn total(entries: &[Entry]) -> Result<Money> {
    Money::checked_sum(entries.iter().map(|entry| entry.amount_cents))
        .ok_or_else(|| anyhow!("Sum of {} entries is too large", entries.len()))
}

/// Name of the group member an entry is assigned to, if it exists in any group
fn group_member_name<'a>(groups: &'a [Group], group_id: &GroupId) -> Option<&'a str> {
    groups
        .iter()
        .find_map(|group| group.member(group_id))
        .map(|member| member.name.as_str())
}

fn main_add_group(db: &Database, members: Vec<(String, String)>) -> Result<()> {
    let group = Group::from_iter(members);
    db.add_group(group.clone()).context("Failed to add group")?;
    println!("{} {}", style_header("Added group:"), format_group(&group));
    Ok(())
}

fn format_group(group: &Group) -> String {
    group
        .members()
        .map(|member| format!("{}={}", style(&member.id.0).cyan(), member.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_entry(entry: &Entry, groups: &[Group]) -> String {
    let counterparty = entry
        .other
        .as_ref()
        .map(|other| format!(" {} [{}]", other.name, other.iban))
        .unwrap_or_default();
    let group = entry
        .group_id
        .as_ref()
        .map(|group_id| match group_member_name(groups, group_id) {
            Some(name) => format!(" [{name}]"),
            None => format!(" [{}]", group_id.0),
        })
        .unwrap_or_default();
    format!(
        "{} {} {}{}{}",
        pad_str(&style_date(&entry.date).to_string(), 10, Alignment::Left, None),
        pad_str(
            &style_amount(entry.amount_cents).to_string(),
            15,
            Alignment::Right,
            None
        ),
        style_message(&format!("{}: {}", entry.entry_type, entry.message)),
        style_counterparty(&counterparty),
        style_group(&group),
    )
}

fn style_header(header: &str) -> StyledObject<&str> {
    style(header).bold().underlined()
}

fn style_name(name: &str) -> StyledObject<&str> {
    style(name).cyan().bold()
}

fn style_iban(iban: &Iban) -> StyledObject<&str> {
    style(iban.as_str()).magenta()
}

fn style_file(path: &Path) -> StyledObject<std::path::Display<'_>> {
    style(path.display()).magenta()
}

fn style_date(date: &chrono::NaiveDate) -> StyledObject<String> {
    style(date.format("%Y-%m-%d").to_string())
}

fn style_amount(amount: Money) -> StyledObject<String> {
    let result = style(amount.to_string()).bold();
    if amount.is_negative() {
        result.red()
    } else {
        result.green()
    }
}

fn style_message(message: &str) -> StyledObject<&str> {
    style(message).italic().blue()
}

fn style_counterparty(counterparty: &str) -> StyledObject<&str> {
    style(counterparty).yellow()
}

fn style_group(group: &str) -> StyledObject<&str> {
    style(group).magenta()
}
