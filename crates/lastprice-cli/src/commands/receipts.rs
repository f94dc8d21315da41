//! Receipts command - browse and manage the saved collection.

use std::io::{self, BufRead, Write};

use clap::{Args, Subcommand};
use console::style;

use lastprice_core::models::receipt::{format_amount, ReceiptData};
use lastprice_core::SequentialIds;

use super::scan::{format_receipts, format_text, OutputFormat};
use super::Context;

/// Arguments for the receipts command.
#[derive(Args)]
pub struct ReceiptsArgs {
    #[command(subcommand)]
    command: ReceiptsCommand,
}

#[derive(Subcommand)]
enum ReceiptsCommand {
    /// List saved receipts, newest first
    List {
        /// Output format (a short table when omitted)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show one saved receipt
    Show {
        /// Receipt id
        id: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Edit a saved receipt
    Edit(EditArgs),

    /// Delete one saved receipt
    Delete {
        /// Receipt id
        id: u64,
    },

    /// Delete all saved receipts
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct EditArgs {
    /// Receipt id
    id: u64,

    /// New store name
    #[arg(long)]
    store: Option<String>,

    /// New date
    #[arg(long)]
    date: Option<String>,

    /// Rename an item
    #[arg(long, num_args = 2, value_names = ["ITEM_ID", "NAME"])]
    rename: Vec<String>,

    /// Change an item price (unreadable prices become 0)
    #[arg(long, num_args = 2, value_names = ["ITEM_ID", "PRICE"])]
    price: Vec<String>,

    /// Append a "New Item" priced 0
    #[arg(long)]
    add_item: bool,

    /// Remove an item
    #[arg(long, value_name = "ITEM_ID")]
    remove: Vec<u64>,
}

pub async fn run(args: ReceiptsArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        ReceiptsCommand::List { format } => list(ctx, format).await,
        ReceiptsCommand::Show { id, format } => show(ctx, id, format).await,
        ReceiptsCommand::Edit(edit_args) => edit(ctx, edit_args).await,
        ReceiptsCommand::Delete { id } => delete(ctx, id).await,
        ReceiptsCommand::Clear { yes } => clear(ctx, yes).await,
    }
}

async fn list(ctx: &Context, format: Option<OutputFormat>) -> anyhow::Result<()> {
    let receipts = ctx.store().try_load_all().await?;

    if let Some(format) = format {
        println!("{}", format_receipts(&receipts, format)?);
        return Ok(());
    }

    if receipts.is_empty() {
        println!("No saved receipts");
        return Ok(());
    }

    println!(
        "{:<16} {:<24} {:<12} {:>6} {:>10}",
        style("ID").bold(),
        style("STORE").bold(),
        style("DATE").bold(),
        style("ITEMS").bold(),
        style("TOTAL").bold()
    );

    for receipt in &receipts {
        let total = receipt
            .total
            .map(format_amount)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<24} {:<12} {:>6} {:>10}",
            receipt.id,
            truncate(&receipt.store, 24),
            truncate(&receipt.date, 12),
            receipt.items.len(),
            total
        );
    }

    println!();
    println!("{} receipt(s)", receipts.len());

    Ok(())
}

async fn show(ctx: &Context, id: u64, format: OutputFormat) -> anyhow::Result<()> {
    let receipt = ctx
        .store()
        .find(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Receipt not found: {}", id))?;

    println!("{}", format_receipts(std::slice::from_ref(&receipt), format)?);

    Ok(())
}

async fn edit(ctx: &Context, args: EditArgs) -> anyhow::Result<()> {
    let store = ctx.store();
    let mut receipt = store
        .find(args.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Receipt not found: {}", args.id))?;

    if let Some(name) = args.store {
        receipt.set_store(name);
    }
    if let Some(date) = args.date {
        receipt.set_date(date);
    }

    for pair in args.rename.chunks(2) {
        let item_id = parse_item_id(&pair[0])?;
        if !receipt.rename_item(item_id, pair[1].as_str()) {
            eprintln!("{} No item {} to rename", style("⚠").yellow(), item_id);
        }
    }

    for pair in args.price.chunks(2) {
        let item_id = parse_item_id(&pair[0])?;
        if !receipt.reprice_item(item_id, &pair[1]) {
            eprintln!("{} No item {} to reprice", style("⚠").yellow(), item_id);
        }
    }

    for item_id in args.remove {
        if !receipt.remove_item(item_id) {
            eprintln!("{} No item {} to remove", style("⚠").yellow(), item_id);
        }
    }

    if args.add_item {
        add_blank_item(&mut receipt);
    }

    store.update(&receipt).await?;

    print!("{}", format_text(&receipt));
    println!();
    println!("{} Updated receipt {}", style("✓").green(), receipt.id);

    Ok(())
}

/// Append a blank item after the highest existing id.
///
/// Item ids only need to be unique within their receipt.
fn add_blank_item(receipt: &mut ReceiptData) -> u64 {
    let next = receipt
        .items
        .iter()
        .map(|item| item.id)
        .max()
        .map_or(1, |max| max.saturating_add(1));
    receipt.add_item(&SequentialIds::starting_at(next))
}

async fn delete(ctx: &Context, id: u64) -> anyhow::Result<()> {
    if ctx.store().delete_one(id).await? {
        println!("{} Deleted receipt {}", style("✓").green(), id);
    } else {
        println!("{} No receipt with id {}", style("ℹ").blue(), id);
    }

    Ok(())
}

async fn clear(ctx: &Context, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm("Delete all saved receipts?")? {
        println!("Aborted");
        return Ok(());
    }

    ctx.store().clear_all().await?;
    println!("{} Cleared all saved receipts", style("✓").green());

    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn parse_item_id(text: &str) -> anyhow::Result<u64> {
    text.parse()
        .map_err(|_| anyhow::anyhow!("Invalid item id: {}", text))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
