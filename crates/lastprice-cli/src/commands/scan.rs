//! Scan command - turn a receipt image (or its text) into receipt data.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use lastprice_core::models::receipt::{format_amount, ReceiptData};
use lastprice_core::ocr::load_image;
use lastprice_core::{PureOcrEngine, ReceiptScanner};

use super::Context;
use crate::remote::HttpExtractor;

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Receipt image (PNG, JPEG, TIFF, BMP, WebP)
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Read already recognized receipt text from a file instead of an image
    #[arg(long, value_name = "FILE")]
    text: Option<PathBuf>,

    /// Extract items through the remote service instead of the local parser
    #[arg(long)]
    remote: bool,

    /// Remote extraction endpoint (overrides the config)
    #[arg(long, requires = "remote")]
    endpoint: Option<String>,

    /// Save the receipt to the local collection
    #[arg(long)]
    save: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Print parser warnings
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
    /// CSV output, one row per item
    Csv,
}

pub async fn run(args: ScanArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let scanner = ReceiptScanner::new().with_config(&ctx.config.extraction);

    let text = match (&args.text, &args.input) {
        (Some(path), _) => {
            pb.set_message("Reading text...");
            fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Failed to read {}: {}", path.display(), e)
            })?
        }
        (None, Some(path)) => recognize_image(path, &scanner, &args, ctx, &pb)?,
        (None, None) => anyhow::bail!("Provide a receipt image or --text <FILE>"),
    };

    let (receipt, warnings) = if args.remote {
        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| ctx.config.remote.endpoint.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No remote endpoint configured.\n\n\
                     Pass --endpoint <URL> or run 'lastprice config set remote.endpoint <URL>'."
                )
            })?;

        pb.set_message("Waiting for remote extraction...");
        let extractor = HttpExtractor::new(endpoint, ctx.config.remote.timeout_secs)?;
        let receipt = scanner.scan_text_remote(&text, &extractor).await?;
        (receipt, Vec::new())
    } else {
        pb.set_message("Extracting receipt data...");
        let result = scanner.scan_text(&text);
        debug!(
            "Parsed receipt in {}ms, {} lines discarded",
            result.processing_time_ms, result.discarded_lines
        );
        (result.receipt, result.warnings)
    };

    pb.finish_and_clear();

    if args.show_warnings {
        for warning in &warnings {
            eprintln!("{} {}", style("⚠").yellow(), warning);
        }
    }

    println!("{}", format_receipts(std::slice::from_ref(&receipt), args.format)?);

    if args.save {
        ctx.store().save(&receipt).await?;
        eprintln!("{} Saved receipt {}", style("✓").green(), receipt.id);
    }

    info!("Scan finished in {:?}", start.elapsed());

    Ok(())
}

fn recognize_image(
    path: &Path,
    scanner: &ReceiptScanner,
    args: &ScanArgs,
    ctx: &Context,
    pb: &ProgressBar,
) -> anyhow::Result<String> {
    pb.set_message("Loading image...");
    let image = load_image(path)?;

    pb.set_message("Loading OCR models...");
    let ocr_config = &ctx.config.ocr;
    let model_dir = args
        .model_dir
        .as_deref()
        .unwrap_or(ocr_config.model_dir.as_path());
    let engine = match &args.model_dir {
        Some(dir) => PureOcrEngine::from_dir(dir, ocr_config),
        None => PureOcrEngine::from_config(ocr_config),
    }
    .map_err(|e| {
        anyhow::anyhow!(
            "{}\n\nPlace {}, {} and {} in {} or pass --model-dir.",
            e,
            ocr_config.detection_model,
            ocr_config.recognition_model,
            ocr_config.dictionary,
            model_dir.display()
        )
    })?;

    pb.set_message("Running OCR...");
    let result = scanner.recognize(&engine, &image)?;

    Ok(result.text)
}

/// Render receipts in the requested format.
pub fn format_receipts(receipts: &[ReceiptData], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            if let [receipt] = receipts {
                Ok(serde_json::to_string_pretty(receipt)?)
            } else {
                Ok(serde_json::to_string_pretty(receipts)?)
            }
        }
        OutputFormat::Csv => format_csv(receipts),
        OutputFormat::Text => Ok(receipts
            .iter()
            .map(format_text)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn format_csv(receipts: &[ReceiptData]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "receipt_id",
        "store",
        "date",
        "total",
        "item_id",
        "item_name",
        "item_price",
    ])?;

    for receipt in receipts {
        let receipt_id = receipt.id.to_string();
        let total = receipt.total.map(format_amount).unwrap_or_default();

        if receipt.items.is_empty() {
            wtr.write_record([
                receipt_id.as_str(),
                receipt.store.as_str(),
                receipt.date.as_str(),
                total.as_str(),
                "",
                "",
                "",
            ])?;
        }

        for item in &receipt.items {
            let item_id = item.id.to_string();
            let price = format_amount(item.price);
            wtr.write_record([
                receipt_id.as_str(),
                receipt.store.as_str(),
                receipt.date.as_str(),
                total.as_str(),
                item_id.as_str(),
                item.name.as_str(),
                price.as_str(),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data.trim_end().to_string())
}

/// Plain text summary of one receipt.
pub fn format_text(receipt: &ReceiptData) -> String {
    let mut output = String::new();

    output.push_str(&format!("Receipt #{}\n", receipt.id));
    output.push_str(&format!("Store: {}\n", receipt.store));
    output.push_str(&format!("Date:  {}\n", receipt.date));
    output.push_str(&format!(
        "Saved: {}\n",
        receipt.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push('\n');

    if receipt.items.is_empty() {
        output.push_str("No items detected\n");
    } else {
        output.push_str("Items:\n");
        let width = receipt
            .items
            .iter()
            .map(|item| item.name.chars().count())
            .max()
            .unwrap_or(0);
        for item in &receipt.items {
            output.push_str(&format!(
                "  [{}] {:<width$}  {:>8}\n",
                item.id,
                item.name,
                format_amount(item.price),
                width = width
            ));
        }
    }
    output.push('\n');

    match receipt.total {
        Some(total) => output.push_str(&format!("Total: {}\n", format_amount(total))),
        None => output.push_str("Total: not detected\n"),
    }
    output.push_str(&format!(
        "Items sum: {}\n",
        format_amount(receipt.calculated_total())
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lastprice_core::models::receipt::ReceiptItem;
    use rust_decimal::Decimal;

    fn receipt() -> ReceiptData {
        ReceiptData {
            id: 7,
            store: "Store A".to_string(),
            date: "01/02/2024".to_string(),
            total: Some(Decimal::new(570, 2)),
            items: vec![
                ReceiptItem::new(1, "Milk", Decimal::new(350, 2)),
                ReceiptItem::new(2, "Bread", Decimal::new(22, 1)),
            ],
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_csv_one_row_per_item() {
        let csv = format_csv(&[receipt()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "7,Store A,01/02/2024,5.70,1,Milk,3.50");
        assert_eq!(lines[2], "7,Store A,01/02/2024,5.70,2,Bread,2.20");
    }

    #[test]
    fn test_csv_receipt_without_items() {
        let mut empty = receipt();
        empty.items.clear();
        empty.total = None;

        let csv = format_csv(&[empty]).unwrap();
        assert_eq!(csv.lines().nth(1), Some("7,Store A,01/02/2024,,,,"));
    }

    #[test]
    fn test_text_summary() {
        let text = format_text(&receipt());

        assert!(text.contains("Store: Store A"));
        assert!(text.contains("[2] Bread"));
        assert!(text.contains("Total: 5.70"));
        assert!(text.contains("Items sum: 5.70"));
    }

    #[test]
    fn test_json_single_receipt_is_an_object() {
        let json = format_receipts(&[receipt()], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.is_object());

        let json = format_receipts(&[], OutputFormat::Json).unwrap();
        assert_eq!(json, "[]");
    }
}
