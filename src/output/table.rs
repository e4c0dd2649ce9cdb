use comfy_table::{Cell, Color};

use ratecard::engine::{ModelListing, ProviderSummary};
use ratecard::registry::{ModelPricingEntry, Rate};
use ratecard::{BatchOutcome, BatchResult, Dimension, EstimateResult, Warning};

use crate::output::format::{
    create_styled_table, format_cost, format_number, format_rate, header_cell, right_cell,
    styled_cell, tint,
};

fn print_warnings(warnings: &[Warning], use_color: bool) {
    for w in warnings {
        if use_color {
            println!("  \x1b[33mwarning:\x1b[0m {}", w.message);
        } else {
            println!("  warning: {}", w.message);
        }
    }
}

pub(crate) fn print_estimate_table(result: &EstimateResult, use_color: bool) {
    let c = use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Dimension", c),
        header_cell("Quantity", c),
        header_cell("Rate", c),
        header_cell("Cost", c),
    ]);

    for line in &result.lines {
        table.add_row(vec![
            Cell::new(line.dimension.as_str()),
            right_cell(&format_number(line.quantity), None, false),
            right_cell(&format_rate(&line.rate), None, false),
            right_cell(&line.cost.to_string(), None, false),
        ]);
    }
    table.add_row(vec![
        styled_cell("TOTAL", tint(Color::Yellow, c), true),
        Cell::new(""),
        Cell::new(""),
        right_cell(
            &format_cost(result.total, &result.currency),
            tint(Color::Yellow, c),
            true,
        ),
    ]);

    println!(
        "\n  {}/{} (pricing {})\n",
        result.provider, result.model, result.pricing_version
    );
    println!("{table}");
    print_warnings(&result.warnings, c);
    println!();
}

pub(crate) fn print_batch_table(batch: &BatchResult, use_color: bool) {
    let c = use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("#", c),
        header_cell("Provider/Model", c),
        header_cell("Total", c),
        header_cell("Status", c),
    ]);

    for outcome in &batch.outcomes {
        match outcome {
            BatchOutcome::Success { index, result } => {
                let status = if result.warnings.is_empty() {
                    "ok".to_string()
                } else {
                    format!("ok ({} warnings)", result.warnings.len())
                };
                table.add_row(vec![
                    right_cell(&index.to_string(), None, false),
                    Cell::new(format!("{}/{}", result.provider, result.model)),
                    right_cell(&format_cost(result.total, &result.currency), None, false),
                    styled_cell(&status, tint(Color::Green, c), false),
                ]);
            }
            BatchOutcome::Failure { index, error } => {
                table.add_row(vec![
                    right_cell(&index.to_string(), None, false),
                    Cell::new(""),
                    Cell::new(""),
                    styled_cell(
                        &format!("{}: {error}", error.kind()),
                        tint(Color::Red, c),
                        false,
                    ),
                ]);
            }
        }
    }

    println!("\n  Batch (pricing {})\n", batch.pricing_version);
    println!("{table}");
    println!(
        "\n  {} succeeded, {} failed\n",
        batch.succeeded(),
        batch.failed()
    );
}

pub(crate) fn print_providers_table(
    pricing_version: &str,
    providers: &[ProviderSummary],
    use_color: bool,
) {
    let c = use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Provider", c),
        header_cell("Aliases", c),
        header_cell("Models", c),
        header_cell("Capabilities", c),
    ]);
    for p in providers {
        table.add_row(vec![
            styled_cell(&p.provider, tint(Color::Green, c), false),
            Cell::new(p.aliases.join(", ")),
            right_cell(&p.model_count.to_string(), None, false),
            Cell::new(p.capabilities.join(", ")),
        ]);
    }
    println!("\n  Providers (pricing {pricing_version})\n");
    println!("{table}\n");
}

fn rates_text(rates: impl IntoIterator<Item = (Dimension, Rate)>) -> String {
    rates
        .into_iter()
        .map(|(d, r)| format!("{d}: {}", format_rate(&r)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn print_models_table(pricing_version: &str, listing: &ModelListing, use_color: bool) {
    let c = use_color;
    let with_rates = listing.models.iter().any(|m| m.ratecard.is_some());
    let mut table = create_styled_table();
    let mut header = vec![
        header_cell("Model", c),
        header_cell("Aliases", c),
        header_cell("Effective", c),
        header_cell("Capabilities", c),
    ];
    if with_rates {
        header.push(header_cell("Rates", c));
    }
    table.set_header(header);

    for m in &listing.models {
        let mut row = vec![
            styled_cell(&m.model, tint(Color::Green, c), false),
            Cell::new(m.aliases.join(", ")),
            Cell::new(m.effective_from.to_string()),
            Cell::new(m.capabilities.join(", ")),
        ];
        if let Some(card) = &m.ratecard {
            row.push(Cell::new(rates_text(card.rates.iter().map(|(d, r)| (*d, *r)))));
        }
        table.add_row(row);
    }
    println!(
        "\n  {} models (pricing {pricing_version})\n",
        listing.provider
    );
    println!("{table}\n");
}

pub(crate) fn print_model_table(
    pricing_version: &str,
    provider: &str,
    entry: &ModelPricingEntry,
    use_color: bool,
) {
    let c = use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Dimension", c),
        header_cell("Rate", c),
        header_cell("Tier", c),
    ]);
    for (dimension, rate) in &entry.rates {
        table.add_row(vec![
            Cell::new(dimension.as_str()),
            right_cell(&format_rate(rate), None, false),
            Cell::new("base"),
        ]);
    }
    for tier in entry.tiers() {
        let label = format!(
            "{} > {}",
            tier.condition.dimension.as_str(),
            format_number(tier.condition.gt)
        );
        for (dimension, rate) in &tier.rates {
            table.add_row(vec![
                Cell::new(dimension.as_str()),
                right_cell(&format_rate(rate), None, false),
                styled_cell(&label, tint(Color::Yellow, c), false),
            ]);
        }
    }

    println!(
        "\n  {provider}/{} (pricing {pricing_version}, effective {})",
        entry.model, entry.effective_from
    );
    if !entry.aliases.is_empty() {
        println!("  aliases: {}", entry.aliases.join(", "));
    }
    if !entry.capabilities.is_empty() {
        let caps: Vec<&str> = entry.capabilities.iter().map(String::as_str).collect();
        println!("  capabilities: {}", caps.join(", "));
    }
    println!("\n{table}\n");
}
