use crate::classifier::{Rating, Trend};
use crate::tools::ToolOutput;
use chrono::Utc;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

fn rating_color(rating: Rating) -> Color {
    match rating {
        Rating::StrongUp => Color::Rgb { r: 0, g: 255, b: 0 },
        Rating::Up => Color::Rgb { r: 0, g: 160, b: 0 },
        Rating::Neutral => Color::DarkGrey,
        Rating::Down => Color::Rgb { r: 160, g: 0, b: 0 },
        Rating::StrongDown => Color::Rgb { r: 255, g: 0, b: 0 },
    }
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, suffix),
        None => "N/A".to_string(),
    }
}

pub fn render(output: &ToolOutput) -> String {
    let title = format!(
        "({} of {} candidates, {} skipped, taken at {} UTC)",
        output.results.len(),
        output.candidates,
        output.skipped.len(),
        Utc::now().format("%d-%m-%Y %H:%M:%S")
    );

    if output.results.is_empty() {
        return format!("{}\nNo assets qualified.", title);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Asset").add_attribute(Attribute::Bold),
            Cell::new("Price").add_attribute(Attribute::Bold).set_alignment(CellAlignment::Right),
            Cell::new("24h (%)").add_attribute(Attribute::Bold).set_alignment(CellAlignment::Right),
            Cell::new("ATR (%)").add_attribute(Attribute::Bold).set_alignment(CellAlignment::Right),
            Cell::new("Trend").add_attribute(Attribute::Bold),
            Cell::new("Rating").add_attribute(Attribute::Bold),
            Cell::new("MCap Rank").add_attribute(Attribute::Bold).set_alignment(CellAlignment::Right),
        ]);

    for (i, asset) in output.results.iter().enumerate() {
        let trend_color = match asset.trend {
            Trend::Up => Color::Green,
            Trend::Down => Color::Red,
            Trend::Undefined => Color::DarkGrey,
        };
        let rank = asset
            .provenance
            .as_ref()
            .and_then(|p| p.rank)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&asset.symbol).fg(Color::Cyan),
            Cell::new(fmt_opt(asset.price, "")).set_alignment(CellAlignment::Right),
            Cell::new(fmt_opt(asset.percent_change_24h, "%")).set_alignment(CellAlignment::Right),
            Cell::new(fmt_opt(asset.atr_percent, "%")).set_alignment(CellAlignment::Right),
            Cell::new(asset.trend.as_str()).fg(trend_color),
            Cell::new(asset.rating.as_str()).fg(rating_color(asset.rating)),
            Cell::new(rank).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("{}\n{}", title, table)
}
