use chrono::{DateTime, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette as palette;

use crate::config::ChartConfig;
use crate::drawdown::DrawdownSeries;
use crate::refprice::PricePoint;
use crate::results::BalanceSeries;

/// One result file's traces: the balance curve and its derived drawdowns.
pub struct SeriesGroup {
    pub balances: BalanceSeries,
    pub drawdown: DrawdownSeries,
}

fn epoch(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

fn timestamp_range(groups: &[SeriesGroup]) -> (i64, i64) {
    let mut min_ts = i64::MAX;
    let mut max_ts = i64::MIN;
    for group in groups {
        for sample in &group.balances.samples {
            let ts = epoch(sample.timestamp);
            min_ts = min_ts.min(ts);
            max_ts = max_ts.max(ts);
        }
    }
    if min_ts == max_ts {
        // degenerate single-instant chart, widen so plotters accepts the range
        max_ts += 1;
    }
    (min_ts, max_ts)
}

fn balance_range(groups: &[SeriesGroup]) -> (f64, f64) {
    let mut min_bal = f64::MAX;
    let mut max_bal = f64::MIN;
    for group in groups {
        for sample in &group.balances.samples {
            min_bal = min_bal.min(sample.balance);
            max_bal = max_bal.max(sample.balance);
        }
        if let Some(capital) = group.balances.initial_capital {
            min_bal = min_bal.min(capital);
            max_bal = max_bal.max(capital);
        }
    }
    pad_range(min_bal, max_bal)
}

fn drawdown_range(groups: &[SeriesGroup]) -> (f64, f64) {
    let worst = groups
        .iter()
        .flat_map(|g| g.drawdown.running_worst.iter().copied())
        .fold(0.0_f64, f64::min);
    // headroom below the deepest drawdown, top pinned slightly above zero
    (worst * 1.1 - 0.01, 0.01)
}

fn price_range(points: &[PricePoint]) -> (f64, f64) {
    let (min_px, max_px) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.close), hi.max(p.close))
    });
    pad_range(min_px, max_px)
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    let span = (max - min).abs().max(1e-9);
    (min - 0.05 * span, max + 0.05 * span)
}

fn date_label(ts: &i64) -> String {
    match DateTime::from_timestamp(*ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => ts.to_string(),
    }
}

fn draw_balance_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    groups: &[SeriesGroup],
    reference: Option<(&str, &[PricePoint])>,
    x_range: (i64, i64),
) -> Result<(), Box<dyn std::error::Error>> {
    let (min_bal, max_bal) = balance_range(groups);
    let ref_points = reference.filter(|(_, points)| !points.is_empty());
    let (ref_lo, ref_hi) = ref_points
        .map(|(_, points)| price_range(points))
        .unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(if ref_points.is_some() { 60 } else { 0 })
        .caption("Balance", ("sans-serif", 15.0).into_font())
        .build_cartesian_2d(x_range.0..x_range.1, min_bal..max_bal)?
        .set_secondary_coord(x_range.0..x_range.1, ref_lo..ref_hi);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&date_label)
        .draw()?;

    for (idx, group) in groups.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                group
                    .balances
                    .samples
                    .iter()
                    .map(|s| (epoch(s.timestamp), s.balance)),
                color.stroke_width(2),
            ))?
            .label(group.balances.name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
    }

    if let Some(capital) = groups.iter().find_map(|g| g.balances.initial_capital) {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x_range.0, capital), (x_range.1, capital)],
                palette::GREY.stroke_width(2),
            )))?
            .label("initial capital")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], palette::GREY.stroke_width(2))
            });
    }

    if let Some((symbol, points)) = ref_points {
        chart.configure_secondary_axes().y_desc(symbol).draw()?;
        chart
            .draw_secondary_series(LineSeries::new(
                points.iter().map(|p| (epoch(p.timestamp), p.close)),
                BLACK.mix(0.5).stroke_width(1),
            ))?
            .label(symbol.to_string())
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], BLACK.mix(0.5).stroke_width(1))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_drawdown_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    groups: &[SeriesGroup],
    x_range: (i64, i64),
) -> Result<(), Box<dyn std::error::Error>> {
    let (min_dd, max_dd) = drawdown_range(groups);

    let mut chart = ChartBuilder::on(area)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .caption("Drawdown", ("sans-serif", 15.0).into_font())
        .build_cartesian_2d(x_range.0..x_range.1, min_dd..max_dd)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&date_label)
        .y_label_formatter(&|dd| format!("{:.1}%", dd * 100.0))
        .draw()?;

    for (idx, group) in groups.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let timestamps = group.balances.samples.iter().map(|s| epoch(s.timestamp));
        chart.draw_series(LineSeries::new(
            timestamps
                .clone()
                .zip(group.drawdown.drawdown.iter().copied()),
            color.stroke_width(1),
        ))?;
        // running worst as a fainter companion trace, same palette slot
        chart
            .draw_series(LineSeries::new(
                timestamps.zip(group.drawdown.running_worst.iter().copied()),
                color.mix(0.4).stroke_width(2),
            ))?
            .label(format!("{} worst", group.balances.name))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.mix(0.4).stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Renders the balance curves (top) and drawdown traces (bottom) to a PNG.
pub fn plot_chart(
    config: &ChartConfig,
    groups: &[SeriesGroup],
    reference: Option<(&str, &[PricePoint])>,
) -> Result<(), Box<dyn std::error::Error>> {
    if groups.is_empty() {
        return Err("nothing to plot".into());
    }

    let x_range = timestamp_range(groups);

    let root_area =
        BitMapBackend::new(&config.output_file, (config.width, config.height)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let title = config.title.as_deref().unwrap_or("Backtest results");
    let root_area = root_area.titled(title, ("sans-serif", 40))?;

    let (top, bottom) = root_area.split_vertically((config.height.saturating_sub(60)) * 6 / 10);

    draw_balance_panel(&top, groups, reference, x_range)?;
    draw_drawdown_panel(&bottom, groups, x_range)?;

    root_area.present()?;
    Ok(())
}
