use std::path::Path;

use anyhow::bail;
use rust_xlsxwriter::{Chart, ChartType as XlsxChartType, Format, FormatAlign, Workbook};

use super::aggregate::{AggregatedSeries, SeriesData};
use super::spec::ChartType;

const SHEET: &str = "Chart";

fn xlsx_chart_type(chart_type: ChartType) -> XlsxChartType {
    match chart_type {
        ChartType::Column => XlsxChartType::Column,
        ChartType::Pie => XlsxChartType::Pie,
        ChartType::Line => XlsxChartType::Line,
        ChartType::Scatter => XlsxChartType::Scatter,
    }
}

/// Writes the plotted values and a native Excel chart of them to `path`.
pub fn write_chart_workbook(series: &AggregatedSeries, path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET)?;

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center);

    let mut chart = Chart::new(xlsx_chart_type(series.chart_type));
    chart.title().set_name(&series.title);

    match &series.data {
        SeriesData::Categories(points) => {
            if points.is_empty() {
                bail!("nothing to plot for '{}'", series.title);
            }
            worksheet.write_string_with_format(0, 0, &series.x_label, &header_format)?;
            worksheet.write_string_with_format(0, 1, &series.y_label, &header_format)?;
            for (i, point) in points.iter().enumerate() {
                let row = (i + 1) as u32;
                worksheet.write_string(row, 0, point.x.to_string())?;
                worksheet.write_number(row, 1, point.y)?;
            }
            let last = points.len() as u32;
            chart
                .add_series()
                .set_name(&series.y_label)
                .set_categories((SHEET, 1, 0, last, 0))
                .set_values((SHEET, 1, 1, last, 1));
        }
        SeriesData::Scatter(groups) => {
            if groups.iter().all(|g| g.points.is_empty()) {
                bail!("nothing to plot for '{}'", series.title);
            }
            for (g, group) in groups.iter().enumerate() {
                let x_col = (g * 2) as u16;
                let y_col = x_col + 1;
                let name = group.name.clone().unwrap_or_else(|| series.y_label.clone());
                worksheet.write_string_with_format(0, x_col, &series.x_label, &header_format)?;
                worksheet.write_string_with_format(0, y_col, &name, &header_format)?;
                for (i, (x, y)) in group.points.iter().enumerate() {
                    let row = (i + 1) as u32;
                    worksheet.write_number(row, x_col, *x)?;
                    worksheet.write_number(row, y_col, *y)?;
                }
                if group.points.is_empty() {
                    continue;
                }
                let last = group.points.len() as u32;
                chart
                    .add_series()
                    .set_name(&name)
                    .set_categories((SHEET, 1, x_col, last, x_col))
                    .set_values((SHEET, 1, y_col, last, y_col));
            }
        }
    }

    worksheet.autofit();
    worksheet.insert_chart(1, 4, &chart)?;
    workbook.save(path)?;
    log::info!("wrote chart '{}' to {}", series.title, path.display());
    Ok(())
}
