use serde::Serialize;
use shelfsight_core::{value_as_string, QueryResult};

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

pub fn render_result(
    result: &QueryResult,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => render_json(result, pretty),
        OutputFormat::Table => {
            print!("{}", table(result));
            Ok(())
        }
    }
}

/// Render rows as left-aligned columns with a header and a row count footer.
fn table(result: &QueryResult) -> String {
    let cells = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(|column| row.get(column).and_then(value_as_string).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = result
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    let line = |values: &[String]| {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    output.push_str(&line(&result.columns));
    output.push('\n');
    for row in &cells {
        output.push_str(&line(row));
        output.push('\n');
    }
    output.push_str(&format!("({} rows)\n", result.row_count));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_pads_columns_to_widest_cell() {
        let result = QueryResult::from_arrays(
            vec![String::from("retailer"), String::from("spend")],
            vec![
                vec![json!("Acme"), json!(10.5)],
                vec![json!("Bigmart Online"), json!(null)],
            ],
        );

        assert_eq!(
            table(&result),
            "retailer        spend\nAcme            10.5\nBigmart Online\n(2 rows)\n"
        );
    }
}
