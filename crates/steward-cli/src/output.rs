use serde::Serialize;

/// Print a success payload as JSON with `"ok": true` folded in.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_value(value)?;
    if let Some(obj) = json.as_object_mut() {
        obj.insert("ok".to_string(), serde_json::Value::Bool(true));
    } else {
        json = serde_json::json!({ "ok": true, "result": json });
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}
