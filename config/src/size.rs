//! Lexical parser for size configuration values: `<float><unit>` with
//! `KB|MB|GB|TB` (base-1000), or the literal `-1` meaning "no limit".

const KB: f64 = 1000.0;
const MB: f64 = 1000.0 * KB;
const GB: f64 = 1000.0 * MB;
const TB: f64 = 1000.0 * GB;

pub fn lexical_to_number(size: &str) -> Result<i64, String> {
    let size = size.trim();
    if size == "-1" {
        return Ok(-1);
    }
    if size.len() < 3 {
        return Err(format!("invalid size literal '{size}'"));
    }

    let (prefix, unit) = size.split_at(size.len() - 2);
    let multiplier = match unit {
        "KB" => KB,
        "MB" => MB,
        "GB" => GB,
        "TB" => TB,
        other => return Err(format!("unknown size unit '{other}'")),
    };

    let value: f64 = prefix
        .parse()
        .map_err(|_| format!("invalid numeric prefix '{prefix}' in size '{size}'"))?;
    if value < 0.0 {
        return Err(format!("size prefix must be non-negative, got '{prefix}'"));
    }

    Ok((value * multiplier) as i64)
}
