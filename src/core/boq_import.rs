//! Bill-of-quantities import from CSV
//!
//! Spreadsheet exports come with local column names and local number
//! formats, so both are matched leniently:
//!
//! - headers are compared case-insensitively against known variants
//!   (`pozicija`, `opis`, `jm`, `količina`, `jedinična cena`, ...);
//! - numbers accept either decimal separator and thousands grouping
//!   (`1.234,56`, `1,234.56`, `12,5`) and are rounded half-up to the
//!   quantity or price scale;
//! - total rows (`ukupno`, `total`, `sum`, `zbir`) and rows without a
//!   position code are skipped.
//!
//! The whole file is applied in one transaction.

use std::collections::HashSet;
use std::io::Read;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::error::{GkError, Result, ValidationError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::quantity::{Price, Quantity};
use crate::core::store::{self, Store};
use crate::entities::boq_item::{CODE_MAX, TITLE_MAX, UOM_MAX};
use crate::entities::{BoqItem, Project};

const CODE_HEADERS: &[&str] = &[
    "code", "pozicija", "poz.", "poz", "redni broj", "r.br", "r. br.", "rb", "item", "item no",
    "šifra", "sifra", "позиција",
];
const TITLE_HEADERS: &[&str] = &[
    "title", "description", "opis", "opis radova", "naziv", "naziv radova", "опис",
];
const UOM_HEADERS: &[&str] = &["uom", "unit", "jm", "j.m.", "jed. mera", "jedinica mere", "јм"];
const QUANTITY_HEADERS: &[&str] = &[
    "quantity", "qty", "količina", "kolicina", "kol.", "contracted_quantity", "количина",
];
const PRICE_HEADERS: &[&str] = &[
    "unit_price", "unit price", "price", "rate", "jedinična cena", "jedinicna cena", "jed. cena",
    "jc", "cena", "јединична цена",
];

const TOTAL_MARKERS: &[&str] = &["ukupno", "total", "sum", "zbir", "укупно"];

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// Column positions found in the header row
#[derive(Debug, Clone, PartialEq, Eq)]
struct Columns {
    code: usize,
    title: usize,
    uom: Option<usize>,
    quantity: Option<usize>,
    unit_price: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |variants: &[&str]| {
            headers
                .iter()
                .position(|h| variants.contains(&normalize_header(h).as_str()))
        };

        let code = find(CODE_HEADERS);
        let title = find(TITLE_HEADERS);
        match (code, title) {
            (Some(code), Some(title)) => Ok(Self {
                code,
                title,
                uom: find(UOM_HEADERS),
                quantity: find(QUANTITY_HEADERS),
                unit_price: find(PRICE_HEADERS),
            }),
            _ => Err(GkError::invalid(ValidationError::InvalidField {
                field: "header",
                message: "a code column (e.g. 'pozicija') and a description column (e.g. 'opis') are required"
                    .to_string(),
            })),
        }
    }
}

fn normalize_header(value: &str) -> String {
    value
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace('²', "2")
        .replace('³', "3")
}

/// Whether any cell of the row marks it as a subtotal/total line
fn is_total_row(record: &csv::StringRecord) -> bool {
    record.iter().any(|cell| {
        cell.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| TOTAL_MARKERS.contains(&word))
    })
}

/// Parse a number written with either decimal separator
///
/// When both `.` and `,` appear, the last one is the decimal separator
/// and the other groups thousands. A lone `,` is decimal. Several `.`
/// and no `,` means dot-grouped thousands. Surrounding text such as a
/// currency suffix is ignored.
pub fn parse_lenient(input: &str) -> Option<Decimal> {
    let text = input.replace(|c: char| c.is_whitespace() || c == '\'', "");
    let start = text.find(|c: char| c.is_ascii_digit() || c == '-')?;
    let token: String = text[start..]
        .chars()
        .enumerate()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || *c == ',' || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();

    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(d), Some(c)) if c > d => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(_)) => token.replace(',', "."),
        (Some(_), None) if token.matches('.').count() > 1 => token.replace('.', ""),
        _ => token,
    };
    Decimal::from_str(&normalized).ok()
}

fn cell<'r>(record: &'r csv::StringRecord, column: Option<usize>) -> &'r str {
    column.and_then(|c| record.get(c)).map(str::trim).unwrap_or("")
}

/// Pick `;` for semicolon-separated exports, `,` otherwise
fn sniff_delimiter(content: &str) -> u8 {
    let first = content.lines().next().unwrap_or("");
    if first.matches(';').count() > first.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Import (create or update) BoQ items of `project` from CSV
///
/// An existing item is updated only when a field changed and nothing
/// references it yet; a referenced item that would change is reported
/// as a warning and left alone. With `dry_run` the transaction is rolled
/// back and only the statistics are returned.
pub fn import_boq<R: Read>(
    db: &mut Store,
    project: &Project,
    mut reader: R,
    dry_run: bool,
) -> Result<ImportStats> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(csv::Error::from)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&content))
        .flexible(true)
        .from_reader(content.as_bytes());
    let columns = Columns::from_headers(csv_reader.headers()?)?;

    let tx = db.begin()?;
    let mut stats = ImportStats::default();
    let mut seen = HashSet::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = index + 2;

        if is_total_row(&record) {
            stats.skipped += 1;
            continue;
        }
        let code = cell(&record, Some(columns.code));
        if code.is_empty() {
            stats.skipped += 1;
            continue;
        }
        if !seen.insert(code.to_string()) {
            stats.skipped += 1;
            stats
                .warnings
                .push(format!("line {}: position {} repeats; kept the first", line, code));
            continue;
        }

        let Some(incoming) = read_item(&record, &columns, project, line, &mut stats.warnings)
        else {
            stats.skipped += 1;
            continue;
        };

        match store::boq_item_by_code(&tx, &project.id, code)? {
            None => {
                store::insert_boq_item(&tx, &incoming)?;
                stats.created += 1;
            }
            Some(existing) if !existing.differs_from(&incoming) => stats.unchanged += 1,
            Some(existing) => {
                let updated = BoqItem {
                    id: existing.id,
                    ..incoming
                };
                match store::update_boq_item(&tx, &updated) {
                    Ok(()) => stats.updated += 1,
                    Err(GkError::BoqItemLocked { entries, .. }) => {
                        stats.unchanged += 1;
                        stats.warnings.push(format!(
                            "line {}: position {} is used by {} sheet entries; not updated",
                            line, code, entries
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    if dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
        tracing::info!(
            project = %project.code,
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            "imported bill of quantities"
        );
    }
    Ok(stats)
}

/// Build the item for one data row, or `None` if the row is unusable
fn read_item(
    record: &csv::StringRecord,
    columns: &Columns,
    project: &Project,
    line: usize,
    warnings: &mut Vec<String>,
) -> Option<BoqItem> {
    let code = cell(record, Some(columns.code));
    let title = cell(record, Some(columns.title));
    let uom = cell(record, columns.uom);

    let limits = [
        ("code", code, CODE_MAX),
        ("description", title, TITLE_MAX),
        ("unit", uom, UOM_MAX),
    ];
    let too_long = limits
        .into_iter()
        .find(|(_, value, max)| value.chars().count() > *max);
    if let Some((field, _, max)) = too_long {
        warnings.push(format!(
            "line {}: position {} skipped: {} is longer than {} characters",
            line, code, field, max
        ));
        return None;
    }

    if title.is_empty() {
        warnings.push(format!("line {}: position {} has no description", line, code));
    }
    if uom.is_empty() {
        warnings.push(format!("line {}: position {} has no unit", line, code));
    }

    let raw_quantity = cell(record, columns.quantity);
    let quantity = match parse_lenient(raw_quantity) {
        Some(value) => Quantity::quantize(value),
        None => {
            warnings.push(format!("line {}: position {} has no quantity", line, code));
            Ok(Quantity::zero())
        }
    };
    let unit_price = match parse_lenient(cell(record, columns.unit_price)) {
        Some(value) => Price::quantize(value),
        None => Ok(Price::zero()),
    };

    match (quantity, unit_price) {
        (Ok(contracted_quantity), Ok(unit_price)) => Some(BoqItem {
            id: EntityId::new(EntityPrefix::Boq),
            project_id: project.id.clone(),
            code: code.to_string(),
            title: title.to_string(),
            uom: uom.to_string(),
            contracted_quantity,
            unit_price,
        }),
        (Err(e), _) | (_, Err(e)) => {
            warnings.push(format!("line {}: position {} skipped: {}", line, code, e));
            None
        }
    }
}
