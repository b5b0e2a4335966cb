use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use log::debug;

pub const MAX_SEPARATORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    OneD { len: usize },
    TwoD { rows: usize, cols: usize },
    ThreeD { depth: usize, rows: usize, cols: usize },
}

/// Values parsed out of a delimiter-structured text, stored contiguously in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedTable<T> {
    pub shape: Shape,
    pub values: Vec<T>,
}

impl<T> DelimitedTable<T> {
    pub fn num_axes(&self) -> usize {
        match self.shape {
            Shape::OneD { .. } => 1,
            Shape::TwoD { .. } => 2,
            Shape::ThreeD { .. } => 3,
        }
    }

    /// Returns `(values, rows, cols)` for a 2-D table, an error for anything else.
    pub fn into_2d(self) -> Result<(Vec<T>, usize, usize)> {
        match self.shape {
            Shape::TwoD { rows, cols } => Ok((self.values, rows, cols)),
            shape => Err(anyhow!(
                "Expected 2-dimensional data, found {:?}",
                shape
            )),
        }
    }
}

/// Number of axes described by `separators` (listed innermost first) in `text`: one more than
/// the position of the outermost separator that occurs.
pub fn detect_num_axes(text: &str, separators: &[char]) -> usize {
    separators
        .iter()
        .rposition(|sep| text.contains(*sep))
        .map_or(1, |pos| pos + 1)
}

/// Parse `text` into a table. `separators` holds up to three characters, innermost first, e.g.
/// ",\n" for comma separated columns and newline separated rows.
pub fn read_delimited<T>(text: &str, separators: &str) -> Result<DelimitedTable<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let separators = separators.chars().collect::<Vec<char>>();
    if separators.is_empty() || separators.len() > MAX_SEPARATORS {
        return Err(anyhow!(
            "Expected 1 to {} separators, got {}",
            MAX_SEPARATORS,
            separators.len()
        ));
    }
    if text.trim().is_empty() {
        return Err(anyhow!("Empty buffer cannot be parsed"));
    }

    let num_axes = detect_num_axes(text, &separators);
    debug!(
        "max-dimensions = {}, num dimensions detected = {}",
        separators.len(),
        num_axes
    );

    match num_axes {
        1 => {
            let values = parse_values(text, &separators)?;
            Ok(DelimitedTable {
                shape: Shape::OneD { len: values.len() },
                values,
            })
        }
        2 => {
            let (values, rows, cols) = parse_rows(text, separators[1], separators[0])?;
            Ok(DelimitedTable {
                shape: Shape::TwoD { rows, cols },
                values,
            })
        }
        3 => {
            let mut values = Vec::new();
            let mut shape: Option<(usize, usize)> = None;
            let mut depth = 0;
            for block in split_non_empty(text, separators[2]) {
                let (block_values, rows, cols) =
                    parse_rows(block, separators[1], separators[0])?;
                match shape {
                    None => shape = Some((rows, cols)),
                    Some(expected) if expected != (rows, cols) => {
                        return Err(anyhow!(
                            "Block {} has shape {:?}, expected {:?}",
                            depth,
                            (rows, cols),
                            expected
                        ));
                    }
                    Some(_) => {}
                }
                values.extend(block_values);
                depth += 1;
            }
            let (rows, cols) = shape.ok_or_else(|| anyhow!("No data blocks found"))?;
            Ok(DelimitedTable {
                shape: Shape::ThreeD { depth, rows, cols },
                values,
            })
        }
        _ => Err(anyhow!("Can only parse 1/2/3 Dimensional data")),
    }
}

pub fn read_delimited_file<T>(path: impl AsRef<Path>, separators: &str) -> Result<DelimitedTable<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("File {} cannot be opened: {}", path.display(), e))?;
    read_delimited(&text, separators)
}

fn split_non_empty(text: &str, separator: char) -> impl Iterator<Item = &str> {
    text.split(separator).filter(|part| !part.trim().is_empty())
}

fn parse_value<T>(token: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let token = token.trim();
    token
        .parse::<T>()
        .map_err(|e| anyhow!("Cannot parse value [{}]: {}", token, e))
}

fn parse_values<T>(text: &str, separators: &[char]) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    text.split(|c: char| separators.contains(&c))
        .filter(|token| !token.trim().is_empty())
        .map(|token| parse_value::<T>(token))
        .collect()
}

fn parse_rows<T>(text: &str, row_separator: char, col_separator: char) -> Result<(Vec<T>, usize, usize)>
where
    T: FromStr,
    T::Err: Display,
{
    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols: Option<usize> = None;
    for row in split_non_empty(text, row_separator) {
        let before = values.len();
        for token in split_non_empty(row, col_separator) {
            values.push(parse_value(token)?);
        }
        let row_cols = values.len() - before;
        match cols {
            None => cols = Some(row_cols),
            Some(expected) if expected != row_cols => {
                return Err(anyhow!(
                    "Row {} has {} columns, expected {}",
                    rows,
                    row_cols,
                    expected
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }
    Ok((values, rows, cols.unwrap_or(0)))
}
