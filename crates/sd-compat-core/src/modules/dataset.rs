use crate::domain::CompatError;
use std::collections::HashMap;

pub const TIME_SERIES: &str = "time";

/// Delimited text layouts the harness reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `data.csv` shipped with each model.
    Reference,
    /// Tab-separated table the simulator prints on stdout.
    Simulated,
}

impl DatasetFormat {
    pub const fn delimiter(self) -> char {
        match self {
            Self::Reference => ',',
            Self::Simulated => '\t',
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Simulated => "simulated",
        }
    }
}

/// Named series of raw values sharing one time axis.
///
/// Values are kept as the exact text that was read so the decimal precision
/// of each value survives until comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    names: Vec<String>,
    values: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("no header line found in {format} data")]
    MissingHeader { format: &'static str },
    #[error("series '{name}' appears more than once in the {format} header")]
    DuplicateSeries { format: &'static str, name: String },
}

impl From<LoadError> for CompatError {
    fn from(error: LoadError) -> Self {
        CompatError::input_validation("INPUT.DATASET", error.to_string())
    }
}

impl Dataset {
    /// Lowercases `text` and parses it with the delimiter of `format`.
    pub fn from_output(text: &str, format: DatasetFormat) -> Result<Self, LoadError> {
        Self::parse(&text.to_lowercase(), format.delimiter()).map_err(|error| match error {
            LoadError::MissingHeader { .. } => LoadError::MissingHeader {
                format: format.label(),
            },
            LoadError::DuplicateSeries { name, .. } => LoadError::DuplicateSeries {
                format: format.label(),
                name,
            },
        })
    }

    /// Parses delimited text: the first non-empty line names the series and
    /// every later non-empty line contributes one value per series.
    ///
    /// Short rows leave the trailing series short and fields beyond the
    /// header width are dropped; length disagreements are for the comparison
    /// to report.
    pub fn parse(text: &str, delimiter: char) -> Result<Self, LoadError> {
        let mut lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty());

        let header = lines.next().ok_or(LoadError::MissingHeader { format: "delimited" })?;
        let names = split_record(header, delimiter);

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(LoadError::DuplicateSeries {
                    format: "delimited",
                    name: name.clone(),
                });
            }
        }

        let mut values = vec![Vec::new(); names.len()];
        for line in lines {
            for (column, field) in values.iter_mut().zip(split_record(line, delimiter)) {
                column.push(field);
            }
        }

        Ok(Self {
            names,
            values,
            index,
        })
    }

    /// Series names in header order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn series(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|position| self.values[*position].as_slice())
    }

    pub fn time(&self) -> Option<&[String]> {
        self.series(TIME_SERIES)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Writes the dataset back out as a delimited table. Rows stop at the
    /// longest series; shorter series leave their cells empty.
    pub fn to_delimited(&self, delimiter: char) -> String {
        let separator = delimiter.to_string();
        let rows = self.values.iter().map(Vec::len).max().unwrap_or(0);

        let mut lines = Vec::with_capacity(rows + 1);
        lines.push(
            self.names
                .iter()
                .map(|name| quote_field(name, delimiter))
                .collect::<Vec<_>>()
                .join(&separator),
        );
        for row in 0..rows {
            lines.push(
                self.values
                    .iter()
                    .map(|column| {
                        column
                            .get(row)
                            .map(|value| quote_field(value, delimiter))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(&separator),
            );
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// Maps a reference series name onto the identifier the simulator prints:
/// each run of whitespace becomes a single underscore.
pub fn canonical_series_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for character in name.chars() {
        if character.is_whitespace() {
            if !in_whitespace {
                canonical.push('_');
            }
            in_whitespace = true;
        } else {
            canonical.push(character);
            in_whitespace = false;
        }
    }
    canonical
}

fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut characters = line.chars().peekable();

    while let Some(character) = characters.next() {
        if quoted {
            if character == '"' {
                if characters.peek() == Some(&'"') {
                    field.push('"');
                    characters.next();
                } else {
                    quoted = false;
                }
            } else {
                field.push(character);
            }
        } else if character == '"' && field.is_empty() {
            quoted = true;
        } else if character == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(character);
        }
    }
    fields.push(field);
    fields
}

fn quote_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Dataset, DatasetFormat, LoadError, canonical_series_name, split_record};

    #[test]
    fn parse_keeps_header_order_and_raw_text() {
        let dataset = Dataset::parse("time,stock,flow\n0,1.50,2\n1,1.5000,3\n", ',')
            .expect("dataset should parse");

        assert_eq!(dataset.names(), ["time", "stock", "flow"]);
        assert_eq!(
            dataset.series("stock"),
            Some(&["1.50".to_string(), "1.5000".to_string()][..])
        );
        assert_eq!(dataset.time().map(<[String]>::len), Some(2));
        assert_eq!(dataset.series("missing"), None);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn blank_lines_and_carriage_returns_are_ignored() {
        let dataset = Dataset::parse("time\tx\r\n0\t1\r\n\n1\t2\r\n", '\t')
            .expect("dataset should parse");
        assert_eq!(
            dataset.series("x"),
            Some(&["1".to_string(), "2".to_string()][..])
        );
    }

    #[test]
    fn short_rows_leave_trailing_series_short() {
        let dataset = Dataset::parse("time,a,b\n0,1,2\n1,3\n2,4,5,6\n", ',')
            .expect("uneven rows should still load");
        assert_eq!(dataset.series("a").map(<[String]>::len), Some(3));
        assert_eq!(dataset.series("b").map(<[String]>::len), Some(2));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert_eq!(
            Dataset::from_output("\n\n", DatasetFormat::Reference),
            Err(LoadError::MissingHeader {
                format: "reference"
            })
        );
    }

    #[test]
    fn duplicate_series_are_rejected() {
        let error = Dataset::from_output("time\tx\tX\n0\t1\t2\n", DatasetFormat::Simulated)
            .expect_err("duplicate names should fail after lowercasing");
        assert_eq!(
            error,
            LoadError::DuplicateSeries {
                format: "simulated",
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn from_output_lowercases_names_and_values() {
        let dataset = Dataset::from_output("Time,Stock Level\n0,NaN\n", DatasetFormat::Reference)
            .expect("dataset should parse");
        assert_eq!(dataset.names(), ["time", "stock level"]);
        assert_eq!(
            dataset.series("stock level"),
            Some(&["nan".to_string()][..])
        );
    }

    #[test]
    fn quoted_fields_may_contain_delimiters() {
        assert_eq!(
            split_record(r#""a,b",c,"say ""hi""""#, ','),
            vec!["a,b".to_string(), "c".to_string(), "say \"hi\"".to_string()]
        );
        assert_eq!(split_record("", ','), vec![String::new()]);
    }

    #[test]
    fn to_delimited_round_trips() {
        let text = "time,\"flow, net\",stock\n0,1.0,10\n1,1.25,11.0\n";
        let dataset = Dataset::parse(text, ',').expect("dataset should parse");
        assert_eq!(dataset.to_delimited(','), text);
        assert_eq!(
            Dataset::parse(&dataset.to_delimited('\t'), '\t'),
            Ok(dataset)
        );
    }

    #[test]
    fn canonical_names_collapse_whitespace_runs() {
        assert_eq!(canonical_series_name("Stock Level"), "Stock_Level");
        assert_eq!(canonical_series_name("a   b"), "a_b");
        assert_eq!(canonical_series_name("a \t\n b c"), "a_b_c");
        assert_eq!(canonical_series_name(" lead"), "_lead");
        assert_eq!(canonical_series_name("flow_rate"), "flow_rate");

        let once = canonical_series_name("birth  rate");
        assert_eq!(canonical_series_name(&once), once);
    }
}
