use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::errors::{RosetteError, Result};

/// A single cell of the traits table
#[derive(Debug, Clone, PartialEq)]
pub enum TraitValue {
    Text(String),
    Count(u64),
    Measure(f64),
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraitValue::Text(s) => write!(f, "{}", s),
            TraitValue::Count(n) => write!(f, "{}", n),
            TraitValue::Measure(v) if v.is_nan() => write!(f, "nan"),
            TraitValue::Measure(v) if v.is_infinite() => {
                write!(f, "{}", if *v > 0.0 { "inf" } else { "-inf" })
            }
            // Keep a decimal point on integral measures
            TraitValue::Measure(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            TraitValue::Measure(v) => write!(f, "{}", v),
        }
    }
}

/// Ordered trait names and values for one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitRecord {
    entries: Vec<(String, TraitValue)>,
}

impl TraitRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing entry of the same name in place
    pub fn insert<K: Into<String>>(&mut self, key: K, value: TraitValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&TraitValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Measure value by name; counts are widened to floats
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            TraitValue::Count(n) => Some(*n as f64),
            TraitValue::Measure(v) => Some(*v),
            TraitValue::Text(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn values(&self) -> Vec<String> {
        self.entries.iter().map(|(_, v)| v.to_string()).collect()
    }
}

/// Append a record to the traits table, writing the header into an empty file
pub fn append_traits_csv<P: AsRef<Path>>(path: P, record: &TraitRecord) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    if is_new {
        writer.write_record(record.keys())?;
    }
    writer.write_record(record.values())?;

    writer.flush().map_err(|e| RosetteError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_values() {
        assert_eq!(TraitValue::Count(12).to_string(), "12");
        assert_eq!(TraitValue::Measure(f64::NAN).to_string(), "nan");
        assert_eq!(TraitValue::Measure(f64::INFINITY).to_string(), "inf");
        assert_eq!(TraitValue::Measure(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(TraitValue::Measure(3.0).to_string(), "3.0");
        assert_eq!(TraitValue::Measure(0.25).to_string(), "0.25");
        assert_eq!(TraitValue::Text("plant".into()).to_string(), "plant");
    }

    #[test]
    fn insert_keeps_order_and_replaces() {
        let mut record = TraitRecord::new();
        record.insert("file", TraitValue::Text("a".into()));
        record.insert("area", TraitValue::Count(1));
        record.insert("file", TraitValue::Text("b".into()));

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["file", "area"]);
        assert_eq!(record.get("file"), Some(&TraitValue::Text("b".into())));
        assert_eq!(record.get_f64("area"), Some(1.0));
        assert_eq!(record.get_f64("file"), None);
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("traits.csv");

        let mut first = TraitRecord::new();
        first.insert("file", TraitValue::Text("a".into()));
        first.insert("ratio", TraitValue::Measure(0.5));
        let mut second = first.clone();
        second.insert("file", TraitValue::Text("b".into()));
        second.insert("ratio", TraitValue::Measure(f64::NAN));

        append_traits_csv(&path, &first).unwrap();
        append_traits_csv(&path, &second).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "file,ratio\na,0.5\nb,nan\n");
    }
}
