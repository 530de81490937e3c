use std::io::BufRead;
use std::ops::Index;
use std::path::Path;

use anyhow::Context;

/// Class names, indexed by class id. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// One label per line, trailing whitespace stripped. Line order is class order.
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().map(|l| l.trim_end().to_string()).collect())
    }

    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut labels = vec![];
        for line in reader.lines() {
            labels.push(line?.trim_end().to_string());
        }
        Ok(Self::new(labels))
    }

    pub fn from_path<T: AsRef<Path>>(path: T) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("open label file {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(f))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Index<usize> for LabelTable {
    type Output = str;

    fn index(&self, idx: usize) -> &str {
        &self.labels[idx]
    }
}
