//! Statistics report model
//!
//! A `StatisticsReport` is an ordered list of named sections, built once by
//! the aggregator and only read afterwards.

/// Minutes attributed to one group and their share of the table total
#[derive(Debug, Clone, PartialEq)]
pub struct CountRow {
    pub key: String,
    pub count: u64,
    pub percentage: f64,
}

/// A single mean value for one group
#[derive(Debug, Clone, PartialEq)]
pub struct MeanRow {
    pub key: String,
    pub value: f64,
}

/// Five-number style summary of a series (count, mean, std, quartiles)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalLine {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Totals {
        lines: Vec<TotalLine>,
    },
    Counts {
        title: String,
        key_header: String,
        rows: Vec<CountRow>,
    },
    Means {
        title: String,
        key_header: String,
        value_header: String,
        decimals: usize,
        rows: Vec<MeanRow>,
    },
    Distribution {
        title: String,
        value_header: String,
        summary: Option<Summary>,
    },
}

impl Section {
    pub fn title(&self) -> Option<&str> {
        match self {
            Section::Totals { .. } => None,
            Section::Counts { title, .. }
            | Section::Means { title, .. }
            | Section::Distribution { title, .. } => Some(title),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    sections: Vec<Section>,
}

impl StatisticsReport {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title() == Some(title))
    }
}
