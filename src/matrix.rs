//! Location-pair by year lineage counts.

use std::io::Write;

use itertools::Itertools;
use log::debug;
use ndarray::Array2;
use rayon::prelude::*;

use crate::calendar::Calendar;
use crate::error::{MigrationError, Result};
use crate::placement::{LocationSet, Placement};
use crate::tree::Tree;

#[derive(Debug, Clone)]
pub struct MigrationMatrix {
    pairs: Vec<String>,
    calendar: Calendar,
    counts: Array2<u32>,
}

impl MigrationMatrix {
    /// All-zero matrix: one row per ordered location pair, one column per year.
    pub fn new(locations: &LocationSet, calendar: Calendar) -> Self {
        let pairs = locations.pair_labels();
        let counts = Array2::zeros((pairs.len(), calendar.len()));
        MigrationMatrix { pairs, calendar, counts }
    }

    /// Add one count per year covered by each placement.
    ///
    /// All placements are checked against the calendar before anything is
    /// counted, so a failure leaves the matrix untouched.
    pub fn accumulate(&mut self, tree: &Tree, placements: &[Placement]) -> Result<()> {
        for p in placements.iter().filter(|p| !p.is_empty()) {
            let outside = if !self.calendar.contains(p.start) {
                Some(p.start)
            } else if !self.calendar.contains(p.end) {
                Some(self.calendar.most_current_year() + 1)
            } else {
                None
            };
            if let Some(year) = outside {
                return Err(MigrationError::OutOfCalendarRange {
                    node: tree.label(p.node),
                    pair: p.pair.clone(),
                    year,
                    first: self.calendar.root_year(),
                    last: self.calendar.most_current_year(),
                });
            }
        }

        // per-thread partial matrices, summed at the end
        let shape = self.counts.dim();
        let root_year = self.calendar.root_year();
        let partial = placements
            .par_iter()
            .fold(
                || Array2::<u32>::zeros(shape),
                |mut acc, p| {
                    for year in p.years() {
                        acc[[p.row, (year - root_year) as usize]] += 1;
                    }
                    acc
                },
            )
            .reduce(|| Array2::<u32>::zeros(shape), |a, b| a + b);
        self.counts += &partial;
        debug!("Accumulated {} placements", placements.len());
        Ok(())
    }

    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn counts(&self) -> &Array2<u32> {
        &self.counts
    }

    pub fn n_rows(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.counts.ncols()
    }

    pub fn get(&self, pair: &str, year: i64) -> Option<u32> {
        let row = self.pairs.iter().position(|p| p == pair)?;
        let col = self.calendar.index_of(year)?;
        Some(self.counts[[row, col]])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Header `"",year_0,...,year_n`, then one row per pair, zero rows included.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(
            std::iter::once(String::new()).chain(self.calendar.years().map(|y| y.to_string())),
        )?;
        for (pair, row) in self.pairs.iter().zip(self.counts.rows()) {
            out.write_record(std::iter::once(pair.clone()).chain(row.iter().map(|c| c.to_string())))?;
        }
        out.flush()?;
        Ok(())
    }

    /// Tab-delimited, one row per year: `Year`, then one column per pair.
    pub fn write_transposed<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
        out.write_record(std::iter::once("Year").chain(self.pairs.iter().map(|p| p.as_str())))?;
        for (year, column) in self.calendar.years().zip(self.counts.columns()) {
            out.write_record(std::iter::once(year.to_string()).chain(column.iter().map(|c| c.to_string())))?;
        }
        out.flush()?;
        Ok(())
    }

    /// One line per pair with its yearly counts, for logging.
    pub fn describe(&self) -> String {
        self.pairs
            .iter()
            .zip(self.counts.rows())
            .map(|(pair, row)| format!("{}: {}", pair, row.iter().join(" ")))
            .join("\n")
    }
}
