//! One migration-matrix run over an immutable tree and attribute table.

use log::info;

use crate::attributes::AttributeTable;
use crate::calendar::{Calendar, DEFAULT_YEAR_RANK};
use crate::error::{MigrationError, Result};
use crate::matrix::MigrationMatrix;
use crate::placement::{place_branch, LocationSet, Placement};
use crate::tree::Tree;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Position, counted from the end, of the sorted isolate giving the most current year.
    pub year_rank: usize,
    /// Explicit row space. Defaults to the sorted locations of the table.
    pub locations: Option<Vec<String>>,
    /// Attribute table delimiter.
    pub delimiter: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            year_rank: DEFAULT_YEAR_RANK,
            locations: None,
            delimiter: b',',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub branches: usize,
    pub empty_branches: usize,
    pub total: u64,
}

pub struct MigrationRun<'a> {
    tree: &'a Tree,
    table: &'a AttributeTable,
    locations: LocationSet,
    calendar: Calendar,
}

impl<'a> MigrationRun<'a> {
    /// Checks that every non-root node has an attribute row, then builds the
    /// location set and the calendar.
    pub fn new(tree: &'a Tree, table: &'a AttributeTable, settings: &Settings) -> Result<Self> {
        for node in tree.descendants() {
            if !tree.name(node).is_some_and(|name| table.contains(name)) {
                return Err(MigrationError::MissingAttribute(tree.label(node)));
            }
        }

        let locations = match &settings.locations {
            Some(labels) => LocationSet::from_labels(labels.clone())?,
            None => LocationSet::from_table(table),
        };
        info!("Tree height: {}", tree.height());

        let calendar = Calendar::from_isolates(tree.height(), table.isolates(), settings.year_rank)?;
        info!("Most current year: {}", calendar.most_current_year());
        info!("Year of the root: {}", calendar.root_year());

        Ok(MigrationRun { tree, table, locations, calendar })
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn locations(&self) -> &LocationSet {
        &self.locations
    }

    /// Placements of every branch, in preorder. Stops at the first failing node.
    pub fn placements(&self) -> Result<Vec<Placement>> {
        self.tree
            .descendants()
            .map(|node| place_branch(self.tree, node, self.table, &self.locations, &self.calendar))
            .collect()
    }

    pub fn execute(&self) -> Result<(MigrationMatrix, Summary)> {
        let placements = self.placements()?;
        let mut matrix = MigrationMatrix::new(&self.locations, self.calendar);
        matrix.accumulate(self.tree, &placements)?;
        let summary = Summary {
            branches: placements.len(),
            empty_branches: placements.iter().filter(|p| p.is_empty()).count(),
            total: matrix.total(),
        };
        info!(
            "Placed {} branches ({} with empty intervals) over {} location pairs and {} years, {} lineage-years",
            summary.branches,
            summary.empty_branches,
            matrix.n_rows(),
            matrix.n_cols(),
            summary.total
        );
        Ok((matrix, summary))
    }
}

/// Build the migration matrix for a parsed tree and table.
pub fn build_matrix(tree: &Tree, table: &AttributeTable, settings: &Settings) -> Result<MigrationMatrix> {
    let (matrix, _) = MigrationRun::new(tree, table, settings)?.execute()?;
    Ok(matrix)
}
