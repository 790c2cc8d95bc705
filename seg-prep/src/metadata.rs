//! Per-source-image metadata loaded from a raw dataset's `stats.csv`.

use crate::{common::*, error::PathContext as _};

pub const METADATA_LEN: usize = 7;

/// Columns kept from the raw metadata table, in output order.
///
/// GBML is not kept since it loses its meaning once an image is cropped.
pub const METADATA_COLUMNS: [&str; METADATA_LEN] = [
    "Image",
    "Genotype",
    "Genotype (#)",
    "Animal",
    "GBMW",
    "FPW",
    "SDD",
];

/// One projected row of the metadata table. Values are the verbatim cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    values: [String; METADATA_LEN],
}

impl MetadataRow {
    /// The source image file name.
    pub fn image(&self) -> &str {
        &self.values[0]
    }

    pub fn genotype(&self) -> &str {
        &self.values[1]
    }

    pub fn genotype_idx(&self) -> &str {
        &self.values[2]
    }

    pub fn animal(&self) -> &str {
        &self.values[3]
    }

    pub fn gbmw(&self) -> &str {
        &self.values[4]
    }

    pub fn fpw(&self) -> &str {
        &self.values[5]
    }

    pub fn sdd(&self) -> &str {
        &self.values[6]
    }

    /// All values in [METADATA_COLUMNS] order.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// The metadata table of one dataset, queried by source image file name.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<MetadataRow>,
    by_image: HashMap<String, usize>,
}

impl MetadataTable {
    /// Loads `path` and projects it to [METADATA_COLUMNS].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .at_path(path)?;

        // locate required columns
        let positions: Vec<usize> = {
            let headers = reader.headers().at_path(path)?;
            METADATA_COLUMNS
                .iter()
                .map(|&column| {
                    headers
                        .iter()
                        .position(|header| header == column)
                        .ok_or_else(|| Error::MissingColumn {
                            path: path.to_owned(),
                            column: column.to_owned(),
                        })
                })
                .collect::<Result<_>>()?
        };

        let mut table = Self::default();
        for record in reader.records() {
            let record = record.at_path(path)?;
            let mut values: [String; METADATA_LEN] = Default::default();
            for (value, &pos) in values.iter_mut().zip(&positions) {
                *value = record.get(pos).unwrap_or_default().to_owned();
            }
            table.push(MetadataRow { values });
        }

        Ok(table)
    }

    fn push(&mut self, row: MetadataRow) {
        let index = self.rows.len();
        // the first row wins on duplicated image names
        self.by_image.entry(row.image().to_owned()).or_insert(index);
        self.rows.push(row);
    }

    pub fn get(&self, image: &str) -> Option<&MetadataRow> {
        self.by_image.get(image).map(|&index| &self.rows[index])
    }

    pub fn contains(&self, image: &str) -> bool {
        self.by_image.contains_key(image)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
