//! The tile mapping table (`stats.csv` of a tiled dataset) and tile writer.

use crate::{
    common::*, error::PathContext as _, metadata::MetadataRow, output::DatasetDir,
    tiler::TilePair,
};

pub const INDEX_COLUMN: &str = "idx";
pub const HEADER_WITH_METADATA: [&str; 8] = [
    "idx",
    "image",
    "genotype",
    "genotype_idx",
    "animal",
    "GBMW",
    "FPW",
    "SDD",
];
pub const HEADER_WITHOUT_METADATA: [&str; 2] = ["idx", "image"];

/// File extension of written tiles.
pub const TILE_EXTENSION: &str = "png";

/// Where a tile came from.
#[derive(Debug, Clone, Copy)]
pub enum Provenance<'a> {
    Metadata(&'a MetadataRow),
    FileName(&'a str),
}

impl Provenance<'_> {
    fn fields(&self) -> Vec<&str> {
        match self {
            Self::Metadata(row) => row.values().iter().map(String::as_str).collect(),
            Self::FileName(name) => vec![*name],
        }
    }
}

/// Writes tiles of one dataset and appends their rows to the mapping table.
///
/// The writer owns the running tile counter of its dataset.
pub struct MappingWriter {
    dir: DatasetDir,
    with_metadata: bool,
    writer: csv::Writer<File>,
    count: usize,
}

impl MappingWriter {
    /// Creates (or truncates) the mapping table and writes its header.
    pub fn create(dir: DatasetDir, with_metadata: bool) -> Result<Self> {
        let path = dir.stats();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .at_path(&path)?;

        if with_metadata {
            writer.write_record(HEADER_WITH_METADATA).at_path(&path)?;
        } else {
            writer.write_record(HEADER_WITHOUT_METADATA).at_path(&path)?;
        }
        writer.flush().at_path(&path)?;

        Ok(Self {
            dir,
            with_metadata,
            writer,
            count: 0,
        })
    }

    /// Saves both tiles under the next index and records the provenance.
    ///
    /// Returns the index assigned to the tile.
    pub fn write_tile(&mut self, tile: &TilePair, provenance: Provenance<'_>) -> Result<usize> {
        debug_assert_eq!(
            self.with_metadata,
            matches!(provenance, Provenance::Metadata(_))
        );

        let index = self.count + 1;
        let file_name = format!("{}.{}", index, TILE_EXTENSION);

        let input_path = self.dir.inputs().join(&file_name);
        tile.input
            .save_with_format(&input_path, ImageFormat::Png)
            .at_path(&input_path)?;
        let label_path = self.dir.labels().join(&file_name);
        tile.label
            .save_with_format(&label_path, ImageFormat::Png)
            .at_path(&label_path)?;

        let stats_path = self.dir.stats();
        let index_text = index.to_string();
        let record = std::iter::once(index_text.as_str()).chain(provenance.fields());
        self.writer.write_record(record).at_path(&stats_path)?;
        self.writer.flush().at_path(&stats_path)?;

        self.count = index;
        Ok(index)
    }

    /// Number of tiles written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn dir(&self) -> &DatasetDir {
        &self.dir
    }
}

impl Debug for MappingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingWriter")
            .field("dir", &self.dir)
            .field("with_metadata", &self.with_metadata)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    fn tile() -> TilePair {
        TilePair {
            origin: (0, 0),
            input: DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            label: DynamicImage::ImageLuma8(GrayImage::new(4, 4)),
        }
    }

    #[test]
    fn writes_indexed_tiles_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DatasetDir::new(tmp.path(), "ds");
        fs::create_dir_all(dir.inputs()).unwrap();
        fs::create_dir_all(dir.labels()).unwrap();

        let mut writer = MappingWriter::create(dir.clone(), false).unwrap();
        assert_eq!(writer.write_tile(&tile(), Provenance::FileName("a.tif")).unwrap(), 1);
        assert_eq!(writer.write_tile(&tile(), Provenance::FileName("b,c.tif")).unwrap(), 2);
        assert_eq!(writer.count(), 2);

        assert!(dir.inputs().join("1.png").is_file());
        assert!(dir.labels().join("2.png").is_file());

        let text = fs::read_to_string(dir.stats()).unwrap();
        assert_eq!(text, "idx,image\n1,a.tif\n2,\"b,c.tif\"\n");

        let label = image::open(dir.labels().join("1.png")).unwrap();
        assert_eq!(label.dimensions(), (4, 4));
    }
}
