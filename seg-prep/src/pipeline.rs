//! Tiling of raw datasets into training-ready tile datasets.

use crate::{
    common::*,
    config::PrepConfig,
    decision::Decider,
    error::PathContext as _,
    mapping::{MappingWriter, Provenance},
    metadata::MetadataTable,
    output::{self, DatasetDir, INPUTS_DIR, LABELS_DIR, STATS_FILE},
    tiler::{self, TileParams},
    utils,
};

/// Selector value that expands to every dataset under the data path.
pub const ALL_DATASETS: &str = "all";

/// What happened to one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    pub name: String,
    pub outcome: DatasetOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOutcome {
    /// The output directory existed and overwriting was declined.
    Skipped,
    Tiled {
        /// Number of source images that were tiled.
        images: usize,
        tiles: usize,
        /// Source images left out for lack of a label or metadata row.
        skipped_images: Vec<String>,
    },
}

impl DatasetReport {
    pub fn tiles(&self) -> usize {
        match self.outcome {
            DatasetOutcome::Skipped => 0,
            DatasetOutcome::Tiled { tiles, .. } => tiles,
        }
    }
}

/// Tiles every dataset picked by `selector`.
///
/// Datasets are processed one after another. An error aborts the run, but
/// datasets finished before it are left as they are.
pub fn run(
    config: &PrepConfig,
    selector: &str,
    decider: &mut dyn Decider,
) -> Result<Vec<DatasetReport>> {
    let datapath = &config.datapath;
    if !datapath.is_dir() {
        return Err(Error::MissingDirectory(datapath.to_owned()));
    }
    let datasets = resolve_datasets(datapath, selector)?;
    info!("preprocessing {} dataset(s): {}", datasets.len(), datasets.join(", "));

    datasets
        .into_iter()
        .map(|name| {
            let outcome = process_dataset(config, &name, decider)?;
            Ok(DatasetReport { name, outcome })
        })
        .collect()
}

/// Expands the dataset selector into dataset names.
pub fn resolve_datasets(datapath: &Path, selector: &str) -> Result<Vec<String>> {
    let names = utils::list_dir_names(datapath)?;

    if selector == ALL_DATASETS {
        let names = names
            .into_iter()
            .filter(|name| {
                let is_dir = datapath.join(name).is_dir();
                if !is_dir {
                    warn!("ignore non-directory entry '{}'", name);
                }
                is_dir
            })
            .collect();
        return Ok(names);
    }

    let found = names.iter().any(|name| name == selector) && datapath.join(selector).is_dir();
    if !found {
        return Err(Error::DatasetNotFound {
            name: selector.to_owned(),
            datapath: datapath.to_owned(),
        });
    }
    Ok(vec![selector.to_owned()])
}

/// Raw layout of a dataset under the data path.
#[derive(Debug, Clone)]
struct RawDataset {
    inputs: PathBuf,
    labels: PathBuf,
    stats: Option<PathBuf>,
}

impl RawDataset {
    fn open(datapath: &Path, name: &str, verbose: bool) -> Result<Self> {
        let root = datapath.join(name);
        let inputs = root.join(INPUTS_DIR);
        let labels = root.join(LABELS_DIR);

        for dir in [&inputs, &labels] {
            if !dir.is_dir() {
                return Err(Error::MissingDirectory(dir.to_owned()));
            }
        }

        let stats = root.join(STATS_FILE);
        let stats = if stats.is_file() {
            Some(stats)
        } else {
            if verbose {
                warn!(
                    "dataset '{}' does not contain '{}', metadata is not propagated",
                    name, STATS_FILE
                );
            }
            None
        };

        Ok(Self {
            inputs,
            labels,
            stats,
        })
    }
}

fn process_dataset(
    config: &PrepConfig,
    name: &str,
    decider: &mut dyn Decider,
) -> Result<DatasetOutcome> {
    let raw = RawDataset::open(&config.datapath, name, config.verbose)?;
    let metadata = raw.stats.as_ref().map(MetadataTable::load).transpose()?;

    if !output::ensure_output(&config.output_dir, name, decider)? {
        return Ok(DatasetOutcome::Skipped);
    }

    let dir = DatasetDir::new(&config.output_dir, name);
    let mut writer = MappingWriter::create(dir, metadata.is_some())?;

    let input_names = utils::stem_map(&raw.inputs)?;
    let bar = dataset_progress(name, input_names.len(), config.progress);
    let (images, skipped_images) = tile_dataset(
        &raw,
        &input_names,
        metadata.as_ref(),
        config,
        &mut writer,
        &bar,
    )?;
    bar.finish_and_clear();

    let tiles = writer.count();
    info!(
        "dataset '{}': {} tile(s) from {} image(s), {} image(s) skipped",
        name,
        tiles,
        images,
        skipped_images.len()
    );

    Ok(DatasetOutcome::Tiled {
        images,
        tiles,
        skipped_images,
    })
}

/// One bar per dataset, advanced once per input image.
fn dataset_progress(name: &str, len: usize, visible: bool) -> ProgressBar {
    let bar = if visible {
        ProgressBar::new(len as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_length(len as u64);

    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] {msg}: {wide_bar} {pos}/{len}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(format!("preprocessing {}", name));
    bar
}

/// Tiles every input image that has a label (and a metadata row when
/// metadata is present). Returns the number of tiled images and the names
/// of skipped ones.
fn tile_dataset(
    raw: &RawDataset,
    input_names: &BTreeMap<String, String>,
    metadata: Option<&MetadataTable>,
    config: &PrepConfig,
    writer: &mut MappingWriter,
    bar: &ProgressBar,
) -> Result<(usize, Vec<String>)> {
    let verbose = config.verbose;
    let label_names = utils::stem_map(&raw.labels)?;

    let mut images = 0;
    let mut skipped_images = vec![];

    for (stem, input_name) in input_names {
        let label_name = match label_names.get(stem) {
            Some(label_name) => label_name,
            None => {
                if verbose {
                    bar.suspend(|| warn!("label of image '{}' not found, skipped", input_name));
                }
                skipped_images.push(input_name.clone());
                bar.inc(1);
                continue;
            }
        };

        let provenance = match metadata {
            Some(table) => match table.get(input_name) {
                Some(row) => Provenance::Metadata(row),
                None => {
                    if verbose {
                        bar.suspend(|| {
                            warn!("image '{}' not found in '{}', skipped", input_name, STATS_FILE)
                        });
                    }
                    skipped_images.push(input_name.clone());
                    bar.inc(1);
                    continue;
                }
            },
            None => Provenance::FileName(input_name),
        };

        let input_path = raw.inputs.join(input_name);
        let label_path = raw.labels.join(label_name);
        let tiles = tile_image_pair(
            &input_path,
            &label_path,
            config.tile,
            provenance,
            writer,
            bar,
        )?;
        bar.suspend(|| debug!("cropped {} tile(s) from '{}'", tiles, input_path.display()));
        images += 1;
        bar.inc(1);
    }

    Ok((images, skipped_images))
}

/// Crops one image pair and writes every tile. Returns the number of tiles.
fn tile_image_pair(
    input_path: &Path,
    label_path: &Path,
    params: TileParams,
    provenance: Provenance<'_>,
    writer: &mut MappingWriter,
    bar: &ProgressBar,
) -> Result<usize> {
    let input = image::open(input_path).at_path(input_path)?;
    let label = image::open(label_path).at_path(label_path)?;

    let tiles = tiler::crop(input, label, params).map_err(|err| {
        bar.abandon();
        error!("failed to crop '{}': {}", input_path.display(), err);
        err
    })?;

    let mut count = 0;
    for tile in tiles {
        writer.write_tile(&tile, provenance)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_all_skips_artifacts_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b", "a", ".DS_Store"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), b"").unwrap();

        let names = resolve_datasets(tmp.path(), ALL_DATASETS).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn resolve_named_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("kidney")).unwrap();
        fs::write(tmp.path().join("notes.txt"), b"").unwrap();

        assert_eq!(resolve_datasets(tmp.path(), "kidney").unwrap(), vec!["kidney"]);
        for selector in ["liver", "notes.txt", "..", "kidney/inputs"] {
            assert!(matches!(
                resolve_datasets(tmp.path(), selector),
                Err(Error::DatasetNotFound { .. })
            ));
        }
    }

    #[test]
    fn progress_advances_per_input_image() {
        use image::{GrayImage, RgbImage};

        let tmp = tempfile::tempdir().unwrap();
        let config = PrepConfig {
            datapath: tmp.path().join("raw"),
            output_dir: tmp.path().join("data"),
            tile: TileParams::new(8, 8, 1).unwrap(),
            verbose: true,
            progress: false,
        };
        let root = config.datapath.join("ds");
        fs::create_dir_all(root.join(INPUTS_DIR)).unwrap();
        fs::create_dir_all(root.join(LABELS_DIR)).unwrap();
        for stem in ["a", "b", "c"] {
            let path = root.join(INPUTS_DIR).join(format!("{}.png", stem));
            RgbImage::new(16, 16).save(path).unwrap();
        }
        // "b" has no label
        for stem in ["a", "c"] {
            let path = root.join(LABELS_DIR).join(format!("{}.png", stem));
            GrayImage::new(16, 16).save(path).unwrap();
        }

        let raw = RawDataset::open(&config.datapath, "ds", true).unwrap();
        let dir = DatasetDir::new(&config.output_dir, "ds");
        fs::create_dir_all(dir.inputs()).unwrap();
        fs::create_dir_all(dir.labels()).unwrap();
        let mut writer = MappingWriter::create(dir, false).unwrap();

        let input_names = utils::stem_map(&raw.inputs).unwrap();
        let bar = dataset_progress("ds", input_names.len(), false);
        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.message(), "preprocessing ds");

        let (images, skipped) =
            tile_dataset(&raw, &input_names, None, &config, &mut writer, &bar).unwrap();
        assert_eq!(images, 2);
        assert_eq!(skipped, vec!["b.png"]);
        assert_eq!(bar.position(), 3);
        assert_eq!(writer.count(), 8);
    }
}
