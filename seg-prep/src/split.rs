//! Train/test split generation over the tiles of a dataset.

use crate::{
    common::*,
    config::check_split_ratio,
    error::PathContext as _,
    mapping::INDEX_COLUMN,
    output::DatasetDir,
};

/// Tile indices assigned to training and testing for one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAssignment {
    /// 0 in random split mode.
    pub fold: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitAssignment {
    pub fn train_file_name(&self) -> String {
        format!("train_{:02}.txt", self.fold)
    }

    pub fn test_file_name(&self) -> String {
        format!("test_{:02}.txt", self.fold)
    }

    /// One-line description of the fold, e.g. `fold 0: 8 train, 2 test`.
    pub fn summary(&self) -> String {
        format!(
            "fold {}: {} train, {} test",
            self.fold,
            self.train.len(),
            self.test.len()
        )
    }
}

/// Options of one split generation run.
#[derive(Debug, Clone)]
pub struct SplitRequest<'a> {
    /// Directory holding the tiled datasets.
    pub output_dir: &'a Path,
    pub dataset: &'a str,
    pub kfold: usize,
    pub ratio: R64,
    pub seed: u64,
    /// Log a summary of every fold at info level.
    pub verbose: bool,
}

/// Checks that the tiled dataset is complete and the fold count is valid.
pub fn check_dataset(output_dir: &Path, dataset: &str, kfold: usize) -> Result<DatasetDir> {
    if kfold < 1 {
        return Err(Error::invalid_parameter(
            "kfold must be greater than or equal to 1",
        ));
    }

    let dir = DatasetDir::new(output_dir, dataset);
    if !dir.root().is_dir() {
        return Err(Error::DatasetIncomplete {
            path: dir.root().to_owned(),
        });
    }
    for path in [dir.inputs(), dir.labels()] {
        if !path.is_dir() {
            return Err(Error::DatasetIncomplete { path });
        }
    }
    let stats = dir.stats();
    if !stats.is_file() {
        return Err(Error::DatasetIncomplete { path: stats });
    }

    Ok(dir)
}

/// Reads the `idx` column of a tile mapping table.
pub fn read_tile_indices(stats: &Path) -> Result<Vec<usize>> {
    #[derive(Deserialize)]
    struct Row {
        idx: usize,
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(stats)
        .at_path(stats)?;

    let has_index = reader
        .headers()
        .at_path(stats)?
        .iter()
        .any(|header| header == INDEX_COLUMN);
    if !has_index {
        return Err(Error::MissingColumn {
            path: stats.to_owned(),
            column: INDEX_COLUMN.to_owned(),
        });
    }

    reader
        .deserialize::<Row>()
        .map(|row| row.map(|row| row.idx).at_path(stats))
        .collect()
}

/// Reproducibly splits `indices` into a train set and a test set.
///
/// The test set takes `n - floor(ratio * n)` indices.
pub fn random_split(indices: &[usize], ratio: R64, seed: u64) -> Result<SplitAssignment> {
    check_split_ratio(ratio)?;

    let total = indices.len();
    let n_train = (ratio.raw() * total as f64).floor() as usize;
    let n_test = total - n_train;
    if n_train == 0 || n_test == 0 {
        return Err(Error::invalid_parameter(format!(
            "splitting {} tile(s) with ratio {} leaves an empty set",
            total, ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = indices.to_vec();
    shuffled.shuffle(&mut rng);
    let train = shuffled.split_off(n_test);

    Ok(SplitAssignment {
        fold: 0,
        train,
        test: shuffled,
    })
}

/// Splits into `kfold` train/test folds.
pub fn kfold_split(_indices: &[usize], _kfold: usize, _seed: u64) -> Result<Vec<SplitAssignment>> {
    // TODO: pick a fold policy (plain or stratified by animal) before implementing this
    Err(Error::NotImplemented("k-fold cross-validation"))
}

/// Writes the train and test lists of `assignment` into `dir`.
pub fn write_split(dir: &Path, assignment: &SplitAssignment) -> Result<()> {
    write_index_file(&dir.join(assignment.train_file_name()), &assignment.train)?;
    write_index_file(&dir.join(assignment.test_file_name()), &assignment.test)?;
    Ok(())
}

fn write_index_file(path: &Path, indices: &[usize]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).at_path(path)?);
    for index in indices {
        writeln!(writer, "{}", index).at_path(path)?;
    }
    writer.flush().at_path(path)?;
    Ok(())
}

/// Reads an index list file written by [write_split].
pub fn read_index_file(path: &Path) -> Result<Vec<usize>> {
    let text = fs::read_to_string(path).at_path(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.trim().parse().map_err(|_| {
                Error::invalid_parameter(format!(
                    "'{}' in '{}' is not a tile index",
                    line,
                    path.display()
                ))
            })
        })
        .collect()
}

/// Generates the split files of a dataset into `dir`.
///
/// `interrupted` is polled between the steps; once it is set the function
/// returns [Error::Interrupted].
pub fn generate(
    dir: &Path,
    request: &SplitRequest<'_>,
    interrupted: &AtomicBool,
) -> Result<Vec<SplitAssignment>> {
    let check = || {
        if interrupted.load(Ordering::SeqCst) {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    };

    let dataset = check_dataset(request.output_dir, request.dataset, request.kfold)?;
    check()?;

    let indices = read_tile_indices(&dataset.stats())?;
    info!(
        "splitting {} tile(s) of dataset '{}'",
        indices.len(),
        request.dataset
    );
    check()?;

    let assignments = if request.kfold == 1 {
        vec![random_split(&indices, request.ratio, request.seed)?]
    } else {
        kfold_split(&indices, request.kfold, request.seed)?
    };

    for assignment in &assignments {
        check()?;
        write_split(dir, assignment)?;
        if request.verbose {
            info!("{}", assignment.summary());
        } else {
            debug!("{}", assignment.summary());
        }
    }

    Ok(assignments)
}
