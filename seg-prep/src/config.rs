//! Parameter file format.

use crate::{common::*, error::PathContext as _, tiler::TileParams};

/// The parameter file, usually `params.json5`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the raw datasets.
    pub datapath: PathBuf,
    /// Directory receiving the tiled datasets.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory receiving training sessions.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Side length of the square tiles in pixels.
    pub tile_size: u32,
    /// Stride of the sliding window in pixels.
    pub sliding_step: u32,
    /// Both image sides are divided by this factor before tiling.
    #[serde(default = "default_downsample_factor")]
    pub downsample_factor: u32,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: R64,
    /// Fraction of tiles assigned to the train set.
    #[serde(default = "default_split_ratio")]
    pub split_ratio: R64,
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,
}

impl Config {
    /// Loads and validates a parameter file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).at_path(path)?;
        let config: Self = json5::from_str(&text).map_err(|source| Error::Config {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tile_params()?;

        if self.epochs == 0 {
            return Err(Error::invalid_parameter("epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_parameter("batch_size must be at least 1"));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::invalid_parameter("learning_rate must be positive"));
        }
        check_split_ratio(self.split_ratio)?;

        Ok(())
    }

    pub fn tile_params(&self) -> Result<TileParams> {
        TileParams::new(self.tile_size, self.sliding_step, self.downsample_factor)
    }

    /// Options of the preprocessing stage.
    pub fn prep(&self, verbose: bool) -> Result<PrepConfig> {
        Ok(PrepConfig {
            datapath: self.datapath.clone(),
            output_dir: self.output_dir.clone(),
            tile: self.tile_params()?,
            verbose,
            progress: true,
        })
    }

    /// Options of the training session setup.
    pub fn train(&self, verbose: bool) -> Result<TrainConfig> {
        check_split_ratio(self.split_ratio)?;

        Ok(TrainConfig {
            output_dir: self.output_dir.clone(),
            checkpoint_dir: self.checkpoint_dir.clone(),
            hyper: HyperParams {
                epochs: self.epochs,
                batch_size: self.batch_size,
                learning_rate: self.learning_rate,
                split_ratio: self.split_ratio,
                split_seed: self.split_seed,
            },
            verbose,
        })
    }
}

/// Options of the preprocessing stage.
#[derive(Debug, Clone)]
pub struct PrepConfig {
    pub datapath: PathBuf,
    pub output_dir: PathBuf,
    pub tile: TileParams,
    /// Report skipped images.
    pub verbose: bool,
    /// Draw a progress bar per dataset on stderr.
    pub progress: bool,
}

/// Options of the training session setup.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Directory holding the tiled datasets.
    pub output_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub hyper: HyperParams,
    pub verbose: bool,
}

/// Parameters handed over to the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: R64,
    pub split_ratio: R64,
    pub split_seed: u64,
}

pub(crate) fn check_split_ratio(ratio: R64) -> Result<()> {
    if ratio <= 0.0 || ratio >= 1.0 {
        return Err(Error::invalid_parameter(format!(
            "split ratio must be in (0, 1), but get {}",
            ratio
        )));
    }
    Ok(())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_downsample_factor() -> u32 {
    2
}

fn default_split_ratio() -> R64 {
    r64(0.8)
}

fn default_split_seed() -> u64 {
    42
}
