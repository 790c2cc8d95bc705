//! Common imports from external crates.

pub use crate::error::{Error, Result};
pub use chrono::Local;
pub use image::{imageops::FilterType, DynamicImage, GenericImageView as _, ImageFormat};
pub use indicatif::{ProgressBar, ProgressStyle};
pub use log::{debug, error, info, warn};
pub use noisy_float::prelude::*;
pub use rand::{prelude::*, rngs::StdRng, seq::SliceRandom};
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    fmt::{self, Debug},
    fs::{self, File},
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
