#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use seg_prep::{tiler::TileParams, PrepConfig};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub const STATS_HEADER: &str = "Image,GBML,Genotype,Genotype (#),Animal,GBMW,FPW,SDD";

/// Scratch layout with a raw data path and an output directory.
pub struct Workspace {
    pub tmp: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn datapath(&self) -> PathBuf {
        self.root().join("raw")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.root().join("checkpoints")
    }

    pub fn prep_config(&self, tile_size: u32, stride: u32, factor: u32) -> PrepConfig {
        PrepConfig {
            datapath: self.datapath(),
            output_dir: self.output_dir(),
            tile: TileParams::new(tile_size, stride, factor).unwrap(),
            verbose: true,
            progress: false,
        }
    }

    /// Creates `raw/<name>/{inputs,labels}`.
    pub fn raw_dataset(&self, name: &str) -> RawDataset {
        let root = self.datapath().join(name);
        fs::create_dir_all(root.join("inputs")).unwrap();
        fs::create_dir_all(root.join("labels")).unwrap();
        RawDataset { root }
    }
}

pub struct RawDataset {
    pub root: PathBuf,
}

impl RawDataset {
    pub fn add_input(&self, file_name: &str, width: u32, height: u32) {
        let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        image.save(self.root.join("inputs").join(file_name)).unwrap();
    }

    pub fn add_label(&self, file_name: &str, width: u32, height: u32) {
        let image = GrayImage::from_fn(width, height, |x, _| Luma([(x % 3) as u8]));
        image.save(self.root.join("labels").join(file_name)).unwrap();
    }

    pub fn add_pair(&self, stem: &str, width: u32, height: u32) {
        self.add_input(&format!("{}.png", stem), width, height);
        self.add_label(&format!("{}.png", stem), width, height);
    }

    /// Writes `stats.csv` with one row per image name.
    pub fn write_stats(&self, images: &[&str]) {
        let mut text = format!("{}\n", STATS_HEADER);
        for (index, image) in images.iter().enumerate() {
            text.push_str(&format!(
                "{},1.{},WT,{},M{},31{}.5,42{}.0,3.{}\n",
                image, index, index, index, index, index, index
            ));
        }
        fs::write(self.root.join("stats.csv"), text).unwrap();
    }
}

pub fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.to_owned())
        .collect()
}

/// Relative path to content of every file below `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.insert(path.strip_prefix(root).unwrap().to_owned(), vec![]);
                walk(root, &path, out);
            } else {
                let content = fs::read(&path).unwrap();
                out.insert(path.strip_prefix(root).unwrap().to_owned(), content);
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}
