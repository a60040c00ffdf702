//! Synthetic Toybox trees for integration tests.
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use toybox_dataset::ToyboxConfig;

/// Shape of a synthetic `<root>/<ca>/<split>/<no>/<tr>_<fr>/<ratio>.png` tree.
pub struct Layout {
    pub categories: Vec<&'static str>,
    pub splits: Vec<&'static str>,
    pub instances: Vec<u32>,
    pub axes: Vec<&'static str>,
    pub frames: u32,
    pub ratios: Vec<u32>,
    pub side: u32,
}

impl Layout {
    /// One category, instance, axis, and ratio; 18 frames.
    pub fn single_rotation(side: u32) -> Self {
        Self {
            categories: vec!["cup"],
            splits: vec!["train"],
            instances: vec![1],
            axes: vec!["rzplus"],
            frames: 18,
            ratios: vec![100],
            side,
        }
    }
}

/// Pixel colour encoding the frame (R), ratio (G), and instance (B) of a view.
pub fn view_colour(frame: u32, ratio: u32, instance: u32) -> Rgb<u8> {
    Rgb([(frame * 10) as u8, ratio as u8, instance as u8])
}

/// Write the tree and return the number of images created.
pub fn build_tree(root: &Path, layout: &Layout) -> anyhow::Result<usize> {
    let mut written = 0;
    for ca in &layout.categories {
        for split in &layout.splits {
            for no in &layout.instances {
                for tr in &layout.axes {
                    for fr in 0..layout.frames {
                        let dir = root
                            .join(ca)
                            .join(split)
                            .join(no.to_string())
                            .join(format!("{tr}_{fr}"));
                        fs::create_dir_all(&dir)?;
                        for ratio in &layout.ratios {
                            let img = RgbImage::from_pixel(
                                layout.side,
                                layout.side,
                                view_colour(fr, *ratio, *no),
                            );
                            img.save(dir.join(format!("{ratio}.png")))?;
                            written += 1;
                        }
                    }
                }
            }
        }
    }
    Ok(written)
}

/// Default categories with the cache placed under `dir`.
pub fn config_in(dir: &Path) -> ToyboxConfig {
    ToyboxConfig {
        cache_dir: dir.join("cache"),
        ..ToyboxConfig::default()
    }
}

pub fn dataset_root(tmp: &Path) -> PathBuf {
    tmp.join("toybox")
}
