//! Index discovery, parsing failures, and the CSV cache.

mod common;

use common::{build_tree, config_in, dataset_root, Layout};
use std::fs;
use toybox_dataset::{
    SamplingMode, ToyboxConfig, ToyboxDataset, ToyboxError, ToyboxIndex, CACHE_COLUMNS,
};

#[test]
fn scan_orders_rows_and_assigns_positional_views() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    let layout = Layout {
        ratios: vec![25, 50, 75, 100],
        ..Layout::single_rotation(2)
    };
    build_tree(&root, &layout)?;

    let index = ToyboxIndex::scan(&root)?;
    assert_eq!(index.len(), 72);
    let first: Vec<(u32, u32)> = index
        .records()
        .iter()
        .take(8)
        .map(|r| (r.frame_index, r.ratio))
        .collect();
    // Name order: rzplus_0 then rzplus_1; "100.png" sorts before "25.png".
    assert_eq!(
        first,
        vec![(0, 100), (0, 25), (0, 50), (0, 75), (1, 100), (1, 25), (1, 50), (1, 75)]
    );
    let views: Vec<u32> = index.records().iter().map(|r| r.view_index).collect();
    for (row, view) in views.iter().enumerate() {
        assert_eq!(*view as usize, (row / 4) % 18);
    }
    Ok(())
}

#[test]
fn scan_ignores_hidden_and_non_png_entries() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    build_tree(&root, &Layout::single_rotation(2))?;

    let frame_dir = root.join("cup/train/1/rzplus_0");
    fs::write(frame_dir.join("notes.txt"), "ignored")?;
    let hidden = root.join("cup/train/1/.rzplus_0");
    fs::create_dir_all(&hidden)?;
    fs::write(hidden.join("25.png"), "not read")?;
    let hidden_category = root.join(".cup/train/1/rzplus_0");
    fs::create_dir_all(&hidden_category)?;
    fs::write(hidden_category.join("25.png"), "not read")?;
    // Too shallow to match the layout.
    fs::write(root.join("cup/train/stray.png"), "not read")?;

    let index = ToyboxIndex::scan(&root)?;
    assert_eq!(index.len(), 18);
    assert!(index.records().iter().all(|r| r.rotation_axis == "rzplus"));
    let views: Vec<u32> = index.records().iter().map(|r| r.view_index).collect();
    assert_eq!(views, (0..18).map(|row| row / 4).collect::<Vec<u32>>());
    Ok(())
}

#[test]
fn malformed_path_fails_build_without_writing_cache() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    build_tree(&root, &Layout::single_rotation(2))?;
    let bad = root.join("cup/train/seven/rzplus_0");
    fs::create_dir_all(&bad)?;
    image::RgbImage::new(2, 2).save(bad.join("25.png"))?;

    let cfg = config_in(tmp.path());
    let err = ToyboxIndex::build(&root, &cfg).unwrap_err();
    assert!(matches!(err, ToyboxError::MalformedPath { .. }));
    assert!(!cfg.cache_path().exists());
    Ok(())
}

#[test]
fn missing_root_is_an_io_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = ToyboxIndex::scan(&tmp.path().join("absent")).unwrap_err();
    assert!(matches!(err, ToyboxError::Io { .. }));
    Ok(())
}

#[test]
fn cache_round_trips_scan() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    let layout = Layout {
        splits: vec!["test", "train"],
        instances: vec![1, 2],
        ratios: vec![25, 100],
        ..Layout::single_rotation(2)
    };
    build_tree(&root, &layout)?;
    let cfg = config_in(tmp.path());

    let fresh = ToyboxIndex::build(&root, &cfg)?;
    let raw = fs::read_to_string(cfg.cache_path())?;
    assert_eq!(raw.lines().next(), Some(CACHE_COLUMNS.join(",").as_str()));
    assert_eq!(raw.lines().count(), fresh.len() + 1);

    let cached = ToyboxIndex::load_cache(&cfg.cache_path())?;
    assert_eq!(cached, fresh);
    assert_eq!(cached, ToyboxIndex::scan(&root)?);
    Ok(())
}

#[test]
fn fresh_and_cached_datasets_filter_identically() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    let layout = Layout {
        axes: vec!["rxminus", "rzplus"],
        ratios: vec![25, 50, 75, 100],
        ..Layout::single_rotation(2)
    };
    build_tree(&root, &layout)?;

    let build = |cfg: &ToyboxConfig| {
        ToyboxDataset::builder(&root)
            .rotation_axes(Some(vec!["rzplus".to_string()]))
            .nview(6)
            .ratios(Some(vec![25, 75]))
            .mode(SamplingMode::SingleView)
            .preload(false)
            .build(cfg)
    };
    let scanned = build(&ToyboxConfig {
        read_cache: false,
        ..config_in(tmp.path())
    })?;
    let cached = build(&config_in(tmp.path()))?;
    assert_eq!(scanned.filtered().rows(), cached.filtered().rows());
    assert_eq!(scanned.len(), 12);
    Ok(())
}

#[test]
fn cached_index_skips_the_scan() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    build_tree(&root, &Layout::single_rotation(2))?;
    let cfg = config_in(tmp.path());
    ToyboxIndex::build(&root, &cfg)?;

    fs::remove_dir_all(&root)?;
    let ds = ToyboxDataset::builder(&root).preload(false).build(&cfg)?;
    assert_eq!(ds.len(), 18);
    assert!(matches!(
        ds.get(0),
        Err(ToyboxError::MissingImageFile { .. })
    ));
    Ok(())
}

#[test]
fn disabled_cache_read_rescans_and_rewrites() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    build_tree(&root, &Layout::single_rotation(2))?;
    let cfg = ToyboxConfig {
        read_cache: false,
        ..config_in(tmp.path())
    };
    fs::create_dir_all(&cfg.cache_dir)?;
    fs::write(cfg.cache_path(), "garbage,that,is,not,an,index\n1,2\n")?;

    let index = ToyboxIndex::build(&root, &cfg)?;
    assert_eq!(index.len(), 18);
    assert_eq!(ToyboxIndex::load_cache(&cfg.cache_path())?, index);
    Ok(())
}

#[test]
fn cache_with_leading_row_index_column_loads() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cache = tmp.path().join("legacy.csv");
    fs::write(
        &cache,
        ",path,dataset,ca,no,tr,fr,ratio,view_index\n\
         0,/data/cup/train/1/rzplus_0/25.png,train,cup,1,rzplus,0,25,0\n\
         1,/data/cup/test/2/ryminus_3/50.png,test,cup,2,ryminus,3,50,1\n",
    )?;
    let index = ToyboxIndex::load_cache(&cache)?;
    assert_eq!(index.len(), 2);
    let rec = &index.records()[1];
    assert_eq!(rec.dataset, "test");
    assert_eq!(rec.rotation_axis, "ryminus");
    assert_eq!((rec.instance, rec.frame_index, rec.ratio, rec.view_index), (2, 3, 50, 1));
    assert_eq!(index.for_split("train").len(), 1);
    Ok(())
}

#[test]
fn empty_root_writes_readable_empty_cache() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    fs::create_dir_all(&root)?;
    let cfg = config_in(tmp.path());

    let index = ToyboxIndex::build(&root, &cfg)?;
    assert!(index.is_empty());
    assert!(ToyboxIndex::load_cache(&cfg.cache_path())?.is_empty());
    Ok(())
}

#[test]
fn split_selection_only_serves_that_split() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = dataset_root(tmp.path());
    let layout = Layout {
        splits: vec!["test", "train"],
        instances: vec![1],
        ..Layout::single_rotation(2)
    };
    build_tree(&root, &layout)?;
    let cfg = config_in(tmp.path());

    let test = ToyboxDataset::builder(&root)
        .split("test")
        .preload(false)
        .build(&cfg)?;
    assert_eq!(test.len(), 18);
    assert!(test.filtered().rows().iter().all(|r| r.dataset == "test"));

    let val = ToyboxDataset::builder(&root)
        .split("val")
        .build(&cfg)?;
    assert!(val.is_empty());
    Ok(())
}
