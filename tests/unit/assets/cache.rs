use super::*;
use crate::render::bitmap::Rgba8;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingDecoder {
    calls: Arc<AtomicUsize>,
    palettes_seen: Mutex<Vec<Option<PathBuf>>>,
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, _asset: &Path, palette: Option<&Path>) -> GraspResult<Bitmap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.palettes_seen
            .lock()
            .unwrap()
            .push(palette.map(Path::to_path_buf));
        Ok(Bitmap::new(2, 2, Rgba8::WHITE))
    }
}

fn test_cache() -> (ImageCache, Arc<AtomicUsize>) {
    let mut catalog = AssetCatalog::default();
    catalog.insert_pic("bg", PathBuf::from("/assets/BG.PIC"));
    catalog.insert_pic("pal1", PathBuf::from("/assets/PAL1.PIC"));
    catalog.insert_pic("pal2", PathBuf::from("/assets/PAL2.PIC"));
    catalog.insert_clip("dot", PathBuf::from("/assets/DOT.CLP"));

    let calls = Arc::new(AtomicUsize::new(0));
    let decoder = CountingDecoder {
        calls: calls.clone(),
        palettes_seen: Mutex::new(Vec::new()),
    };
    (ImageCache::new(catalog, Box::new(decoder)), calls)
}

#[test]
fn repeated_load_reuses_the_decoded_bitmap() {
    let (mut cache, calls) = test_cache();
    let a = cache.load("dot", AssetKind::Clip, None).unwrap();
    let b = cache.load("dot", AssetKind::Clip, None).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn name_lookup_is_case_insensitive() {
    let (mut cache, calls) = test_cache();
    cache.load("DOT", AssetKind::Clip, None).unwrap();
    cache.load("dot", AssetKind::Clip, None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn palette_identity_separates_entries() {
    let (mut cache, calls) = test_cache();
    let a = cache.load("dot", AssetKind::Clip, Some("pal1")).unwrap();
    let b = cache.load("dot", AssetKind::Clip, Some("pal2")).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Back to the first palette: the old entry is still hit.
    cache.load("dot", AssetKind::Clip, Some("pal1")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn picture_and_clip_namespaces_are_distinct() {
    let mut catalog = AssetCatalog::default();
    catalog.insert_pic("same", PathBuf::from("/assets/SAME.PIC"));
    catalog.insert_clip("same", PathBuf::from("/assets/SAME.CLP"));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut cache = ImageCache::new(
        catalog,
        Box::new(CountingDecoder {
            calls: calls.clone(),
            palettes_seen: Mutex::new(Vec::new()),
        }),
    );

    cache.load("same", AssetKind::Picture, None).unwrap();
    cache.load("same", AssetKind::Clip, None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn prepare_all_decodes_each_missing_name_once() {
    let (mut cache, calls) = test_cache();
    cache.load("dot", AssetKind::Clip, None).unwrap();

    let names = vec!["dot".to_string(), "DOT".to_string(), "bg".to_string()];
    // "bg" is a picture name, not a clip; preparing it as a clip must fail.
    assert!(cache.prepare_all(&names, AssetKind::Clip, None).is_err());

    let names = vec!["dot".to_string(), "dot".to_string()];
    cache.prepare_all(&names, AssetKind::Clip, None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_asset_name_is_fatal() {
    let (mut cache, _) = test_cache();
    let err = cache.load("missing", AssetKind::Clip, None).unwrap_err();
    assert!(matches!(err, GraspError::Decode(_)));
}

#[test]
fn unknown_palette_name_is_fatal() {
    let (mut cache, _) = test_cache();
    let err = cache
        .load("dot", AssetKind::Clip, Some("nosuchpal"))
        .unwrap_err();
    assert!(matches!(err, GraspError::Decode(_)));
}
